//! Resolution of native tools to absolute paths.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Native tools the build shells out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
  Git,
  Make,
  Cmake,
  Lipo,
  Xcodebuild,
}

impl Tool {
  pub fn name(&self) -> &'static str {
    match self {
      Self::Git => "git",
      Self::Make => "make",
      Self::Cmake => "cmake",
      Self::Lipo => "lipo",
      Self::Xcodebuild => "xcodebuild",
    }
  }
}

impl fmt::Display for Tool {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

#[derive(Debug, Error)]
pub enum ToolError {
  #[error("required tool '{tool}' not found on PATH")]
  NotFound {
    tool: Tool,
    #[source]
    source: which::Error,
  },
}

pub trait ToolLocator: Send + Sync {
  fn locate(&self, tool: Tool) -> Result<PathBuf, ToolError>;
}

/// Looks tools up on `PATH`, caching each hit.
#[derive(Debug, Default)]
pub struct WhichLocator {
  cache: Mutex<HashMap<Tool, PathBuf>>,
}

impl WhichLocator {
  pub fn new() -> Self {
    Self::default()
  }
}

impl ToolLocator for WhichLocator {
  fn locate(&self, tool: Tool) -> Result<PathBuf, ToolError> {
    let cached = self.cache.lock().ok().and_then(|cache| cache.get(&tool).cloned());
    if let Some(path) = cached {
      return Ok(path);
    }

    let path = which::which(tool.name()).map_err(|source| ToolError::NotFound { tool, source })?;
    debug!(tool = %tool, path = ?path, "located tool");

    if let Ok(mut cache) = self.cache.lock() {
      cache.insert(tool, path.clone());
    }
    Ok(path)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn missing_tool_reports_its_name() {
    temp_env::with_var("PATH", Some(""), || {
      let err = WhichLocator::new().locate(Tool::Xcodebuild).unwrap_err();
      assert_eq!(err.to_string(), "required tool 'xcodebuild' not found on PATH");
    });
  }

  #[cfg(unix)]
  #[test]
  #[serial]
  fn finds_tool_on_path() {
    use std::os::unix::fs::PermissionsExt;

    let temp = tempfile::TempDir::new().unwrap();
    let git = temp.path().join("git");
    std::fs::write(&git, "#!/bin/sh\n").unwrap();
    std::fs::set_permissions(&git, std::fs::Permissions::from_mode(0o755)).unwrap();

    temp_env::with_var("PATH", Some(temp.path()), || {
      let locator = WhichLocator::new();
      assert_eq!(locator.locate(Tool::Git).unwrap(), git);
      // Second lookup is served from the cache.
      assert_eq!(locator.locate(Tool::Git).unwrap(), git);
    });
  }
}
