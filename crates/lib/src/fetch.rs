//! Source checkout for pinned library revisions.
//!
//! Sources are shallow clones (with shallow submodules) of a single tag.
//! A populated destination is trusted as-is: there is no update or
//! re-verification, and removing the directory is how a fresh clone is
//! forced.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::context::Services;
use crate::fs::FsError;
use crate::library::{Library, SourceSpec};
use crate::process::{Invocation, OutputPolicy, ProcessError};
use crate::tools::{Tool, ToolError};

const ALLOWED_SCHEMES: [&str; 5] = ["https", "http", "ssh", "git", "file"];

#[derive(Debug, Error)]
pub enum FetchError {
  #[error("invalid remote '{url}': {reason}")]
  InvalidRemote { url: String, reason: String },

  #[error(transparent)]
  Tool(#[from] ToolError),

  #[error("failed to clone '{url}' at {revision}: {source}")]
  Clone {
    url: String,
    revision: String,
    #[source]
    source: ProcessError,
  },

  #[error(transparent)]
  Fs(#[from] FsError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
  AlreadyPresent,
  Cloned,
}

/// Whether a library's source checkout exists under the work root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStatus {
  pub library: Library,
  pub revision: &'static str,
  pub path: PathBuf,
  pub present: bool,
}

pub struct SourceFetcher<'a> {
  services: &'a Services,
}

impl<'a> SourceFetcher<'a> {
  pub fn new(services: &'a Services) -> Self {
    Self { services }
  }

  /// Make sure `source` is checked out at `destination`.
  pub fn ensure(&self, source: &SourceSpec, destination: &Path) -> Result<FetchOutcome, FetchError> {
    if self.services.fs.exists(destination) {
      debug!(path = %destination.display(), "source already present, skipping clone");
      return Ok(FetchOutcome::AlreadyPresent);
    }

    let remote = validate_remote(source.url)?;
    let git = self.services.tools.locate(Tool::Git)?;

    info!(url = %remote, revision = source.revision, path = %destination.display(), "cloning source");
    let clone = Invocation::new(git)
      .named("git clone")
      .args([
        "clone",
        "--branch",
        source.revision,
        "--depth",
        "1",
        "--recurse-submodules",
        "--shallow-submodules",
        remote.as_str(),
      ])
      .path_arg(destination);

    self
      .services
      .runner
      .run(&clone, &OutputPolicy::Quiet)
      .map_err(|source_err| FetchError::Clone {
        url: source.url.to_string(),
        revision: source.revision.to_string(),
        source: source_err,
      })?;

    Ok(FetchOutcome::Cloned)
  }

  /// Source status for each library under `work_root`.
  pub fn status(&self, work_root: &Path, libraries: &[Library]) -> Vec<SourceStatus> {
    libraries
      .iter()
      .map(|&library| {
        let path = source_directory(work_root, library);
        SourceStatus {
          library,
          revision: library.source().revision,
          present: self.services.fs.exists(&path),
          path,
        }
      })
      .collect()
  }

  /// Remove a library's checkout so the next build clones it again.
  pub fn clean(&self, work_root: &Path, library: Library) -> Result<bool, FetchError> {
    let path = source_directory(work_root, library);
    if !self.services.fs.exists(&path) {
      return Ok(false);
    }
    info!(library = %library, path = %path.display(), "removing source checkout");
    self.services.fs.remove(&path)?;
    Ok(true)
  }
}

/// `<work root>/<library>/src`, shared by every target of the library.
pub fn source_directory(work_root: &Path, library: Library) -> PathBuf {
  work_root.join(library.name()).join("src")
}

fn validate_remote(url: &str) -> Result<Url, FetchError> {
  let invalid = |reason: String| FetchError::InvalidRemote {
    url: url.to_string(),
    reason,
  };
  let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
  if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
    return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
  }
  Ok(parsed)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::{RecordingRunner, test_services};
  use tempfile::TempDir;

  const SOURCE: SourceSpec = SourceSpec {
    url: "https://github.com/openssl/openssl.git",
    revision: "openssl-3.5.1",
  };

  #[test]
  fn clones_pinned_revision_shallowly() {
    let temp = TempDir::new().unwrap();
    let runner = RecordingRunner::new();
    let services = test_services(&runner);
    let dest = temp.path().join("openssl/src");

    let outcome = SourceFetcher::new(&services).ensure(&SOURCE, &dest).unwrap();

    assert_eq!(outcome, FetchOutcome::Cloned);
    assert_eq!(
      runner.commands(),
      vec![format!(
        "/path/to/tools/git clone --branch openssl-3.5.1 --depth 1 --recurse-submodules --shallow-submodules \
         https://github.com/openssl/openssl.git {}",
        dest.display()
      )]
    );
  }

  #[test]
  fn second_ensure_is_a_no_op() {
    let temp = TempDir::new().unwrap();
    let runner = RecordingRunner::new();
    let services = test_services(&runner);
    let dest = temp.path().join("openssl/src");
    let fetcher = SourceFetcher::new(&services);

    fetcher.ensure(&SOURCE, &dest).unwrap();
    let second = fetcher.ensure(&SOURCE, &dest).unwrap();

    assert_eq!(second, FetchOutcome::AlreadyPresent);
    assert_eq!(runner.commands().len(), 1);
  }

  #[test]
  fn invalid_remote_fails_before_any_process() {
    let temp = TempDir::new().unwrap();
    let runner = RecordingRunner::new();
    let services = test_services(&runner);
    let bad = SourceSpec {
      url: "not a url",
      revision: "v1",
    };
    let ftp = SourceSpec {
      url: "ftp://example.com/repo.git",
      revision: "v1",
    };

    let fetcher = SourceFetcher::new(&services);
    assert!(matches!(
      fetcher.ensure(&bad, &temp.path().join("a")),
      Err(FetchError::InvalidRemote { .. })
    ));
    let err = fetcher.ensure(&ftp, &temp.path().join("b")).unwrap_err();
    assert!(err.to_string().contains("unsupported scheme 'ftp'"));
    assert!(runner.commands().is_empty());
  }

  #[test]
  fn clone_failure_names_the_remote() {
    let temp = TempDir::new().unwrap();
    let runner = RecordingRunner::new().fail_when("clone");
    let services = test_services(&runner);

    let err = SourceFetcher::new(&services)
      .ensure(&SOURCE, &temp.path().join("src"))
      .unwrap_err();

    assert!(matches!(err, FetchError::Clone { .. }));
    assert!(err.to_string().contains("openssl-3.5.1"));
  }

  #[test]
  fn status_and_clean() {
    let temp = TempDir::new().unwrap();
    let runner = RecordingRunner::new();
    let services = test_services(&runner);
    let fetcher = SourceFetcher::new(&services);
    std::fs::create_dir_all(source_directory(temp.path(), Library::LibSsh2)).unwrap();

    let status = fetcher.status(temp.path(), &Library::ALL);
    let present: Vec<_> = status.iter().filter(|s| s.present).map(|s| s.library).collect();
    assert_eq!(present, vec![Library::LibSsh2]);

    assert!(fetcher.clean(temp.path(), Library::LibSsh2).unwrap());
    assert!(!fetcher.clean(temp.path(), Library::LibSsh2).unwrap());
    assert!(!source_directory(temp.path(), Library::LibSsh2).exists());
  }
}
