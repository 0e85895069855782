//! Run configuration.
//!
//! Each setting is taken from the first source that provides it: an explicit
//! override (command-line flag), then the environment, then a default
//! relative to the invocation directory.

use std::path::PathBuf;

use thiserror::Error;

use crate::consts::{INVOCATION_DIR_ENV, JOBS_ENV, OUTPUT_DIR_ENV, OUTPUT_DIR_NAME, WORK_DIR_ENV, WORK_DIR_NAME};
use crate::context::{BuildContext, CancelFlag, Services, host_parallelism};
use crate::execute::ExecuteConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("invalid value for {source_name}: '{value}' is not a positive number of jobs")]
  InvalidJobs { source_name: String, value: String },

  #[error("cannot determine the invocation directory: {0}")]
  InvocationDir(#[source] std::io::Error),
}

/// Values given explicitly, typically on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
  pub work_dir: Option<PathBuf>,
  pub output_dir: Option<PathBuf>,
  pub jobs: Option<usize>,
  pub keep_going: bool,
  pub no_bundle: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
  pub work_root: PathBuf,
  pub output_dir: PathBuf,
  pub jobs: usize,
  pub keep_going: bool,
  pub bundle: bool,
}

impl BuildConfig {
  pub fn resolve(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
    let base = invocation_dir()?;

    let work_root = overrides
      .work_dir
      .clone()
      .or_else(|| env_path(WORK_DIR_ENV))
      .unwrap_or_else(|| PathBuf::from(WORK_DIR_NAME));
    let output_dir = overrides
      .output_dir
      .clone()
      .or_else(|| env_path(OUTPUT_DIR_ENV))
      .unwrap_or_else(|| PathBuf::from(OUTPUT_DIR_NAME));

    let jobs = match overrides.jobs {
      Some(0) => {
        return Err(ConfigError::InvalidJobs {
          source_name: "--jobs".to_string(),
          value: "0".to_string(),
        });
      }
      Some(jobs) => jobs,
      None => env_jobs()?.unwrap_or_else(host_parallelism),
    };

    // join keeps absolute paths as they are
    Ok(Self {
      work_root: base.join(work_root),
      output_dir: base.join(output_dir),
      jobs,
      keep_going: overrides.keep_going,
      bundle: !overrides.no_bundle,
    })
  }

  pub fn execute_config(&self) -> ExecuteConfig {
    ExecuteConfig {
      jobs: self.jobs,
      keep_going: self.keep_going,
      bundle_into: self.bundle.then(|| self.output_dir.clone()),
    }
  }

  /// `jobs` bounds concurrent builds only; each native build still gets the
  /// host processor count as its `make -j` / `cmake --parallel` hint.
  pub fn build_context(&self, services: Services, cancel: CancelFlag) -> BuildContext {
    BuildContext::new(services, &self.work_root)
      .with_parallelism(host_parallelism())
      .with_cancel_flag(cancel)
  }
}

/// `OPWD` when set, otherwise the process working directory.
pub fn invocation_dir() -> Result<PathBuf, ConfigError> {
  if let Some(dir) = env_path(INVOCATION_DIR_ENV) {
    return Ok(dir);
  }
  std::env::current_dir().map_err(ConfigError::InvocationDir)
}

fn env_path(name: &str) -> Option<PathBuf> {
  std::env::var_os(name).filter(|v| !v.is_empty()).map(PathBuf::from)
}

fn env_jobs() -> Result<Option<usize>, ConfigError> {
  let Ok(value) = std::env::var(JOBS_ENV) else {
    return Ok(None);
  };
  match value.trim().parse::<usize>() {
    Ok(jobs) if jobs > 0 => Ok(Some(jobs)),
    _ => Err(ConfigError::InvalidJobs {
      source_name: JOBS_ENV.to_string(),
      value,
    }),
  }
}
