//! Injected side-effect services and per-run build context.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::fs::{FileSystem, LocalFs};
use crate::process::{ProcessRunner, SystemRunner};
use crate::tools::{ToolLocator, WhichLocator};

/// Everything the build does to the outside world goes through these.
#[derive(Clone)]
pub struct Services {
  pub runner: Arc<dyn ProcessRunner>,
  pub tools: Arc<dyn ToolLocator>,
  pub fs: Arc<dyn FileSystem>,
}

impl Services {
  /// Real processes, `PATH` lookup and the local filesystem.
  pub fn system() -> Self {
    Self {
      runner: Arc::new(SystemRunner),
      tools: Arc::new(WhichLocator::new()),
      fs: Arc::new(LocalFs),
    }
  }
}

#[derive(Debug, Error)]
#[error("build cancelled")]
pub struct Cancelled;

/// Shared flag set when the user interrupts a run.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }

  pub fn check(&self) -> Result<(), Cancelled> {
    if self.is_cancelled() { Err(Cancelled) } else { Ok(()) }
  }
}

/// What a single build step needs besides its target.
#[derive(Clone)]
pub struct BuildContext {
  pub services: Services,
  pub work_root: PathBuf,
  /// Value passed to `make -j` and `cmake --parallel`.
  pub parallelism: usize,
  pub cancel: CancelFlag,
}

impl BuildContext {
  pub fn new(services: Services, work_root: impl Into<PathBuf>) -> Self {
    Self {
      services,
      work_root: work_root.into(),
      parallelism: host_parallelism(),
      cancel: CancelFlag::new(),
    }
  }

  pub fn with_parallelism(mut self, parallelism: usize) -> Self {
    self.parallelism = parallelism.max(1);
    self
  }

  pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
    self.cancel = cancel;
    self
  }
}

/// Host processor count, falling back to 1.
pub fn host_parallelism() -> usize {
  std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
