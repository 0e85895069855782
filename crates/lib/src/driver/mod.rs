//! Per-library build drivers.
//!
//! Every single-architecture build follows the same protocol, implemented
//! once in [`build_single`]:
//!
//! 0. **Validate** the target and its dependencies. Nothing touches the
//!    filesystem or spawns a process before this succeeds.
//! 1. **Prepare** a clean build and install directory and a fresh log.
//! 2. **Fetch** the library source into its shared source directory.
//! 3. **Configure** with the driver's native configure step.
//! 4. **Build and install** with the driver's native build steps.
//!
//! Drivers only describe *what* to run; they never run anything themselves.
//! Cancellation is honoured between phases.

pub mod cmake;
pub mod libgit2;
pub mod libssh2;
pub mod openssl;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::context::{BuildContext, Cancelled};
use crate::fetch::{FetchError, SourceFetcher};
use crate::fs::FsError;
use crate::library::Library;
use crate::platform::matrix;
use crate::process::{Invocation, LogHandle, OutputPolicy, ProcessError};
use crate::target::{Target, TargetError};
use crate::tools::ToolError;
use crate::toolchain::ToolchainError;

pub use libgit2::LibGit2Driver;
pub use libssh2::LibSsh2Driver;
pub use openssl::OpenSslDriver;

/// Built single-architecture targets of other libraries, keyed by library.
pub type Dependencies = BTreeMap<Library, Target>;

#[derive(Debug, Error)]
pub enum DriverError {
  #[error(transparent)]
  Target(#[from] TargetError),

  #[error("{target}: expected exactly one architecture, got {count}")]
  NotSingleArchitecture { target: String, count: usize },

  #[error("{target}: dependency {dependency} was not provided")]
  MissingDependency { target: String, dependency: Library },

  #[error(
    "{target}: dependency {dependency} was built for {found}; platform and architecture set must match exactly"
  )]
  DependencyMismatch {
    target: String,
    dependency: Library,
    found: String,
  },

  #[error(transparent)]
  Tool(#[from] ToolError),

  #[error(transparent)]
  Toolchain(#[from] ToolchainError),

  #[error(transparent)]
  Fetch(#[from] FetchError),

  #[error(transparent)]
  Fs(#[from] FsError),

  #[error("{target}: {step} failed: {source}")]
  Step {
    target: String,
    step: &'static str,
    #[source]
    source: ProcessError,
  },

  #[error(transparent)]
  Cancelled(#[from] Cancelled),
}

/// One labelled native command of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
  pub label: &'static str,
  pub invocation: Invocation,
}

impl BuildStep {
  pub fn new(label: &'static str, invocation: Invocation) -> Self {
    Self { label, invocation }
  }
}

/// Knows how to drive one library's native build system.
pub trait LibraryDriver: Send + Sync {
  fn library(&self) -> Library;

  /// The configure (or generate) command for a validated single-architecture target.
  fn configure(&self, ctx: &BuildContext, target: &Target, deps: &Dependencies) -> Result<BuildStep, DriverError>;

  /// Build and install commands, run in order after configure.
  fn build_steps(&self, ctx: &BuildContext, target: &Target) -> Result<Vec<BuildStep>, DriverError>;
}

/// The driver responsible for `library`.
pub fn driver_for(library: Library) -> &'static dyn LibraryDriver {
  match library {
    Library::OpenSsl => &OpenSslDriver,
    Library::LibSsh2 => &LibSsh2Driver,
    Library::LibGit2 => &LibGit2Driver,
  }
}

/// Result of one single-architecture build.
#[derive(Debug, Clone, Serialize)]
pub struct SingleBuild {
  pub target: Target,
  pub install: PathBuf,
  pub log: PathBuf,
}

/// Check a single-architecture target and its dependencies before any side effect.
pub fn validate(library: Library, target: &Target, deps: &Dependencies) -> Result<(), DriverError> {
  if !target.is_single_architecture() {
    return Err(DriverError::NotSingleArchitecture {
      target: target.to_string(),
      count: target.architectures().len(),
    });
  }
  for &architecture in target.architectures() {
    matrix::ensure_compatible(target.platform(), architecture)?;
  }

  for &dependency in library.dependencies() {
    let dep = deps.get(&dependency).ok_or_else(|| DriverError::MissingDependency {
      target: target.to_string(),
      dependency,
    })?;
    if dep.platform() != target.platform() || !dep.same_architectures(target) {
      return Err(DriverError::DependencyMismatch {
        target: target.to_string(),
        dependency,
        found: dep.canonical_name(),
      });
    }
  }
  Ok(())
}

/// Run the full protocol for one single-architecture target.
pub fn build_single(
  driver: &dyn LibraryDriver,
  ctx: &BuildContext,
  target: &Target,
  deps: &Dependencies,
) -> Result<SingleBuild, DriverError> {
  let library = driver.library();
  validate(library, target, deps)?;
  ctx.cancel.check()?;

  let fs = &ctx.services.fs;
  let paths = target.paths(&ctx.work_root);
  fs.recreate_dir(&paths.build)?;
  fs.recreate_dir(&paths.install)?;
  let log = fs.create_log_file(&paths.log)?;
  info!(target = %target, log = %paths.log.display(), "building");
  ctx.cancel.check()?;

  SourceFetcher::new(&ctx.services).ensure(&library.source(), &paths.source)?;
  ctx.cancel.check()?;

  let configure = driver.configure(ctx, target, deps)?;
  run_step(ctx, target, &configure, &log)?;

  for step in driver.build_steps(ctx, target)? {
    ctx.cancel.check()?;
    run_step(ctx, target, &step, &log)?;
  }

  info!(target = %target, install = %paths.install.display(), "build finished");
  Ok(SingleBuild {
    target: target.clone(),
    install: paths.install,
    log: paths.log,
  })
}

fn run_step(ctx: &BuildContext, target: &Target, step: &BuildStep, log: &LogHandle) -> Result<(), DriverError> {
  debug!(target = %target, step = step.label, command = %step.invocation, "running build step");
  ctx
    .services
    .runner
    .run(&step.invocation, &OutputPolicy::Merged(log.clone()))
    .map_err(|source| DriverError::Step {
      target: target.to_string(),
      step: step.label,
      source,
    })?;
  Ok(())
}
