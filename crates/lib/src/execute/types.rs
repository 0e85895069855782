//! Types for orchestrating a build run.
//!
//! This module defines the request, configuration, plan and report types,
//! and the error type for failures that abort planning or a whole run.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::bundle::{BundleArtifact, BundleError};
use crate::context::{Cancelled, host_parallelism};
use crate::driver::DriverError;
use crate::fetch::{FetchError, FetchOutcome};
use crate::library::Library;
use crate::merge::MergeError;
use crate::platform::{Architecture, Platform};
use crate::target::Target;

/// Which libraries, platforms and architectures to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
  pub libraries: Vec<Library>,
  pub platforms: Vec<Platform>,
  pub architectures: Vec<Architecture>,
}

impl Default for BuildRequest {
  /// Everything known.
  fn default() -> Self {
    Self {
      libraries: Library::ALL.to_vec(),
      platforms: Platform::ALL.to_vec(),
      architectures: Architecture::ALL.to_vec(),
    }
  }
}

/// Configuration for a build run.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  /// Maximum number of single-architecture builds running at once.
  pub jobs: usize,

  /// Continue with independent targets after a failure.
  pub keep_going: bool,

  /// Assemble bundles into this directory after a fully successful build.
  pub bundle_into: Option<PathBuf>,
}

impl Default for ExecuteConfig {
  fn default() -> Self {
    Self {
      jobs: host_parallelism(),
      keep_going: false,
      bundle_into: None,
    }
  }
}

/// Errors that abort planning or the whole run.
///
/// Failures of individual targets are recorded in the [`RunReport`] instead.
#[derive(Debug, Error)]
pub enum ExecuteError {
  #[error("library dependency cycle detected")]
  CycleDetected,

  #[error(
    "{library} needs {dependency} at {}, which is not built and not part of this run; \
     build it first or add it to the selection",
    path.display()
  )]
  MissingPrerequisite {
    library: Library,
    dependency: Library,
    path: PathBuf,
  },

  #[error("failed to fetch {library}: {source}")]
  Fetch {
    library: Library,
    #[source]
    source: FetchError,
  },

  #[error(transparent)]
  Driver(#[from] DriverError),

  #[error(transparent)]
  Merge(#[from] MergeError),

  #[error(transparent)]
  Bundle(#[from] BundleError),

  /// A worker task could not be run to completion.
  #[error("task error: {0}")]
  Task(String),

  #[error(transparent)]
  Cancelled(#[from] Cancelled),
}

/// Per-library part of a [`Plan`].
#[derive(Debug, Clone, Serialize)]
pub struct LibraryPlan {
  pub library: Library,
  pub revision: &'static str,
  /// One target per platform with at least one architecture, in request order.
  pub targets: Vec<Target>,
  /// Requested platforms none of the requested architectures can be built for.
  pub skipped_platforms: Vec<Platform>,
}

/// Resolved work for a request, libraries in dependency order.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
  pub libraries: Vec<LibraryPlan>,
}

impl Plan {
  pub fn get(&self, library: Library) -> Option<&LibraryPlan> {
    self.libraries.iter().find(|p| p.library == library)
  }

  pub fn contains(&self, library: Library) -> bool {
    self.get(library).is_some()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
  Fetch,
  Build,
  Merge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
  Done,
  Failed { error: String },
  Skipped { reason: String },
}

/// Outcome of one fetch, build or merge.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
  pub library: Library,
  pub kind: StepKind,
  /// Target identity such as `openssl/macOS-arm64`, or the library name for fetches.
  pub target: String,
  #[serde(flatten)]
  pub status: StepStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub log: Option<PathBuf>,
}

impl StepReport {
  pub fn is_failure(&self) -> bool {
    matches!(self.status, StepStatus::Failed { .. })
  }
}

/// Everything that happened during a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
  pub fetched: Vec<(Library, FetchOutcome)>,
  pub steps: Vec<StepReport>,
  pub bundles: Vec<BundleArtifact>,
  /// Why bundling failed after a successful build.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub bundle_error: Option<String>,
  /// Set when a failure stopped the run early.
  pub aborted: bool,
  pub cancelled: bool,
}

impl RunReport {
  pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
    self.steps.iter().filter(|s| s.is_failure())
  }

  pub fn skipped(&self) -> impl Iterator<Item = &StepReport> {
    self
      .steps
      .iter()
      .filter(|s| matches!(s.status, StepStatus::Skipped { .. }))
  }

  pub fn is_success(&self) -> bool {
    !self.aborted
      && !self.cancelled
      && self.bundle_error.is_none()
      && self.steps.iter().all(|s| s.status == StepStatus::Done)
  }

  /// Steps of one kind, in the order they were recorded.
  pub fn steps_of(&self, kind: StepKind) -> impl Iterator<Item = &StepReport> {
    self.steps.iter().filter(move |s| s.kind == kind)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_request_is_everything() {
    let request = BuildRequest::default();
    assert_eq!(request.libraries.len(), 3);
    assert_eq!(request.platforms.len(), 3);
    assert_eq!(request.architectures.len(), 2);
  }

  #[test]
  fn step_report_serializes_flat() {
    let step = StepReport {
      library: Library::OpenSsl,
      kind: StepKind::Build,
      target: "openssl/macOS-arm64".to_string(),
      status: StepStatus::Failed {
        error: "boom".to_string(),
      },
      log: None,
    };

    let json = serde_json::to_value(&step).unwrap();

    assert_eq!(
      json,
      serde_json::json!({
        "library": "openssl",
        "kind": "build",
        "target": "openssl/macOS-arm64",
        "status": "failed",
        "error": "boom",
      })
    );
  }

  #[test]
  fn empty_report_is_success_until_something_fails() {
    let mut report = RunReport::default();
    assert!(report.is_success());

    report.steps.push(StepReport {
      library: Library::LibSsh2,
      kind: StepKind::Merge,
      target: "libssh2/macOS-arm64-x86_64".to_string(),
      status: StepStatus::Skipped {
        reason: "dependency failed".to_string(),
      },
      log: None,
    });
    assert!(!report.is_success());
    assert_eq!(report.skipped().count(), 1);
    assert_eq!(report.failures().count(), 0);
  }

  #[test]
  fn bundle_error_is_reported_only_when_set() {
    let mut report = RunReport::default();
    let json = serde_json::to_value(&report).unwrap();
    assert!(json.get("bundle_error").is_none());

    report.bundle_error = Some("creating libssl.xcframework failed".to_string());
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["bundle_error"], "creating libssl.xcframework failed");
    assert!(!report.is_success());
  }
}
