//! Multi-platform bundle assembly with `xcodebuild -create-xcframework`.
//!
//! One bundle is produced per output name of a library, with one slice per
//! platform. Bundles are always rebuilt from scratch: any previous bundle at
//! the destination is removed first, and a failed run leaves whatever the
//! bundling tool wrote behind.

pub mod modulemap;

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::context::BuildContext;
use crate::fs::FsError;
use crate::platform::matrix;
use crate::process::{Invocation, OutputPolicy, ProcessError};
use crate::target::Target;
use crate::tools::{Tool, ToolError};

pub use modulemap::LIBGIT2_MODULE_MAP;

#[derive(Debug, Error)]
pub enum BundleError {
  #[error("no buildable targets to bundle for {library}")]
  NoTargets { library: String },

  #[error("{target}: missing artifact {}; build it first", path.display())]
  MissingArtifact { target: String, path: PathBuf },

  #[error(transparent)]
  Tool(#[from] ToolError),

  #[error(transparent)]
  Fs(#[from] FsError),

  #[error("creating {name}.xcframework failed: {source}")]
  Create {
    name: String,
    #[source]
    source: ProcessError,
  },
}

/// One assembled bundle.
#[derive(Debug, Clone, Serialize)]
pub struct BundleArtifact {
  pub name: String,
  pub path: PathBuf,
  /// Slice directory names inside the bundle, in platform order.
  pub slices: Vec<String>,
}

/// Bundle path for a logical output name.
pub fn bundle_path(output_dir: &Path, name: &str) -> PathBuf {
  output_dir.join(format!("{name}.xcframework"))
}

/// Assemble one bundle per output name from the final per-platform installs.
///
/// `targets` holds one target per platform, in the order slices should be
/// passed to the bundling tool. Targets with no architectures are skipped.
/// When `module_map` is given it is written into every slice's headers.
pub fn assemble_bundles(
  ctx: &BuildContext,
  output_dir: &Path,
  targets: &[Target],
  module_map: Option<&str>,
) -> Result<Vec<BundleArtifact>, BundleError> {
  let buildable: Vec<&Target> = targets
    .iter()
    .filter(|t| {
      if !t.is_buildable() {
        warn!(library = t.library_name(), platform = %t.platform(), "no architectures for platform, leaving it out of the bundle");
      }
      t.is_buildable()
    })
    .collect();

  let Some(first) = buildable.first() else {
    return Err(BundleError::NoTargets {
      library: targets.first().map(|t| t.library_name().to_string()).unwrap_or_default(),
    });
  };

  let fs = &ctx.services.fs;
  let root = &ctx.work_root;

  for target in &buildable {
    for archive in target.archive_paths(root) {
      if !fs.exists(&archive) {
        return Err(BundleError::MissingArtifact {
          target: target.to_string(),
          path: archive,
        });
      }
    }
  }

  let xcodebuild = ctx.services.tools.locate(Tool::Xcodebuild)?;
  let slices: Vec<String> = buildable
    .iter()
    .map(|t| matrix::bundle_slice_identifier(t.platform(), t.architectures()))
    .collect();

  let mut bundles = Vec::with_capacity(first.output_names().len());
  for name in first.output_names() {
    let path = bundle_path(output_dir, name);
    fs.remove(&path)?;

    let mut create = Invocation::new(&xcodebuild)
      .named("xcodebuild -create-xcframework")
      .arg("-create-xcframework");
    for target in &buildable {
      create = create
        .arg("-library")
        .path_arg(&target.archive_path(root, name))
        .arg("-headers")
        .path_arg(&target.headers_directory(root));
    }
    let create = create.arg("-output").path_arg(&path);

    info!(bundle = %path.display(), slices = buildable.len(), "creating bundle");
    ctx
      .services
      .runner
      .run(&create, &OutputPolicy::Quiet)
      .map_err(|source| BundleError::Create {
        name: name.clone(),
        source,
      })?;

    if let Some(contents) = module_map {
      for slice in &slices {
        let mut destination = path.join(slice);
        destination.extend(modulemap::MODULE_MAP_RELATIVE_PATH);
        fs.write(&destination, contents.as_bytes())?;
      }
    }

    bundles.push(BundleArtifact {
      name: name.clone(),
      path,
      slices: slices.clone(),
    });
  }

  Ok(bundles)
}
