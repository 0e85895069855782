//! Combining single-architecture installs into one universal install.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::context::BuildContext;
use crate::fs::FsError;
use crate::process::{Invocation, OutputPolicy, ProcessError};
use crate::target::Target;
use crate::tools::{Tool, ToolError};

#[derive(Debug, Error)]
pub enum MergeError {
  #[error("{target} has {count} architecture(s); nothing to merge")]
  NothingToMerge { target: String, count: usize },

  #[error(transparent)]
  Tool(#[from] ToolError),

  #[error(transparent)]
  Fs(#[from] FsError),

  #[error("{target}: lipo failed for {output}: {source}")]
  Lipo {
    target: String,
    output: String,
    #[source]
    source: ProcessError,
  },
}

/// Archives written by a merge.
#[derive(Debug, Clone, Serialize)]
pub struct MergedArtifacts {
  pub archives: Vec<PathBuf>,
  pub headers: PathBuf,
}

/// Merge the single-architecture installs of a multi-architecture `target`
/// into the target's own install directory.
///
/// Headers come from the first single-architecture install; every output
/// name gets one `lipo -create` with the archives in split order.
pub fn merge_architectures(ctx: &BuildContext, target: &Target) -> Result<MergedArtifacts, MergeError> {
  let singles = target.split_into_single_architecture();
  if singles.len() < 2 {
    return Err(MergeError::NothingToMerge {
      target: target.to_string(),
      count: singles.len(),
    });
  }

  let fs = &ctx.services.fs;
  let root = &ctx.work_root;
  let binaries = target.binaries_directory(root);
  let headers = target.headers_directory(root);
  let lipo = ctx.services.tools.locate(Tool::Lipo)?;

  fs.recreate_dir(&binaries)?;
  fs.remove(&headers)?;
  fs.copy_tree(&singles[0].headers_directory(root), &headers)?;

  let mut archives = Vec::with_capacity(target.output_names().len());
  for name in target.output_names() {
    let output = target.archive_path(root, name);
    let mut invocation = Invocation::new(&lipo).arg("-create");
    for single in &singles {
      invocation = invocation.path_arg(&single.archive_path(root, name));
    }
    let invocation = invocation.arg("-output").path_arg(&output);

    ctx
      .services
      .runner
      .run(&invocation, &OutputPolicy::Quiet)
      .map_err(|source| MergeError::Lipo {
        target: target.to_string(),
        output: name.clone(),
        source,
      })?;
    archives.push(output);
  }

  info!(target = %target, "merged architectures");
  Ok(MergedArtifacts { archives, headers })
}
