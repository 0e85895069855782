//! Implementation of the `buildgit2 bundle` command.

use anyhow::{Context, Result};

use buildgit2_lib::config::{BuildConfig, ConfigOverrides};
use buildgit2_lib::context::{CancelFlag, Services};
use buildgit2_lib::execute::{Orchestrator, plan};

use super::{Selection, runtime};
use crate::output::{print_json, print_success};

/// Assemble bundles for the selection from installs left by an earlier build.
pub fn cmd_bundle(selection: &Selection, overrides: &ConfigOverrides, json: bool) -> Result<()> {
  let config = BuildConfig::resolve(overrides)?;
  let plan = plan(&selection.request())?;

  let ctx = config.build_context(Services::system(), CancelFlag::new());
  let orchestrator = Orchestrator::new(ctx, config.execute_config());

  let rt = runtime()?;
  let bundles = rt
    .block_on(orchestrator.bundle(&plan, &config.output_dir))
    .context("Bundling failed")?;

  if json {
    print_json(&bundles)?;
  } else {
    for bundle in &bundles {
      print_success(&format!("{} ({})", bundle.path.display(), bundle.slices.join(", ")));
    }
  }
  Ok(())
}
