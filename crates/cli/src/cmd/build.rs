//! Implementation of the `buildgit2 build` command.
//!
//! Plans the request, fetches sources, runs every single-architecture build,
//! merges architectures and, unless `--no-bundle` is given, assembles the
//! xcframework bundles. Ctrl-C cancels the run between build phases.

use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing::warn;

use buildgit2_lib::config::{BuildConfig, ConfigOverrides};
use buildgit2_lib::context::{CancelFlag, Services};
use buildgit2_lib::execute::{Orchestrator, RunReport, plan};

use super::{Selection, runtime};
use crate::output::{format_duration, print_error, print_info, print_json, print_step, print_success, print_warning};

pub fn cmd_build(selection: &Selection, overrides: &ConfigOverrides, json: bool) -> Result<()> {
  let config = BuildConfig::resolve(overrides)?;
  let plan = plan(&selection.request())?;
  for lp in &plan.libraries {
    for platform in &lp.skipped_platforms {
      print_warning(&format!("{}: no requested architecture builds for {platform}", lp.library));
    }
  }

  if !json {
    print_info(&format!("Work root: {}", config.work_root.display()));
  }

  let cancel = CancelFlag::new();
  let ctx = config.build_context(Services::system(), cancel.clone());
  let orchestrator = Orchestrator::new(ctx, config.execute_config());

  let started = Instant::now();
  let rt = runtime()?;
  let report = rt
    .block_on(async {
      let watcher = tokio::spawn(cancel_on_ctrl_c(cancel));
      let result = orchestrator.run(&plan).await;
      watcher.abort();
      result
    })
    .context("Build failed")?;

  if json {
    print_json(&report)?;
  } else {
    print_report(&report, started.elapsed());
  }

  if report.cancelled {
    bail!("build cancelled");
  }
  if let Some(error) = &report.bundle_error {
    bail!("bundling failed: {error}");
  }
  if !report.is_success() {
    bail!("{} step(s) failed", report.failures().count());
  }
  Ok(())
}

async fn cancel_on_ctrl_c(cancel: CancelFlag) {
  if tokio::signal::ctrl_c().await.is_ok() {
    warn!("interrupt received, cancelling after the current build phase");
    cancel.cancel();
  }
}

fn print_report(report: &RunReport, elapsed: std::time::Duration) {
  println!();
  for step in &report.steps {
    print_step(step);
  }
  for bundle in &report.bundles {
    print_success(&format!("{} ({})", bundle.path.display(), bundle.slices.join(", ")));
  }
  println!();

  let failed = report.failures().count();
  if let Some(error) = &report.bundle_error {
    print_error(&format!("Bundling failed: {error}"));
  }
  if report.is_success() {
    print_success(&format!("Build complete in {}", format_duration(elapsed)));
  } else {
    print_error(&format!(
      "{failed} failed, {} skipped after {}",
      report.skipped().count(),
      format_duration(elapsed)
    ));
  }
}
