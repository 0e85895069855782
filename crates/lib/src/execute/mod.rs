//! Build orchestration.
//!
//! Turns a [`BuildRequest`] into a [`Plan`] and executes it:
//!
//! 1. Libraries run one after another in dependency order.
//! 2. Each library's source is fetched once, before any of its builds start.
//! 3. All single-architecture builds of the library then run concurrently on
//!    the blocking pool, at most `jobs` at a time.
//! 4. Platforms with more than one architecture are merged once all of their
//!    single-architecture builds succeeded.
//! 5. Bundles are assembled only when asked for and only after a fully
//!    successful build.
//!
//! Failures of individual targets are recorded in the [`RunReport`]. Without
//! `keep_going` the run stops after the library in which the first failure
//! happened; with it, builds whose dependency failed are recorded as skipped
//! and everything else proceeds.

pub mod graph;
pub mod types;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::bundle::{self, BundleArtifact, LIBGIT2_MODULE_MAP};
use crate::context::BuildContext;
use crate::driver::{self, Dependencies};
use crate::fetch::{SourceFetcher, source_directory};
use crate::library::Library;
use crate::merge;
use crate::platform::{Architecture, Platform};
use crate::target::Target;

pub use graph::LibraryGraph;
pub use types::{
  BuildRequest, ExecuteConfig, ExecuteError, LibraryPlan, Plan, RunReport, StepKind, StepReport, StepStatus,
};

/// Resolve a request into per-library targets in dependency order.
pub fn plan(request: &BuildRequest) -> Result<Plan, ExecuteError> {
  let order = LibraryGraph::new().order(&request.libraries)?;

  let libraries = order
    .into_iter()
    .map(|library| {
      let (targets, empty): (Vec<Target>, Vec<Target>) =
        Target::for_library(library, &request.platforms, &request.architectures)
          .into_iter()
          .partition(Target::is_buildable);

      let skipped_platforms: Vec<Platform> = empty.iter().map(Target::platform).collect();
      for platform in &skipped_platforms {
        warn!(library = %library, platform = %platform, "no requested architecture can be built for platform, skipping");
      }

      LibraryPlan {
        library,
        revision: library.source().revision,
        targets,
        skipped_platforms,
      }
    })
    .collect();

  Ok(Plan { libraries })
}

/// Every (library, platform, architecture) a build needs that this run does not produce
/// must already be installed.
pub fn check_prerequisites(ctx: &BuildContext, plan: &Plan) -> Result<(), ExecuteError> {
  let graph = LibraryGraph::new();
  for lp in &plan.libraries {
    for dependency in graph.transitive_dependencies(lp.library) {
      if plan.contains(dependency) {
        continue;
      }
      for single in lp.targets.iter().flat_map(Target::split_into_single_architecture) {
        let installed = single.sibling(dependency);
        let required = installed
          .archive_paths(&ctx.work_root)
          .into_iter()
          .chain(std::iter::once(installed.headers_directory(&ctx.work_root)));
        for path in required {
          if !ctx.services.fs.exists(&path) {
            return Err(ExecuteError::MissingPrerequisite {
              library: lp.library,
              dependency,
              path,
            });
          }
        }
      }
    }
  }
  Ok(())
}

type Unit = (Library, Platform, Architecture);

fn unit_of(library: Library, single: &Target) -> Option<Unit> {
  single.architectures().first().map(|&arch| (library, single.platform(), arch))
}

/// Runs a [`Plan`] against a [`BuildContext`].
pub struct Orchestrator {
  ctx: BuildContext,
  config: ExecuteConfig,
  semaphore: Arc<Semaphore>,
}

impl Orchestrator {
  pub fn new(ctx: BuildContext, config: ExecuteConfig) -> Self {
    let semaphore = Arc::new(Semaphore::new(config.jobs.max(1)));
    Self { ctx, config, semaphore }
  }

  /// Build everything in `plan`.
  pub async fn run(&self, plan: &Plan) -> Result<RunReport, ExecuteError> {
    check_prerequisites(&self.ctx, plan)?;
    info!(libraries = plan.libraries.len(), jobs = self.config.jobs, "starting build run");

    let mut report = RunReport::default();
    // Single-architecture units that did not produce an install this run.
    let mut unavailable: HashSet<Unit> = HashSet::new();

    for lp in &plan.libraries {
      if self.ctx.cancel.is_cancelled() {
        report.cancelled = true;
        break;
      }

      let failed_before = report.failures().count();
      self.run_library(lp, &mut report, &mut unavailable).await;

      if report.failures().count() > failed_before && !self.config.keep_going {
        error!(library = %lp.library, "stopping after failure");
        report.aborted = true;
        break;
      }
    }
    if self.ctx.cancel.is_cancelled() {
      report.cancelled = true;
    }

    if let Some(output_dir) = &self.config.bundle_into {
      if report.is_success() {
        match self.bundle(plan, output_dir).await {
          Ok(bundles) => report.bundles = bundles,
          Err(e) => {
            error!(error = %e, "bundling failed");
            report.bundle_error = Some(e.to_string());
          }
        }
      } else {
        warn!("build did not fully succeed, not bundling");
      }
    }

    info!(
      steps = report.steps.len(),
      failed = report.failures().count(),
      skipped = report.skipped().count(),
      "build run complete"
    );
    Ok(report)
  }

  async fn run_library(&self, lp: &LibraryPlan, report: &mut RunReport, unavailable: &mut HashSet<Unit>) {
    let library = lp.library;
    let singles: Vec<Target> = lp
      .targets
      .iter()
      .flat_map(Target::split_into_single_architecture)
      .collect();
    if singles.is_empty() {
      warn!(library = %library, "nothing to build for this library");
      return;
    }

    // Fetch once, up front.
    let services = self.ctx.services.clone();
    let source = source_directory(&self.ctx.work_root, library);
    let fetched = self
      .blocking(move || {
        SourceFetcher::new(&services)
          .ensure(&library.source(), &source)
          .map_err(|source| ExecuteError::Fetch { library, source })
      })
      .await;
    match fetched {
      Ok(outcome) => {
        report.fetched.push((library, outcome));
        report.steps.push(step(library, StepKind::Fetch, library.name(), StepStatus::Done, None));
      }
      Err(e) => {
        error!(library = %library, error = %e, "fetch failed");
        report.steps.push(step(
          library,
          StepKind::Fetch,
          library.name(),
          StepStatus::Failed { error: e.to_string() },
          None,
        ));
        unavailable.extend(singles.iter().filter_map(|s| unit_of(library, s)));
        return;
      }
    }

    // Single-architecture builds.
    let mut join_set = JoinSet::new();
    let mut slots: Vec<Option<StepReport>> = vec![None; singles.len()];

    for (index, single) in singles.iter().enumerate() {
      let log = Some(single.paths(&self.ctx.work_root).log);
      let failed_dep = library.dependencies().iter().copied().find(|&dep| {
        unit_of(dep, single).is_some_and(|unit| unavailable.contains(&unit))
      });
      if let Some(dep) = failed_dep {
        warn!(target = %single, dependency = %dep, "skipping build due to failed dependency");
        slots[index] = Some(step(
          library,
          StepKind::Build,
          single.to_string(),
          StepStatus::Skipped {
            reason: format!("dependency {dep} was not built"),
          },
          None,
        ));
        continue;
      }
      if self.ctx.cancel.is_cancelled() {
        slots[index] = Some(step(library, StepKind::Build, single.to_string(), cancelled(), log));
        continue;
      }

      let deps: Dependencies = library
        .dependencies()
        .iter()
        .map(|&dep| (dep, single.sibling(dep)))
        .collect();
      let ctx = self.ctx.clone();
      let target = single.clone();
      let semaphore = self.semaphore.clone();

      join_set.spawn(async move {
        let result = run_blocking(semaphore, move || {
          driver::build_single(driver::driver_for(library), &ctx, &target, &deps).map_err(ExecuteError::from)
        })
        .await;
        (index, result)
      });
    }

    while let Some(joined) = join_set.join_next().await {
      match joined {
        Ok((index, result)) => {
          let single = &singles[index];
          let log = Some(single.paths(&self.ctx.work_root).log);
          let status = match result {
            Ok(_) => {
              info!(target = %single, "build succeeded");
              StepStatus::Done
            }
            Err(e) => {
              error!(target = %single, error = %e, "build failed");
              StepStatus::Failed { error: e.to_string() }
            }
          };
          slots[index] = Some(step(library, StepKind::Build, single.to_string(), status, log));
        }
        Err(e) => error!(error = %e, "build task panicked"),
      }
    }
    // Skipped and cancelled slots are already filled; anything left never reported back.
    for (index, slot) in slots.iter_mut().enumerate() {
      if slot.is_none() {
        *slot = Some(step(library, StepKind::Build, singles[index].to_string(), lost_task(), None));
      }
    }

    for (index, single) in singles.iter().enumerate() {
      let built = slots[index].as_ref().is_some_and(|s| s.status == StepStatus::Done);
      if !built && let Some(unit) = unit_of(library, single) {
        unavailable.insert(unit);
      }
    }
    let stop = !self.config.keep_going && slots.iter().flatten().any(StepReport::is_failure);
    report.steps.extend(slots.into_iter().flatten());
    if stop {
      return;
    }

    // Merge multi-architecture platforms.
    let mut merges = JoinSet::new();
    let mut merge_slots: Vec<Option<StepReport>> = vec![None; lp.targets.len()];
    let mut spawned = Vec::new();
    for (index, target) in lp.targets.iter().enumerate() {
      if target.is_single_architecture() {
        continue;
      }
      let missing = target
        .split_into_single_architecture()
        .iter()
        .filter_map(|s| unit_of(library, s))
        .any(|unit| unavailable.contains(&unit));
      if missing {
        merge_slots[index] = Some(step(
          library,
          StepKind::Merge,
          target.to_string(),
          StepStatus::Skipped {
            reason: "not every architecture was built".to_string(),
          },
          None,
        ));
        continue;
      }
      if self.ctx.cancel.is_cancelled() {
        merge_slots[index] = Some(step(library, StepKind::Merge, target.to_string(), cancelled(), None));
        continue;
      }

      let ctx = self.ctx.clone();
      let target = target.clone();
      let semaphore = self.semaphore.clone();
      spawned.push(index);
      merges.spawn(async move {
        let result = run_blocking(semaphore, move || {
          merge::merge_architectures(&ctx, &target).map_err(ExecuteError::from)
        })
        .await;
        (index, result)
      });
    }

    while let Some(joined) = merges.join_next().await {
      match joined {
        Ok((index, result)) => {
          let target = &lp.targets[index];
          let status = match result {
            Ok(_) => StepStatus::Done,
            Err(e) => {
              error!(target = %target, error = %e, "merge failed");
              StepStatus::Failed { error: e.to_string() }
            }
          };
          merge_slots[index] = Some(step(library, StepKind::Merge, target.to_string(), status, None));
        }
        Err(e) => error!(error = %e, "merge task panicked"),
      }
    }
    for index in spawned {
      if merge_slots[index].is_none() {
        merge_slots[index] = Some(step(library, StepKind::Merge, lp.targets[index].to_string(), lost_task(), None));
      }
    }
    report.steps.extend(merge_slots.into_iter().flatten());
  }

  /// Assemble bundles for every library in `plan` from existing installs.
  pub async fn bundle(&self, plan: &Plan, output_dir: &Path) -> Result<Vec<BundleArtifact>, ExecuteError> {
    let mut bundles = Vec::new();
    for lp in &plan.libraries {
      self.ctx.cancel.check()?;
      let ctx = self.ctx.clone();
      let output_dir = output_dir.to_path_buf();
      let targets = lp.targets.clone();
      let module_map = lp.library.needs_module_map().then_some(LIBGIT2_MODULE_MAP);

      let assembled = self
        .blocking(move || {
          bundle::assemble_bundles(&ctx, &output_dir, &targets, module_map).map_err(ExecuteError::from)
        })
        .await?;
      for artifact in &assembled {
        info!(bundle = %artifact.path.display(), "bundle ready");
      }
      bundles.extend(assembled);
    }
    Ok(bundles)
  }

  async fn blocking<T, F>(&self, f: F) -> Result<T, ExecuteError>
  where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ExecuteError> + Send + 'static,
  {
    run_blocking(self.semaphore.clone(), f).await
  }
}

/// Run blocking work on the blocking pool once a permit is available.
async fn run_blocking<T, F>(semaphore: Arc<Semaphore>, f: F) -> Result<T, ExecuteError>
where
  T: Send + 'static,
  F: FnOnce() -> Result<T, ExecuteError> + Send + 'static,
{
  let _permit = semaphore
    .acquire_owned()
    .await
    .map_err(|e| ExecuteError::Task(e.to_string()))?;
  tokio::task::spawn_blocking(f)
    .await
    .map_err(|e| ExecuteError::Task(e.to_string()))?
}

fn step(
  library: Library,
  kind: StepKind,
  target: impl Into<String>,
  status: StepStatus,
  log: Option<std::path::PathBuf>,
) -> StepReport {
  StepReport {
    library,
    kind,
    target: target.into(),
    status,
    log,
  }
}

fn lost_task() -> StepStatus {
  StepStatus::Failed {
    error: "task did not complete".to_string(),
  }
}

fn cancelled() -> StepStatus {
  StepStatus::Skipped {
    reason: "cancelled".to_string(),
  }
}
