//! Implementation of the `buildgit2 targets` command.
//!
//! Prints the resolved plan: libraries in build order, each with its
//! per-platform targets and the single-architecture builds they split into.

use anyhow::Result;

use buildgit2_lib::execute::plan;
use buildgit2_lib::target::Target;

use super::Selection;
use crate::output::{print_json, print_warning, symbols};

pub fn cmd_targets(selection: &Selection, json: bool) -> Result<()> {
  let plan = plan(&selection.request())?;

  if json {
    let libraries: Vec<_> = plan
      .libraries
      .iter()
      .map(|lp| {
        let targets: Vec<_> = lp
          .targets
          .iter()
          .map(|t| {
            serde_json::json!({
              "platform": t.platform(),
              "architectures": t.architectures(),
              "canonical_name": t.canonical_name(),
              "builds": t
                .split_into_single_architecture()
                .iter()
                .map(Target::canonical_name)
                .collect::<Vec<_>>(),
            })
          })
          .collect();
        serde_json::json!({
          "library": lp.library,
          "revision": lp.revision,
          "targets": targets,
          "skipped_platforms": lp.skipped_platforms,
        })
      })
      .collect();
    return print_json(&serde_json::json!({ "libraries": libraries }));
  }

  for lp in &plan.libraries {
    println!("{} @ {}", lp.library, lp.revision);
    for target in &lp.targets {
      let builds: Vec<String> = target
        .split_into_single_architecture()
        .iter()
        .map(Target::canonical_name)
        .collect();
      if target.is_single_architecture() {
        println!("  {} {}", symbols::INFO, target.canonical_name());
      } else {
        println!(
          "  {} {} {} {}",
          symbols::INFO,
          builds.join(" + "),
          symbols::ARROW,
          target.canonical_name()
        );
      }
    }
    for platform in &lp.skipped_platforms {
      print_warning(&format!("{}: no requested architecture builds for {platform}", lp.library));
    }
  }
  Ok(())
}
