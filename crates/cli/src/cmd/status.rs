//! Implementation of the `buildgit2 status` command.
//!
//! Reports which source checkouts are cached in the work root and which
//! bundles exist in the output directory.

use anyhow::Result;

use buildgit2_lib::bundle::bundle_path;
use buildgit2_lib::config::{BuildConfig, ConfigOverrides};
use buildgit2_lib::context::Services;
use buildgit2_lib::fetch::SourceFetcher;
use buildgit2_lib::library::Library;

use crate::output::{print_info, print_json, print_stat, symbols};

pub fn cmd_status(overrides: &ConfigOverrides, json: bool) -> Result<()> {
  let config = BuildConfig::resolve(overrides)?;
  let services = Services::system();
  let sources = SourceFetcher::new(&services).status(&config.work_root, &Library::ALL);

  let bundles: Vec<_> = Library::ALL
    .iter()
    .flat_map(|lib| lib.output_names())
    .map(|name| {
      let path = bundle_path(&config.output_dir, &name);
      let present = services.fs.exists(&path);
      (name, path, present)
    })
    .collect();

  if json {
    let bundle_list: Vec<_> = bundles
      .iter()
      .map(|(name, path, present)| serde_json::json!({ "name": name, "path": path, "present": present }))
      .collect();
    return print_json(&serde_json::json!({
      "work_root": config.work_root,
      "output_dir": config.output_dir,
      "sources": sources,
      "bundles": bundle_list,
    }));
  }

  print_info(&format!("buildgit2 v{}", env!("CARGO_PKG_VERSION")));
  print_stat("Work root", &config.work_root.display().to_string());
  print_stat("Output", &config.output_dir.display().to_string());

  println!();
  println!("Sources:");
  for source in &sources {
    let mark = if source.present { symbols::SUCCESS } else { symbols::SKIPPED };
    let state = if source.present { "cached" } else { "missing" };
    println!("  {mark} {} @ {} ({state})", source.library, source.revision);
  }

  println!();
  println!("Bundles:");
  for (name, path, present) in &bundles {
    if *present {
      println!("  {} {name} {} {}", symbols::SUCCESS, symbols::ARROW, path.display());
    } else {
      println!("  {} {name} (not built)", symbols::SKIPPED);
    }
  }
  Ok(())
}
