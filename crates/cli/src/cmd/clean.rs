//! Implementation of the `buildgit2 clean` command.

use std::io::{self, IsTerminal, Write};

use anyhow::{Context, Result, bail};

use buildgit2_lib::config::{BuildConfig, ConfigOverrides};
use buildgit2_lib::context::Services;
use buildgit2_lib::fetch::SourceFetcher;
use buildgit2_lib::library::Library;

use crate::output::{print_info, print_success};

/// Remove the work root, or with `sources_only` just the cached checkouts.
pub fn cmd_clean(overrides: &ConfigOverrides, sources_only: bool, force: bool) -> Result<()> {
  let config = BuildConfig::resolve(overrides)?;
  let services = Services::system();
  let root = &config.work_root;

  if !services.fs.exists(root) {
    print_info(&format!("Nothing to clean at {}", root.display()));
    return Ok(());
  }

  if sources_only {
    let fetcher = SourceFetcher::new(&services);
    let mut removed = 0;
    for library in Library::ALL {
      if fetcher
        .clean(root, library)
        .with_context(|| format!("Failed to remove {library} sources"))?
      {
        removed += 1;
      }
    }
    print_success(&format!("Removed {removed} source checkout(s)"));
    return Ok(());
  }

  if !confirm(&format!("Remove {} and everything in it?", root.display()), force)? {
    print_info("Aborted");
    return Ok(());
  }
  services
    .fs
    .remove(root)
    .with_context(|| format!("Failed to remove {}", root.display()))?;
  print_success(&format!("Removed {}", root.display()));
  Ok(())
}

fn confirm(question: &str, force: bool) -> Result<bool> {
  if force {
    return Ok(true);
  }
  if !io::stdin().is_terminal() {
    bail!("Refusing to delete without confirmation in non-interactive mode. Use --force.");
  }

  let mut stderr = io::stderr();
  write!(stderr, "{question} [y/N] ")?;
  stderr.flush()?;

  let mut answer = String::new();
  io::stdin().read_line(&mut answer)?;
  Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
