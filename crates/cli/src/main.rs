mod cmd;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use buildgit2_lib::config::ConfigOverrides;

use cmd::Selection;

/// Cross-compile libgit2, libssh2 and OpenSSL for Apple platforms and package them as xcframeworks
#[derive(Parser)]
#[command(name = "buildgit2")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Work root for sources, builds and installs [env: BUILDGIT2_WORK_DIR]
  #[arg(long, global = true, value_name = "DIR")]
  work_dir: Option<PathBuf>,

  /// Directory receiving the xcframework bundles [env: BUILDGIT2_OUTPUT_DIR]
  #[arg(long, global = true, value_name = "DIR")]
  output_dir: Option<PathBuf>,

  /// Print machine-readable JSON on stdout
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build the selected libraries and bundle them
  Build {
    #[command(flatten)]
    selection: Selection,

    /// Maximum concurrent single-architecture builds [env: BUILDGIT2_JOBS]
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Continue with independent targets after a failure
    #[arg(long)]
    keep_going: bool,

    /// Stop after merging; do not create xcframework bundles
    #[arg(long)]
    no_bundle: bool,
  },

  /// Assemble bundles from existing installs without building
  Bundle {
    #[command(flatten)]
    selection: Selection,
  },

  /// Show what a build would produce without running anything
  Targets {
    #[command(flatten)]
    selection: Selection,
  },

  /// Show cached sources and produced bundles
  Status,

  /// Remove the work root
  Clean {
    /// Only remove cached source checkouts
    #[arg(long)]
    sources: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    force: bool,
  },
}

fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let mut overrides = ConfigOverrides {
    work_dir: cli.work_dir,
    output_dir: cli.output_dir,
    ..Default::default()
  };

  match cli.command {
    Commands::Build {
      selection,
      jobs,
      keep_going,
      no_bundle,
    } => {
      overrides.jobs = jobs;
      overrides.keep_going = keep_going;
      overrides.no_bundle = no_bundle;
      cmd::cmd_build(&selection, &overrides, cli.json)
    }
    Commands::Bundle { selection } => cmd::cmd_bundle(&selection, &overrides, cli.json),
    Commands::Targets { selection } => cmd::cmd_targets(&selection, cli.json),
    Commands::Status => cmd::cmd_status(&overrides, cli.json),
    Commands::Clean { sources, force } => cmd::cmd_clean(&overrides, sources, force),
  }
}
