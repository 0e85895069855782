mod build;
mod bundle;
mod clean;
mod status;
mod targets;

use clap::Args;

use buildgit2_lib::execute::BuildRequest;
use buildgit2_lib::library::Library;
use buildgit2_lib::platform::{Architecture, Platform};

pub use build::cmd_build;
pub use bundle::cmd_bundle;
pub use clean::cmd_clean;
pub use status::cmd_status;
pub use targets::cmd_targets;

/// Libraries, platforms and architectures to operate on; each defaults to everything.
#[derive(Debug, Clone, Default, Args)]
pub struct Selection {
  /// Libraries (openssl, libssh2, libgit2)
  #[arg(short, long = "libs", value_name = "LIB", value_delimiter = ',', num_args = 1..)]
  libraries: Vec<Library>,

  /// Platforms (iPhoneOS, iPhoneSimulator, macOS)
  #[arg(short, long, value_name = "PLATFORM", value_delimiter = ',', num_args = 1..)]
  platforms: Vec<Platform>,

  /// Architectures (arm64, x86_64)
  #[arg(short, long = "archs", value_name = "ARCH", value_delimiter = ',', num_args = 1..)]
  architectures: Vec<Architecture>,
}

impl Selection {
  pub fn request(&self) -> BuildRequest {
    let all = BuildRequest::default();
    BuildRequest {
      libraries: or_all(&self.libraries, all.libraries),
      platforms: or_all(&self.platforms, all.platforms),
      architectures: or_all(&self.architectures, all.architectures),
    }
  }
}

fn or_all<T: Clone + PartialEq>(given: &[T], all: Vec<T>) -> Vec<T> {
  if given.is_empty() { all } else { dedup(given) }
}

fn dedup<T: Clone + PartialEq>(items: &[T]) -> Vec<T> {
  let mut out: Vec<T> = Vec::with_capacity(items.len());
  for item in items {
    if !out.contains(item) {
      out.push(item.clone());
    }
  }
  out
}

/// Tokio runtime for commands that drive the orchestrator.
fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
  use anyhow::Context;
  tokio::runtime::Runtime::new().context("Failed to create async runtime")
}
