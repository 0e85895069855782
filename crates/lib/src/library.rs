//! The libraries this tool knows how to build.
//!
//! Each library has a pinned upstream revision, an install layout and a
//! list of other libraries whose install outputs it links against.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::platform::UnknownNameError;

/// A pinned upstream source tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSpec {
  /// Remote git location.
  pub url: &'static str,
  /// Tag or branch checked out (never a moving reference).
  pub revision: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Library {
  /// Crypto library (OpenSSL).
  OpenSsl,
  /// SSH transport library (libssh2), links OpenSSL.
  LibSsh2,
  /// Git library (libgit2), links OpenSSL and libssh2.
  LibGit2,
}

impl Library {
  /// All libraries in dependency order.
  pub const ALL: [Library; 3] = [Library::OpenSsl, Library::LibSsh2, Library::LibGit2];

  /// Directory and bundle base name.
  pub fn name(&self) -> &'static str {
    match self {
      Self::OpenSsl => "openssl",
      Self::LibSsh2 => "libssh2",
      Self::LibGit2 => "libgit2",
    }
  }

  pub fn source(&self) -> SourceSpec {
    match self {
      Self::OpenSsl => SourceSpec {
        url: "https://github.com/openssl/openssl.git",
        revision: "openssl-3.5.1",
      },
      Self::LibSsh2 => SourceSpec {
        url: "https://github.com/libssh2/libssh2.git",
        revision: "libssh2-1.11.1",
      },
      Self::LibGit2 => SourceSpec {
        url: "https://github.com/libgit2/libgit2.git",
        revision: "v1.9.1",
      },
    }
  }

  /// Libraries whose install directories must exist before this one configures.
  pub fn dependencies(&self) -> &'static [Library] {
    match self {
      Self::OpenSsl => &[],
      Self::LibSsh2 => &[Library::OpenSsl],
      Self::LibGit2 => &[Library::OpenSsl, Library::LibSsh2],
    }
  }

  /// Install-relative directory holding the static archives.
  pub fn binaries_relative_path(&self) -> &'static str {
    "lib"
  }

  /// Install-relative directory holding the public headers.
  pub fn headers_relative_path(&self) -> &'static str {
    match self {
      Self::OpenSsl => "include/openssl",
      Self::LibSsh2 | Self::LibGit2 => "include",
    }
  }

  /// Logical binaries produced by one build; each becomes `<name>.a` and one bundle.
  pub fn output_names(&self) -> Vec<String> {
    match self {
      Self::OpenSsl => vec!["libssl".to_string(), "libcrypto".to_string()],
      Self::LibSsh2 | Self::LibGit2 => vec![self.name().to_string()],
    }
  }

  /// Whether bundle slices need the hand-written module map.
  pub fn needs_module_map(&self) -> bool {
    matches!(self, Self::LibGit2)
  }
}

impl fmt::Display for Library {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name())
  }
}

impl FromStr for Library {
  type Err = UnknownNameError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|l| l.name().eq_ignore_ascii_case(s))
      .ok_or_else(|| UnknownNameError::new("library", s, Self::ALL.iter().map(|l| l.name())))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dependencies_precede_dependents_in_all() {
    for (idx, lib) in Library::ALL.iter().enumerate() {
      for dep in lib.dependencies() {
        let dep_idx = Library::ALL.iter().position(|l| l == dep).unwrap();
        assert!(dep_idx < idx, "{dep} should come before {lib}");
      }
    }
  }

  #[test]
  fn openssl_produces_two_archives() {
    assert_eq!(Library::OpenSsl.output_names(), vec!["libssl", "libcrypto"]);
    assert_eq!(Library::LibGit2.output_names(), vec!["libgit2"]);
  }

  #[test]
  fn parses_names() {
    assert_eq!("LibGit2".parse::<Library>().unwrap(), Library::LibGit2);
    assert!("zlib".parse::<Library>().is_err());
  }

  #[test]
  fn revisions_are_pinned_tags() {
    for lib in Library::ALL {
      let source = lib.source();
      assert!(source.url.starts_with("https://"));
      assert_ne!(source.revision, "main");
      assert_ne!(source.revision, "master");
    }
  }
}
