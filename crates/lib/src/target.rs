//! Build targets: one library for one platform and a set of architectures.
//!
//! A [`Target`] is a value type. Its on-disk layout is derived entirely from
//! its identity and a work root, so two targets with the same library,
//! platform and architecture *set* always agree on where their sources,
//! build trees, logs and install trees live.
//!
//! # Layout
//!
//! ```text
//! <work root>/<library>/src                       shared source checkout
//! <work root>/<library>/<Platform>-<a>-<b>/build  disposable build tree
//! <work root>/<library>/<Platform>-<a>-<b>/install
//! <work root>/<library>/<Platform>-<a>-<b>/build.log
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::library::Library;
use crate::platform::{Architecture, Platform, matrix};

const SOURCE_DIR: &str = "src";
const BUILD_DIR: &str = "build";
const INSTALL_DIR: &str = "install";
const LOG_FILE: &str = "build.log";

/// Errors raised while constructing targets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
  /// Library names become directory names.
  #[error("invalid library name '{0}': use ASCII letters, digits, '-', '_' or '.'")]
  InvalidLibraryName(String),

  #[error("architecture {architecture} cannot be built for platform {platform}")]
  IncompatiblePlatformArchitecture {
    platform: Platform,
    architecture: Architecture,
  },

  #[error("architecture {0} listed more than once")]
  DuplicateArchitecture(Architecture),
}

/// Where a library's build places its archives and headers, relative to the
/// install directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallLayout {
  pub binaries_relative_path: PathBuf,
  pub headers_relative_path: PathBuf,
  /// Logical binary names; each is installed as `<name>.a`.
  pub output_names: Vec<String>,
}

impl InstallLayout {
  /// Layout with a single output named after the library.
  pub fn new(library_name: &str, binaries: impl Into<PathBuf>, headers: impl Into<PathBuf>) -> Self {
    Self {
      binaries_relative_path: binaries.into(),
      headers_relative_path: headers.into(),
      output_names: vec![library_name.to_string()],
    }
  }

  pub fn with_outputs(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
    self.output_names = names.into_iter().map(Into::into).collect();
    self
  }

  pub fn of(library: Library) -> Self {
    Self::new(library.name(), library.binaries_relative_path(), library.headers_relative_path())
      .with_outputs(library.output_names())
  }
}

/// Directories derived from a target and a work root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetPaths {
  pub working: PathBuf,
  pub source: PathBuf,
  pub build: PathBuf,
  pub install: PathBuf,
  pub log: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
  library_name: String,
  platform: Platform,
  architectures: Vec<Architecture>,
  layout: InstallLayout,
}

impl Target {
  /// Construct a target, rejecting invalid names, duplicate architectures
  /// and pairs outside the compatibility matrix.
  ///
  /// An empty architecture list is accepted and means nothing is buildable
  /// for this platform.
  pub fn new(
    library_name: impl Into<String>,
    platform: Platform,
    architectures: Vec<Architecture>,
    layout: InstallLayout,
  ) -> Result<Self, TargetError> {
    let library_name = library_name.into();
    validate_library_name(&library_name)?;

    let mut seen = BTreeSet::new();
    for &architecture in &architectures {
      matrix::ensure_compatible(platform, architecture)?;
      if !seen.insert(architecture) {
        return Err(TargetError::DuplicateArchitecture(architecture));
      }
    }

    Ok(Self {
      library_name,
      platform,
      architectures,
      layout,
    })
  }

  /// One target per platform for `library`, keeping only the requested
  /// architectures the platform supports.
  pub fn for_library(library: Library, platforms: &[Platform], architectures: &[Architecture]) -> Vec<Target> {
    Self::filtered(library.name(), &InstallLayout::of(library), platforms, architectures)
  }

  // Filtering drops incompatible and repeated architectures, so the result
  // needs no further validation.
  fn filtered(
    library_name: &str,
    layout: &InstallLayout,
    platforms: &[Platform],
    architectures: &[Architecture],
  ) -> Vec<Target> {
    platforms
      .iter()
      .map(|&platform| {
        let mut archs: Vec<Architecture> = Vec::new();
        for &a in architectures {
          if matrix::is_compatible(platform, a) && !archs.contains(&a) {
            archs.push(a);
          }
        }
        Target {
          library_name: library_name.to_string(),
          platform,
          architectures: archs,
          layout: layout.clone(),
        }
      })
      .collect()
  }

  pub fn library_name(&self) -> &str {
    &self.library_name
  }

  pub fn platform(&self) -> Platform {
    self.platform
  }

  pub fn architectures(&self) -> &[Architecture] {
    &self.architectures
  }

  pub fn layout(&self) -> &InstallLayout {
    &self.layout
  }

  pub fn output_names(&self) -> &[String] {
    &self.layout.output_names
  }

  /// False when filtering left no architecture for this platform.
  pub fn is_buildable(&self) -> bool {
    !self.architectures.is_empty()
  }

  pub fn is_single_architecture(&self) -> bool {
    self.architectures.len() == 1
  }

  /// Set equality on architectures, ignoring order.
  pub fn same_architectures(&self, other: &Target) -> bool {
    self.architecture_set() == other.architecture_set()
  }

  /// Skips validation so callers' defensive checks can be exercised.
  #[cfg(test)]
  pub(crate) fn force_architectures_for_test(&mut self, architectures: Vec<Architecture>) {
    self.architectures = architectures;
  }

  fn architecture_set(&self) -> BTreeSet<Architecture> {
    self.architectures.iter().copied().collect()
  }

  /// One single-architecture clone per architecture, in stored order.
  pub fn split_into_single_architecture(&self) -> Vec<Target> {
    self
      .architectures
      .iter()
      .filter(|&&a| matrix::is_compatible(self.platform, a))
      .map(|&a| Target {
        library_name: self.library_name.clone(),
        platform: self.platform,
        architectures: vec![a],
        layout: self.layout.clone(),
      })
      .collect()
  }

  /// Copy of this target under another library name.
  pub fn renamed(&self, to: impl Into<String>) -> Result<Target, TargetError> {
    let library_name = to.into();
    validate_library_name(&library_name)?;
    Ok(Target {
      library_name,
      ..self.clone()
    })
  }

  /// The target `library` would have for this platform and architecture set,
  /// e.g. the dependency install a build links against.
  pub fn sibling(&self, library: Library) -> Target {
    Target {
      library_name: library.name().to_string(),
      platform: self.platform,
      architectures: self.architectures.clone(),
      layout: InstallLayout::of(library),
    }
  }

  /// Filesystem-friendly encoding of platform and the sorted architecture set,
  /// e.g. `macOS-arm64-x86_64`.
  pub fn canonical_name(&self) -> String {
    std::iter::once(self.platform.as_str())
      .chain(self.architecture_set().into_iter().map(|a| a.as_str()))
      .collect::<Vec<_>>()
      .join("-")
  }

  /// Directory holding everything for this library (source and all targets).
  pub fn library_directory(&self, work_root: &Path) -> PathBuf {
    work_root.join(&self.library_name)
  }

  pub fn paths(&self, work_root: &Path) -> TargetPaths {
    let base = self.library_directory(work_root);
    let working = base.join(self.canonical_name());
    TargetPaths {
      source: base.join(SOURCE_DIR),
      build: working.join(BUILD_DIR),
      install: working.join(INSTALL_DIR),
      log: working.join(LOG_FILE),
      working,
    }
  }

  pub fn binaries_directory(&self, work_root: &Path) -> PathBuf {
    self.paths(work_root).install.join(&self.layout.binaries_relative_path)
  }

  pub fn headers_directory(&self, work_root: &Path) -> PathBuf {
    self.paths(work_root).install.join(&self.layout.headers_relative_path)
  }

  /// Installed archive for one logical output name.
  pub fn archive_path(&self, work_root: &Path, output_name: &str) -> PathBuf {
    self.binaries_directory(work_root).join(format!("{output_name}.a"))
  }

  /// Installed archives for all outputs, in output order.
  pub fn archive_paths(&self, work_root: &Path) -> Vec<PathBuf> {
    self
      .layout
      .output_names
      .iter()
      .map(|name| self.archive_path(work_root, name))
      .collect()
  }
}

impl fmt::Display for Target {
  /// `<library>/<canonical name>`, e.g. `openssl/macOS-arm64`.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.library_name, self.canonical_name())
  }
}

fn validate_library_name(name: &str) -> Result<(), TargetError> {
  let valid = !name.is_empty()
    && !name.starts_with('.')
    && name
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
  if valid {
    Ok(())
  } else {
    Err(TargetError::InvalidLibraryName(name.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn openssl(platform: Platform, archs: Vec<Architecture>) -> Target {
    Target::new("openssl", platform, archs, InstallLayout::of(Library::OpenSsl)).unwrap()
  }

  #[test]
  fn for_library_never_produces_incompatible_pairs() {
    let targets = Target::for_library(Library::LibGit2, &Platform::ALL, &Architecture::ALL);
    assert_eq!(targets.len(), 3);
    for target in &targets {
      for &arch in target.architectures() {
        assert!(matrix::is_compatible(target.platform(), arch));
      }
    }
    assert_eq!(targets[0].architectures(), &[Architecture::Arm64]);
  }

  #[test]
  fn direct_construction_rejects_every_invalid_pair() {
    for platform in Platform::ALL {
      for arch in Architecture::ALL {
        let result = Target::new("openssl", platform, vec![arch], InstallLayout::of(Library::OpenSsl));
        if matrix::is_compatible(platform, arch) {
          assert!(result.is_ok());
        } else {
          assert_eq!(
            result.unwrap_err(),
            TargetError::IncompatiblePlatformArchitecture {
              platform,
              architecture: arch
            }
          );
        }
      }
    }
  }

  #[test]
  fn platform_without_compatible_architectures_yields_empty_target() {
    let targets = Target::for_library(Library::OpenSsl, &[Platform::IPhoneOs], &[Architecture::X86_64]);
    assert_eq!(targets.len(), 1);
    assert!(!targets[0].is_buildable());
  }

  #[test]
  fn paths_do_not_depend_on_architecture_order() {
    let root = Path::new("/work");
    let a = openssl(Platform::MacOs, vec![Architecture::Arm64, Architecture::X86_64]);
    let b = openssl(Platform::MacOs, vec![Architecture::X86_64, Architecture::Arm64]);

    assert_eq!(a.paths(root), b.paths(root));
    assert_eq!(a.canonical_name(), "macOS-arm64-x86_64");
    assert!(a.same_architectures(&b));
  }

  #[test]
  fn derived_layout() {
    let root = Path::new("/path/to/work");
    let t = openssl(Platform::MacOs, vec![Architecture::Arm64]);
    let paths = t.paths(root);

    assert_eq!(paths.source, PathBuf::from("/path/to/work/openssl/src"));
    assert_eq!(paths.build, PathBuf::from("/path/to/work/openssl/macOS-arm64/build"));
    assert_eq!(paths.install, PathBuf::from("/path/to/work/openssl/macOS-arm64/install"));
    assert_eq!(paths.log, PathBuf::from("/path/to/work/openssl/macOS-arm64/build.log"));
    assert_eq!(
      t.archive_paths(root),
      vec![
        PathBuf::from("/path/to/work/openssl/macOS-arm64/install/lib/libssl.a"),
        PathBuf::from("/path/to/work/openssl/macOS-arm64/install/lib/libcrypto.a"),
      ]
    );
    assert_eq!(
      t.headers_directory(root),
      PathBuf::from("/path/to/work/openssl/macOS-arm64/install/include/openssl")
    );
  }

  #[test]
  fn split_keeps_order_and_layout() {
    let t = openssl(Platform::IPhoneSimulator, vec![Architecture::X86_64, Architecture::Arm64]);
    let split = t.split_into_single_architecture();

    assert_eq!(split.len(), 2);
    assert_eq!(split[0].architectures(), &[Architecture::X86_64]);
    assert_eq!(split[1].architectures(), &[Architecture::Arm64]);
    assert!(split.iter().all(|s| s.layout() == t.layout() && s.platform() == t.platform()));
  }

  #[test]
  fn rename_changes_only_the_name() {
    let t = openssl(Platform::MacOs, vec![Architecture::Arm64]);
    let renamed = t.renamed("crypto").unwrap();

    assert_eq!(renamed.library_name(), "crypto");
    assert_eq!(renamed.platform(), t.platform());
    assert_eq!(renamed.architectures(), t.architectures());
    assert_eq!(renamed.output_names(), t.output_names());
  }

  #[test]
  fn sibling_shares_platform_and_architectures() {
    let git = Target::new(
      "libgit2",
      Platform::IPhoneSimulator,
      vec![Architecture::X86_64],
      InstallLayout::of(Library::LibGit2),
    )
    .unwrap();
    let ssl = git.sibling(Library::OpenSsl);

    assert_eq!(ssl.to_string(), "openssl/iPhoneSimulator-x86_64");
    assert_eq!(ssl.output_names(), ["libssl", "libcrypto"]);
    assert!(ssl.same_architectures(&git));
  }

  #[test]
  fn rejects_bad_names_and_duplicates() {
    let layout = InstallLayout::new("x", "lib", "include");
    assert_eq!(
      Target::new("", Platform::MacOs, vec![], layout.clone()).unwrap_err(),
      TargetError::InvalidLibraryName(String::new())
    );
    assert!(Target::new("../etc", Platform::MacOs, vec![], layout.clone()).is_err());
    assert_eq!(
      Target::new(
        "x",
        Platform::MacOs,
        vec![Architecture::Arm64, Architecture::Arm64],
        layout
      )
      .unwrap_err(),
      TargetError::DuplicateArchitecture(Architecture::Arm64)
    );
  }

  #[test]
  fn default_output_name_is_library_name() {
    let layout = InstallLayout::new("libfoo", "lib", "include");
    assert_eq!(layout.output_names, vec!["libfoo"]);
  }
}
