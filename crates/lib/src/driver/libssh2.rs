//! libssh2: CMake, with OpenSSL as the crypto backend.

use super::{BuildStep, Dependencies, DriverError, LibraryDriver, cmake};
use crate::context::BuildContext;
use crate::library::Library;
use crate::target::Target;

#[derive(Debug, Default, Clone, Copy)]
pub struct LibSsh2Driver;

impl LibraryDriver for LibSsh2Driver {
  fn library(&self) -> Library {
    Library::LibSsh2
  }

  fn configure(&self, ctx: &BuildContext, target: &Target, deps: &Dependencies) -> Result<BuildStep, DriverError> {
    let openssl = dependency(target, deps, Library::OpenSsl)?;

    let mut extra = vec!["-DCRYPTO_BACKEND=OpenSSL".to_string()];
    extra.extend(cmake::openssl_definitions(ctx, openssl));
    extra.extend(
      [
        "-DCMAKE_C_FLAGS=-DOPENSSL_NO_ENGINE -Wno-shorten-64-to-32",
        "-DENABLE_ZLIB_COMPRESSION=ON",
        "-DBUILD_EXAMPLES=OFF",
        "-DBUILD_TESTING=OFF",
      ]
      .map(String::from),
    );

    cmake::configure(ctx, target, extra)
  }

  fn build_steps(&self, ctx: &BuildContext, target: &Target) -> Result<Vec<BuildStep>, DriverError> {
    cmake::build_steps(ctx, target)
  }
}

/// Look up a dependency that `validate` already checked.
pub(super) fn dependency<'a>(target: &Target, deps: &'a Dependencies, library: Library) -> Result<&'a Target, DriverError> {
  deps.get(&library).ok_or_else(|| DriverError::MissingDependency {
    target: target.to_string(),
    dependency: library,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::driver::build_single;
  use crate::platform::{Architecture, Platform};
  use crate::target::InstallLayout;
  use crate::util::testutil::{RecordingRunner, test_services};
  use tempfile::TempDir;

  #[test]
  fn configure_links_against_openssl_install() {
    let runner = RecordingRunner::new();
    let ctx = BuildContext::new(test_services(&runner), "/work");
    let target = Target::new(
      "libssh2",
      Platform::MacOs,
      vec![Architecture::Arm64],
      InstallLayout::of(Library::LibSsh2),
    )
    .unwrap();
    let openssl = Target::new(
      "openssl",
      Platform::MacOs,
      vec![Architecture::Arm64],
      InstallLayout::of(Library::OpenSsl),
    )
    .unwrap();
    let deps = Dependencies::from([(Library::OpenSsl, openssl)]);

    let args = LibSsh2Driver.configure(&ctx, &target, &deps).unwrap().invocation.args;

    for expected in [
      "-DCRYPTO_BACKEND=OpenSSL",
      "-DOPENSSL_ROOT_DIR=/work/openssl/macOS-arm64/install",
      "-DOPENSSL_INCLUDE_DIR=/work/openssl/macOS-arm64/install/include",
      "-DOPENSSL_SSL_LIBRARY=/work/openssl/macOS-arm64/install/lib/libssl.a",
      "-DOPENSSL_CRYPTO_LIBRARY=/work/openssl/macOS-arm64/install/lib/libcrypto.a",
      "-DENABLE_ZLIB_COMPRESSION=ON",
      "-DBUILD_SHARED_LIBS:BOOL=OFF",
      "-DBUILD_TESTING=OFF",
    ] {
      assert!(args.iter().any(|a| a == expected), "missing {expected} in {args:?}");
    }
  }

  #[test]
  fn full_build_without_openssl_fails_before_prepare() {
    let temp = TempDir::new().unwrap();
    let runner = RecordingRunner::new();
    let ctx = BuildContext::new(test_services(&runner), temp.path());
    let target = Target::new(
      "libssh2",
      Platform::IPhoneOs,
      vec![Architecture::Arm64],
      InstallLayout::of(Library::LibSsh2),
    )
    .unwrap();

    let err = build_single(&LibSsh2Driver, &ctx, &target, &Dependencies::new()).unwrap_err();

    assert!(matches!(err, DriverError::MissingDependency { .. }));
    assert!(runner.commands().is_empty());
    assert!(!temp.path().join("libssh2").exists());
  }
}
