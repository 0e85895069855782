//! libgit2: CMake, with SSH support through libssh2 and HTTPS through OpenSSL.

use super::libssh2::dependency;
use super::{BuildStep, Dependencies, DriverError, LibraryDriver, cmake};
use crate::context::BuildContext;
use crate::library::Library;
use crate::target::Target;

#[derive(Debug, Default, Clone, Copy)]
pub struct LibGit2Driver;

impl LibraryDriver for LibGit2Driver {
  fn library(&self) -> Library {
    Library::LibGit2
  }

  fn configure(&self, ctx: &BuildContext, target: &Target, deps: &Dependencies) -> Result<BuildStep, DriverError> {
    let openssl = dependency(target, deps, Library::OpenSsl)?;
    let libssh2 = dependency(target, deps, Library::LibSsh2)?;
    let root = &ctx.work_root;

    let mut extra: Vec<String> = [
      "-DCMAKE_C_COMPILER_WORKS:BOOL=ON",
      "-DPKG_CONFIG_USE_CMAKE_PREFIX_PATH:BOOL=ON",
      "-DUSE_SSH=ON",
    ]
    .map(String::from)
    .to_vec();
    extra.push(cmake::define_path(
      "LIBSSH2_LIBRARY",
      &libssh2.archive_path(root, Library::LibSsh2.name()),
    ));
    extra.push(cmake::define_path("LIBSSH2_INCLUDE_DIR", &libssh2.headers_directory(root)));
    extra.extend(["-DLIBSSH2_LDFLAGS=-lssh2", "-DHAVE_LIBSSH2_MEMORY_CREDENTIALS=ON"].map(String::from));
    extra.extend(cmake::openssl_definitions(ctx, openssl));
    extra.extend(
      [
        "-DBUILD_TESTS=OFF",
        "-DBUILD_CLI=OFF",
        "-DBUILD_EXAMPLES=OFF",
        "-DBUILD_FUZZERS=OFF",
      ]
      .map(String::from),
    );

    cmake::configure(ctx, target, extra)
  }

  fn build_steps(&self, ctx: &BuildContext, target: &Target) -> Result<Vec<BuildStep>, DriverError> {
    cmake::build_steps(ctx, target)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::driver::build_single;
  use crate::platform::{Architecture, Platform};
  use crate::target::InstallLayout;
  use crate::util::testutil::{RecordingRunner, test_services};
  use tempfile::TempDir;

  fn single(library: Library, platform: Platform, arch: Architecture) -> Target {
    Target::new(library.name(), platform, vec![arch], InstallLayout::of(library)).unwrap()
  }

  #[test]
  fn configure_carries_absolute_dependency_paths() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let runner = RecordingRunner::new();
    let ctx = BuildContext::new(test_services(&runner), root).with_parallelism(2);
    let target = single(Library::LibGit2, Platform::IPhoneSimulator, Architecture::Arm64);
    let deps = Dependencies::from([
      (
        Library::OpenSsl,
        single(Library::OpenSsl, Platform::IPhoneSimulator, Architecture::Arm64),
      ),
      (
        Library::LibSsh2,
        single(Library::LibSsh2, Platform::IPhoneSimulator, Architecture::Arm64),
      ),
    ]);

    build_single(&LibGit2Driver, &ctx, &target, &deps).unwrap();

    let configure = runner
      .calls()
      .into_iter()
      .find(|(inv, _)| inv.name == "cmake configure")
      .map(|(inv, _)| inv)
      .unwrap();
    let dep_dir = |lib: &str| root.join(lib).join("iPhoneSimulator-arm64/install");
    let expected = [
      format!("-DLIBSSH2_LIBRARY={}", dep_dir("libssh2").join("lib/libssh2.a").display()),
      format!("-DLIBSSH2_INCLUDE_DIR={}", dep_dir("libssh2").join("include").display()),
      format!("-DOPENSSL_ROOT_DIR={}", dep_dir("openssl").display()),
      format!("-DOPENSSL_INCLUDE_DIR={}", dep_dir("openssl").join("include").display()),
      format!("-DOPENSSL_SSL_LIBRARY={}", dep_dir("openssl").join("lib/libssl.a").display()),
      format!("-DOPENSSL_CRYPTO_LIBRARY={}", dep_dir("openssl").join("lib/libcrypto.a").display()),
    ];
    for arg in &expected {
      assert!(configure.args.contains(arg), "missing {arg}");
    }
    assert!(
      configure
        .args
        .iter()
        .filter(|a| a.contains("_LIBRARY=") || a.contains("_DIR="))
        .all(|a| a.split_once('=').is_some_and(|(_, path)| std::path::Path::new(path).is_absolute()))
    );
    for flag in ["-DUSE_SSH=ON", "-DBUILD_TESTS=OFF", "-DBUILD_CLI=OFF", "-DBUILD_FUZZERS=OFF"] {
      assert!(configure.args.iter().any(|a| a == flag));
    }

    assert_eq!(
      runner.commands_for("cmake")[1..],
      [
        format!("/path/to/tools/cmake --build {} --parallel 2", root.join("libgit2/iPhoneSimulator-arm64/build").display()),
        format!("/path/to/tools/cmake --install {}", root.join("libgit2/iPhoneSimulator-arm64/build").display()),
      ]
    );
  }

  #[test]
  fn mismatched_dependency_fails_loudly() {
    let temp = TempDir::new().unwrap();
    let runner = RecordingRunner::new();
    let ctx = BuildContext::new(test_services(&runner), temp.path());
    let target = single(Library::LibGit2, Platform::MacOs, Architecture::Arm64);
    let deps = Dependencies::from([
      (Library::OpenSsl, single(Library::OpenSsl, Platform::MacOs, Architecture::Arm64)),
      (Library::LibSsh2, single(Library::LibSsh2, Platform::MacOs, Architecture::X86_64)),
    ]);

    let err = build_single(&LibGit2Driver, &ctx, &target, &deps).unwrap_err();

    assert!(matches!(
      err,
      DriverError::DependencyMismatch {
        dependency: Library::LibSsh2,
        ..
      }
    ));
    assert!(err.to_string().contains("libssh2 was built for macOS-x86_64"));
    assert!(runner.commands().is_empty());
  }
}
