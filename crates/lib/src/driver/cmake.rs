//! Shared CMake invocation shape for the CMake-based libraries.

use std::path::Path;

use super::{BuildStep, DriverError};
use crate::context::BuildContext;
use crate::platform::matrix;
use crate::process::Invocation;
use crate::target::Target;
use crate::tools::Tool;
use crate::toolchain;

fn define(name: &str, value: impl std::fmt::Display) -> String {
  format!("-D{name}={value}")
}

/// Render a `-D` definition whose value is a path.
pub(crate) fn define_path(name: &str, path: &Path) -> String {
  define(name, path.display())
}

/// `cmake -S <src> <toolchain and install definitions> <extra> -B <build>`.
pub(crate) fn configure(ctx: &BuildContext, target: &Target, extra: Vec<String>) -> Result<BuildStep, DriverError> {
  let paths = target.paths(&ctx.work_root);
  let cmake = ctx.services.tools.locate(Tool::Cmake)?;
  let sdk = toolchain::sdk_info(&ctx.services, target.platform())?;

  let mut args = vec!["-S".to_string(), paths.source.display().to_string()];
  args.extend([
    define_path("CMAKE_OSX_SYSROOT", &sdk.path),
    define("CMAKE_SYSTEM_NAME", matrix::cmake_system_name(target.platform())),
    define(
      "CMAKE_OSX_ARCHITECTURES:STRING",
      matrix::cmake_architectures(target.architectures()),
    ),
    define("PKG_CONFIG_EXECUTABLE", "NO_EXEC"),
    define("BUILD_SHARED_LIBS:BOOL", "OFF"),
    define_path("CMAKE_INSTALL_PREFIX:PATH", &paths.install),
  ]);
  args.extend(extra);
  args.extend(["-B".to_string(), paths.build.display().to_string()]);

  let invocation = Invocation::new(cmake)
    .named("cmake configure")
    .args(args)
    .current_dir(&paths.build);
  Ok(BuildStep::new("configure", invocation))
}

/// `cmake --build` with the context's parallelism, then `cmake --install`.
pub(crate) fn build_steps(ctx: &BuildContext, target: &Target) -> Result<Vec<BuildStep>, DriverError> {
  let build_dir = target.paths(&ctx.work_root).build;
  let cmake = ctx.services.tools.locate(Tool::Cmake)?;
  let dir = build_dir.display().to_string();

  let build = Invocation::new(&cmake)
    .named("cmake build")
    .args(["--build".to_string(), dir.clone(), "--parallel".to_string(), ctx.parallelism.to_string()])
    .current_dir(&build_dir);
  let install = Invocation::new(&cmake)
    .named("cmake install")
    .args(["--install".to_string(), dir])
    .current_dir(&build_dir);

  Ok(vec![BuildStep::new("build", build), BuildStep::new("install", install)])
}

/// Definitions pointing CMake's OpenSSL lookup at an installed OpenSSL target.
pub(crate) fn openssl_definitions(ctx: &BuildContext, openssl: &Target) -> Vec<String> {
  let root = &ctx.work_root;
  let install = openssl.paths(root).install;
  vec![
    define_path("OPENSSL_ROOT_DIR", &install),
    define_path("OPENSSL_INCLUDE_DIR", &install.join("include")),
    define_path("OPENSSL_SSL_LIBRARY", &openssl.archive_path(root, "libssl")),
    define_path("OPENSSL_CRYPTO_LIBRARY", &openssl.archive_path(root, "libcrypto")),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::library::Library;
  use crate::platform::{Architecture, Platform};
  use crate::target::InstallLayout;
  use crate::util::testutil::{RecordingRunner, test_services};

  #[test]
  fn configure_frames_extra_definitions_between_source_and_build() {
    let runner = RecordingRunner::new();
    let ctx = BuildContext::new(test_services(&runner), "/w");
    let target = Target::new(
      "libssh2",
      Platform::IPhoneOs,
      vec![Architecture::Arm64],
      InstallLayout::of(Library::LibSsh2),
    )
    .unwrap();

    let step = configure(&ctx, &target, vec!["-DEXTRA=1".to_string()]).unwrap();
    let args = &step.invocation.args;

    assert_eq!(&args[..2], ["-S", "/w/libssh2/src"]);
    assert_eq!(&args[args.len() - 3..], ["-DEXTRA=1", "-B", "/w/libssh2/iPhoneOS-arm64/build"]);
    assert!(args.contains(&"-DCMAKE_OSX_SYSROOT=/sdks/iphoneos.sdk".to_string()));
    assert!(args.contains(&"-DCMAKE_SYSTEM_NAME=iOS".to_string()));
    assert!(args.contains(&"-DCMAKE_OSX_ARCHITECTURES:STRING=arm64".to_string()));
    assert!(args.contains(&"-DCMAKE_INSTALL_PREFIX:PATH=/w/libssh2/iPhoneOS-arm64/install".to_string()));
    // the SDK query is the only thing run while describing configure
    assert_eq!(runner.commands(), vec!["/path/to/tools/xcodebuild -version -sdk iphoneos"]);
  }

  #[test]
  fn build_and_install_share_the_build_directory() {
    let runner = RecordingRunner::new();
    let ctx = BuildContext::new(test_services(&runner), "/w").with_parallelism(4);
    let target = Target::new(
      "libgit2",
      Platform::MacOs,
      vec![Architecture::X86_64],
      InstallLayout::of(Library::LibGit2),
    )
    .unwrap();

    let steps = build_steps(&ctx, &target).unwrap();
    let lines: Vec<_> = steps.iter().map(|s| s.invocation.to_string()).collect();

    assert_eq!(
      lines,
      vec![
        "/path/to/tools/cmake --build /w/libgit2/macOS-x86_64/build --parallel 4",
        "/path/to/tools/cmake --install /w/libgit2/macOS-x86_64/build",
      ]
    );
  }
}
