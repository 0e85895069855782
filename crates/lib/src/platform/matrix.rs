//! Platform/architecture compatibility matrix.
//!
//! Every question of the form "may this architecture be built for this
//! platform, and what does each toolchain call it" is answered here and only
//! here. Drivers, the target model and the bundle assembler all look up this
//! table instead of matching on platforms themselves.

use std::collections::BTreeSet;

use crate::target::TargetError;

use super::{Architecture, Platform};

/// Returns true if `architecture` can be built for `platform`.
pub fn is_compatible(platform: Platform, architecture: Architecture) -> bool {
  match platform {
    Platform::IPhoneOs => architecture == Architecture::Arm64,
    Platform::IPhoneSimulator | Platform::MacOs => true,
  }
}

/// Fails with `IncompatiblePlatformArchitecture` if the pair is not in the matrix.
pub fn ensure_compatible(platform: Platform, architecture: Architecture) -> Result<(), TargetError> {
  if is_compatible(platform, architecture) {
    Ok(())
  } else {
    Err(TargetError::IncompatiblePlatformArchitecture { platform, architecture })
  }
}

/// All architectures that can be built for `platform`, in canonical order.
pub fn compatible_architectures(platform: Platform) -> Vec<Architecture> {
  Architecture::ALL
    .into_iter()
    .filter(|a| is_compatible(platform, *a))
    .collect()
}

/// Every valid `(platform, architecture)` pair.
pub fn all_compatible_pairs() -> Vec<(Platform, Architecture)> {
  Platform::ALL
    .into_iter()
    .flat_map(|p| compatible_architectures(p).into_iter().map(move |a| (p, a)))
    .collect()
}

/// SDK identifier passed to `xcodebuild -sdk` / `xcrun --sdk`.
pub fn sdk_name(platform: Platform) -> &'static str {
  match platform {
    Platform::IPhoneOs => "iphoneos",
    Platform::IPhoneSimulator => "iphonesimulator",
    Platform::MacOs => "macosx",
  }
}

/// Value for `CMAKE_SYSTEM_NAME`.
pub fn cmake_system_name(platform: Platform) -> &'static str {
  match platform {
    Platform::IPhoneOs | Platform::IPhoneSimulator => "iOS",
    Platform::MacOs => "Darwin",
  }
}

/// Value for `CMAKE_OSX_ARCHITECTURES` (semicolon separated).
pub fn cmake_architectures(architectures: &[Architecture]) -> String {
  architectures.iter().map(|a| a.as_str()).collect::<Vec<_>>().join(";")
}

/// Target name understood by OpenSSL's `Configure` script.
pub fn openssl_target(platform: Platform, architecture: Architecture) -> Result<&'static str, TargetError> {
  ensure_compatible(platform, architecture)?;
  let name = match (platform, architecture) {
    (Platform::IPhoneOs, _) => "ios64-xcrun",
    (Platform::IPhoneSimulator, Architecture::Arm64) => "iossimulator-arm64-xcrun",
    (Platform::IPhoneSimulator, Architecture::X86_64) => "iossimulator-x86_64-xcrun",
    (Platform::MacOs, Architecture::Arm64) => "darwin64-arm64",
    (Platform::MacOs, Architecture::X86_64) => "darwin64-x86_64",
  };
  Ok(name)
}

/// Name `xcodebuild -create-xcframework` gives the slice directory holding
/// this platform's library, e.g. `ios-arm64_x86_64-simulator`.
pub fn bundle_slice_identifier(platform: Platform, architectures: &[Architecture]) -> String {
  let os = match platform {
    Platform::IPhoneOs | Platform::IPhoneSimulator => "ios",
    Platform::MacOs => "macos",
  };
  let archs = architectures
    .iter()
    .collect::<BTreeSet<_>>()
    .into_iter()
    .map(|a| a.as_str())
    .collect::<Vec<_>>()
    .join("_");
  let variant = match platform {
    Platform::IPhoneSimulator => Some("simulator"),
    Platform::IPhoneOs | Platform::MacOs => None,
  };

  [Some(os), Some(archs.as_str()).filter(|s| !s.is_empty()), variant]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join("-")
}
