pub mod arch;
pub mod matrix;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use arch::Architecture;

/// Apple platforms a library can be packaged for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Platform {
  #[serde(rename = "iPhoneOS")]
  IPhoneOs,
  #[serde(rename = "iPhoneSimulator")]
  IPhoneSimulator,
  #[serde(rename = "macOS")]
  MacOs,
}

impl Platform {
  pub const ALL: [Platform; 3] = [Platform::IPhoneOs, Platform::IPhoneSimulator, Platform::MacOs];

  /// Returns the identifier used in directory names and on the command line
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::IPhoneOs => "iPhoneOS",
      Self::IPhoneSimulator => "iPhoneSimulator",
      Self::MacOs => "macOS",
    }
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Platform {
  type Err = UnknownNameError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|p| p.as_str().eq_ignore_ascii_case(s))
      .ok_or_else(|| UnknownNameError::new("platform", s, Self::ALL.iter().map(|p| p.as_str())))
  }
}

/// A name given on the command line (or in code) that is not part of a closed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{name}' (expected one of: {expected})")]
pub struct UnknownNameError {
  pub kind: &'static str,
  pub name: String,
  pub expected: String,
}

impl UnknownNameError {
  pub(crate) fn new<'a>(kind: &'static str, name: &str, expected: impl Iterator<Item = &'a str>) -> Self {
    Self {
      kind,
      name: name.to_string(),
      expected: expected.collect::<Vec<_>>().join(", "),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn platform_names_round_trip_case_insensitively() {
    assert_eq!("iphoneos".parse::<Platform>().unwrap(), Platform::IPhoneOs);
    assert_eq!("macOS".parse::<Platform>().unwrap(), Platform::MacOs);
    assert_eq!(Platform::IPhoneSimulator.to_string(), "iPhoneSimulator");
  }

  #[test]
  fn unknown_platform_lists_choices() {
    let err = "watchOS".parse::<Platform>().unwrap_err();
    assert_eq!(err.kind, "platform");
    assert!(err.to_string().contains("iPhoneOS, iPhoneSimulator, macOS"));
  }
}
