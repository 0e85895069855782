use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::UnknownNameError;

/// CPU architecture variants a library can be compiled for.
///
/// The declaration order is the canonical sort order used when encoding a
/// set of architectures into a directory name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Architecture {
  #[serde(rename = "arm64")]
  Arm64,
  #[serde(rename = "x86_64")]
  X86_64,
}

impl Architecture {
  pub const ALL: [Architecture; 2] = [Architecture::Arm64, Architecture::X86_64];

  /// Returns the identifier used in directory names and on the command line
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Arm64 => "arm64",
      Self::X86_64 => "x86_64",
    }
  }
}

impl fmt::Display for Architecture {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Architecture {
  type Err = UnknownNameError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "arm64" | "aarch64" => Ok(Self::Arm64),
      "x86_64" | "x86-64" => Ok(Self::X86_64),
      _ => Err(UnknownNameError::new("architecture", s, Self::ALL.iter().map(|a| a.as_str()))),
    }
  }
}
