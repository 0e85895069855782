//! Queries against the installed Apple toolchain.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::context::Services;
use crate::platform::{Platform, matrix};
use crate::process::{Invocation, OutputPolicy, ProcessError};
use crate::tools::{Tool, ToolError};

#[derive(Debug, Error)]
pub enum ToolchainError {
  #[error(transparent)]
  Tool(#[from] ToolError),

  #[error("failed to query SDK '{sdk}': {source}")]
  Query {
    sdk: &'static str,
    #[source]
    source: ProcessError,
  },

  #[error("xcodebuild output for SDK '{sdk}' has no {field} line")]
  MissingField { sdk: &'static str, field: &'static str },
}

/// Installed SDK for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SdkInfo {
  pub version: String,
  pub path: PathBuf,
}

/// Ask `xcodebuild -version -sdk <sdk>` where the platform's SDK lives.
pub fn sdk_info(services: &Services, platform: Platform) -> Result<SdkInfo, ToolchainError> {
  let sdk = matrix::sdk_name(platform);
  let xcodebuild = services.tools.locate(Tool::Xcodebuild)?;
  let query = Invocation::new(xcodebuild).args(["-version", "-sdk", sdk]);

  let output = services
    .runner
    .run(&query, &OutputPolicy::CaptureStdout)
    .map_err(|source| ToolchainError::Query { sdk, source })?;

  parse_sdk_info(sdk, &output.stdout)
}

fn parse_sdk_info(sdk: &'static str, stdout: &str) -> Result<SdkInfo, ToolchainError> {
  // `Name: value`; the value may contain spaces.
  let field = |name: &'static str| {
    stdout
      .lines()
      .filter_map(|line| line.split_once(": "))
      .find(|(key, _)| key.trim() == name)
      .map(|(_, value)| value.trim())
      .filter(|value| !value.is_empty())
      .ok_or(ToolchainError::MissingField { sdk, field: name })
  };

  Ok(SdkInfo {
    version: field("SDKVersion")?.to_string(),
    path: PathBuf::from(field("Path")?),
  })
}
