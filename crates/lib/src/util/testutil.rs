//! Test utilities for buildgit2-lib.
//!
//! Provides a recording process runner that stands in for the native tools,
//! a fixed tool locator, and cross-platform shell helpers for the tests that
//! do spawn real processes.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::context::Services;
use crate::fs::LocalFs;
use crate::process::{Invocation, OutputPolicy, ProcessError, ProcessOutput, ProcessRunner};
use crate::tools::{Tool, ToolError, ToolLocator};

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}

/// Resolves every tool to `/path/to/tools/<name>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedTools;

impl ToolLocator for FixedTools {
  fn locate(&self, tool: Tool) -> Result<PathBuf, ToolError> {
    Ok(PathBuf::from("/path/to/tools").join(tool.name()))
  }
}

/// Short label for the policy a command ran under.
pub fn policy_name(policy: &OutputPolicy) -> &'static str {
  match policy {
    OutputPolicy::Merged(_) => "merged",
    OutputPolicy::Separate { .. } => "separate",
    OutputPolicy::Quiet => "quiet",
    OutputPolicy::CaptureStdout => "capture",
    OutputPolicy::Inherit => "inherit",
  }
}

type Hook = Box<dyn Fn(&Invocation) + Send + Sync>;

#[derive(Default)]
struct State {
  calls: Mutex<Vec<(Invocation, &'static str)>>,
  fail_patterns: Vec<String>,
  hooks: Vec<(String, Hook)>,
}

/// Records every invocation instead of running it.
///
/// Mimics the observable effects the build depends on: `git clone` creates
/// its destination, `lipo -output` and `xcodebuild -create-xcframework
/// -output` create their outputs, and `xcodebuild -version -sdk` answers
/// with a fixed SDK description.
#[derive(Clone, Default)]
pub struct RecordingRunner {
  state: Arc<State>,
}

impl RecordingRunner {
  pub fn new() -> Self {
    Self::default()
  }

  fn state_mut(&mut self) -> &mut State {
    Arc::get_mut(&mut self.state).expect("configure the runner before sharing it")
  }

  /// Fail any invocation whose command line contains `pattern`.
  pub fn fail_when(mut self, pattern: &str) -> Self {
    self.state_mut().fail_patterns.push(pattern.to_string());
    self
  }

  /// Run `hook` for any invocation whose command line contains `pattern`.
  pub fn on(mut self, pattern: &str, hook: impl Fn(&Invocation) + Send + Sync + 'static) -> Self {
    self.state_mut().hooks.push((pattern.to_string(), Box::new(hook)));
    self
  }

  /// Command lines in execution order.
  pub fn commands(&self) -> Vec<String> {
    self.calls().into_iter().map(|(inv, _)| inv.to_string()).collect()
  }

  pub fn calls(&self) -> Vec<(Invocation, &'static str)> {
    self.state.calls.lock().unwrap().clone()
  }

  /// Command lines whose program file name is `tool`.
  pub fn commands_for(&self, tool: &str) -> Vec<String> {
    self
      .calls()
      .into_iter()
      .filter(|(inv, _)| inv.program.file_name().is_some_and(|n| n == tool))
      .map(|(inv, _)| inv.to_string())
      .collect()
  }
}

fn arg_after<'a>(inv: &'a Invocation, flag: &str) -> Option<&'a str> {
  let pos = inv.args.iter().position(|a| a == flag)?;
  inv.args.get(pos + 1).map(String::as_str)
}

impl ProcessRunner for RecordingRunner {
  fn run(&self, invocation: &Invocation, policy: &OutputPolicy) -> Result<ProcessOutput, ProcessError> {
    let line = invocation.to_string();
    self
      .state
      .calls
      .lock()
      .unwrap()
      .push((invocation.clone(), policy_name(policy)));

    if self.state.fail_patterns.iter().any(|p| line.contains(p.as_str())) {
      return Err(ProcessError::Failed {
        program: invocation.name.clone(),
        code: Some(1),
        detail: "simulated failure".to_string(),
      });
    }

    for (pattern, hook) in &self.state.hooks {
      if line.contains(pattern.as_str()) {
        hook(invocation);
      }
    }

    let tool = invocation
      .program
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();
    let first = invocation.args.first().map(String::as_str);

    match (tool.as_str(), first) {
      ("git", Some("clone")) => {
        if let Some(dest) = invocation.args.last() {
          std::fs::create_dir_all(dest).unwrap();
        }
      }
      ("lipo", _) => {
        if let Some(out) = arg_after(invocation, "-output") {
          touch(Path::new(out));
        }
      }
      ("xcodebuild", Some("-create-xcframework")) => {
        if let Some(out) = arg_after(invocation, "-output") {
          std::fs::create_dir_all(out).unwrap();
        }
      }
      ("xcodebuild", Some("-version")) => {
        let sdk = arg_after(invocation, "-sdk").unwrap_or("unknown");
        return Ok(ProcessOutput {
          stdout: format!("SDKVersion: 18.0\nPath: /sdks/{sdk}.sdk\nPlatformVersion: 18.0"),
        });
      }
      _ => {}
    }

    Ok(ProcessOutput::default())
  }
}

/// Services backed by `runner`, [`FixedTools`] and the real filesystem.
pub fn test_services(runner: &RecordingRunner) -> Services {
  Services {
    runner: Arc::new(runner.clone()),
    tools: Arc::new(FixedTools),
    fs: Arc::new(LocalFs),
  }
}

/// Create an empty file and its parents.
pub fn touch(path: &Path) {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(path, b"").unwrap();
}
