//! External command execution.
//!
//! Every native tool (git, make, cmake, lipo, xcodebuild) is started through
//! a [`ProcessRunner`]. The runner blocks until the child exits and turns a
//! nonzero exit status into [`ProcessError::Failed`], so callers only ever
//! see success or an error carrying something a user can act on.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

/// An open, append-only log sink shared by every command of one build.
#[derive(Clone)]
pub struct LogHandle {
  path: PathBuf,
  file: Arc<File>,
}

impl LogHandle {
  /// Create (or truncate) the file at `path`.
  pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
    let path = path.into();
    let file = File::create(&path)?;
    Ok(Self {
      path,
      file: Arc::new(file),
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn stdio(&self) -> io::Result<Stdio> {
    Ok(Stdio::from(self.file.try_clone()?))
  }
}

impl fmt::Debug for LogHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("LogHandle").field(&self.path).finish()
  }
}

/// Where a child's stdout and stderr go.
#[derive(Debug, Clone)]
pub enum OutputPolicy {
  /// Both streams appended to one log.
  Merged(LogHandle),
  Separate { stdout: LogHandle, stderr: LogHandle },
  /// Stdout discarded; stderr kept for the error message.
  Quiet,
  /// Stdout returned to the caller; stderr kept for the error message.
  CaptureStdout,
  Inherit,
}

impl OutputPolicy {
  fn failure_detail(&self, stderr: &[u8]) -> String {
    match self {
      Self::Merged(log) | Self::Separate { stderr: log, .. } => {
        format!("see {} for details", log.path().display())
      }
      Self::Quiet | Self::CaptureStdout => {
        let text = String::from_utf8_lossy(stderr).trim().to_string();
        if text.is_empty() {
          "no error output".to_string()
        } else {
          text
        }
      }
      Self::Inherit => "see output above for details".to_string(),
    }
  }
}

/// One command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub program: PathBuf,
  pub args: Vec<String>,
  pub cwd: Option<PathBuf>,
  /// Short name used in progress events and errors.
  pub name: String,
}

impl Invocation {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    let program = program.into();
    let name = program
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| program.display().to_string());
    Self {
      program,
      args: Vec::new(),
      cwd: None,
      name,
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  /// Append a path argument.
  pub fn path_arg(self, path: &Path) -> Self {
    self.arg(path.display().to_string())
  }

  pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.cwd = Some(dir.into());
    self
  }

  pub fn named(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }
}

impl fmt::Display for Invocation {
  /// `program arg arg ...`, for logs and test assertions.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.program.display())?;
    for arg in &self.args {
      write!(f, " {arg}")?;
    }
    Ok(())
  }
}

/// What a successful command produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
  /// Trimmed stdout; empty unless the policy was `CaptureStdout`.
  pub stdout: String,
}

#[derive(Debug, Error)]
pub enum ProcessError {
  #[error("failed to start {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("{program} failed with exit code {code:?}: {detail}")]
  Failed {
    program: String,
    code: Option<i32>,
    detail: String,
  },
}

/// Runs external commands to completion.
pub trait ProcessRunner: Send + Sync {
  fn run(&self, invocation: &Invocation, policy: &OutputPolicy) -> Result<ProcessOutput, ProcessError>;
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
  fn run(&self, invocation: &Invocation, policy: &OutputPolicy) -> Result<ProcessOutput, ProcessError> {
    let name = &invocation.name;
    info!("running {name}");
    debug!(program = ?invocation.program, args = ?invocation.args, cwd = ?invocation.cwd, "spawning process");

    let spawn_error = |source| ProcessError::Spawn {
      program: name.clone(),
      source,
    };

    let mut command = Command::new(&invocation.program);
    command.args(&invocation.args).stdin(Stdio::null());
    if let Some(cwd) = &invocation.cwd {
      command.current_dir(cwd);
    }

    match policy {
      OutputPolicy::Merged(log) => {
        command
          .stdout(log.stdio().map_err(spawn_error)?)
          .stderr(log.stdio().map_err(spawn_error)?);
      }
      OutputPolicy::Separate { stdout, stderr } => {
        command
          .stdout(stdout.stdio().map_err(spawn_error)?)
          .stderr(stderr.stdio().map_err(spawn_error)?);
      }
      OutputPolicy::Quiet => {
        command.stdout(Stdio::null()).stderr(Stdio::piped());
      }
      OutputPolicy::CaptureStdout => {
        command.stdout(Stdio::piped()).stderr(Stdio::piped());
      }
      OutputPolicy::Inherit => {
        command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
      }
    }

    let output = command.output().map_err(spawn_error)?;

    if !output.status.success() {
      return Err(ProcessError::Failed {
        program: name.clone(),
        code: output.status.code(),
        detail: policy.failure_detail(&output.stderr),
      });
    }

    info!("{name} completed");

    let stdout = match policy {
      OutputPolicy::CaptureStdout => String::from_utf8_lossy(&output.stdout).trim().to_string(),
      _ => String::new(),
    };
    Ok(ProcessOutput { stdout })
  }
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;
  use crate::util::testutil::shell_cmd;
  use tempfile::TempDir;

  fn sh(script: &str) -> Invocation {
    let (shell, args) = shell_cmd(script);
    Invocation::new(shell).args(args)
  }

  #[test]
  fn captures_trimmed_stdout() {
    let out = SystemRunner
      .run(&sh("echo '  hello  '"), &OutputPolicy::CaptureStdout)
      .unwrap();
    assert_eq!(out.stdout, "hello");
  }

  #[test]
  fn quiet_discards_stdout() {
    let out = SystemRunner.run(&sh("echo hello"), &OutputPolicy::Quiet).unwrap();
    assert!(out.stdout.is_empty());
  }

  #[test]
  fn failure_carries_stderr_and_code() {
    let err = SystemRunner
      .run(&sh("echo boom >&2; exit 3").named("boom"), &OutputPolicy::Quiet)
      .unwrap_err();

    match err {
      ProcessError::Failed { program, code, detail } => {
        assert_eq!(program, "boom");
        assert_eq!(code, Some(3));
        assert_eq!(detail, "boom");
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn merged_output_lands_in_log() {
    let temp = TempDir::new().unwrap();
    let log = LogHandle::create(temp.path().join("build.log")).unwrap();
    let policy = OutputPolicy::Merged(log.clone());

    SystemRunner.run(&sh("echo first"), &policy).unwrap();
    SystemRunner.run(&sh("echo second >&2"), &policy).unwrap();
    let err = SystemRunner.run(&sh("exit 1"), &policy).unwrap_err();

    let contents = std::fs::read_to_string(log.path()).unwrap();
    assert_eq!(contents, "first\nsecond\n");
    assert!(err.to_string().contains("build.log for details"));
  }

  #[test]
  fn separate_output_splits_streams_and_points_at_stderr_log() {
    let temp = TempDir::new().unwrap();
    let stdout = LogHandle::create(temp.path().join("out.log")).unwrap();
    let stderr = LogHandle::create(temp.path().join("err.log")).unwrap();
    let policy = OutputPolicy::Separate {
      stdout: stdout.clone(),
      stderr: stderr.clone(),
    };

    let out = SystemRunner.run(&sh("echo out; echo err >&2"), &policy).unwrap();
    let err = SystemRunner.run(&sh("exit 4"), &policy).unwrap_err();

    assert!(out.stdout.is_empty());
    assert_eq!(std::fs::read_to_string(stdout.path()).unwrap(), "out\n");
    assert_eq!(std::fs::read_to_string(stderr.path()).unwrap(), "err\n");
    match err {
      ProcessError::Failed { code, detail, .. } => {
        assert_eq!(code, Some(4));
        assert_eq!(detail, format!("see {} for details", stderr.path().display()));
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn inherited_output_failure_refers_to_the_terminal() {
    let err = SystemRunner
      .run(&sh("exit 2").named("inherit"), &OutputPolicy::Inherit)
      .unwrap_err();

    match err {
      ProcessError::Failed { program, code, detail } => {
        assert_eq!(program, "inherit");
        assert_eq!(code, Some(2));
        assert_eq!(detail, "see output above for details");
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn working_directory_is_honoured() {
    let temp = TempDir::new().unwrap();
    let dir = dunce::canonicalize(temp.path()).unwrap();
    let out = SystemRunner
      .run(&sh("pwd -P").current_dir(&dir), &OutputPolicy::CaptureStdout)
      .unwrap();
    assert_eq!(out.stdout, dir.display().to_string());
  }

  #[test]
  fn missing_program_is_a_spawn_error() {
    let err = SystemRunner
      .run(&Invocation::new("/nonexistent/tool"), &OutputPolicy::Quiet)
      .unwrap_err();
    assert!(matches!(err, ProcessError::Spawn { ref program, .. } if program == "tool"));
  }

  #[test]
  fn display_joins_program_and_args() {
    let inv = Invocation::new("/usr/bin/lipo").args(["-create", "a.a"]);
    assert_eq!(inv.to_string(), "/usr/bin/lipo -create a.a");
    assert_eq!(inv.name, "lipo");
  }
}
