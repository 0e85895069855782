//! CLI output formatting utilities.
//!
//! Provides consistent formatting for terminal output: colored status
//! messages, human-readable durations, and Unicode symbols.

use std::time::Duration;

use anyhow::Context;
use owo_colors::{OwoColorize, Stream};

use buildgit2_lib::execute::{StepKind, StepReport, StepStatus};

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
  pub const SKIPPED: &str = "-";
}

/// Elapsed time rounded to whole seconds, e.g. `2m 5s`.
pub fn format_duration(duration: Duration) -> String {
  if duration < Duration::from_secs(1) {
    return format!("{}ms", duration.as_millis());
  }
  humantime::format_duration(Duration::from_secs(duration.as_secs())).to_string()
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

fn kind_label(kind: StepKind) -> &'static str {
  match kind {
    StepKind::Fetch => "fetch",
    StepKind::Build => "build",
    StepKind::Merge => "merge",
  }
}

/// One line per step: symbol, kind, target and the failure or skip reason.
pub fn step_line(step: &StepReport) -> String {
  let label = format!("{:<5} {}", kind_label(step.kind), step.target);
  match &step.status {
    StepStatus::Done => format!("{} {label}", symbols::SUCCESS),
    StepStatus::Failed { error } => match &step.log {
      Some(log) => format!("{} {label}: {error} ({} {})", symbols::ERROR, symbols::ARROW, log.display()),
      None => format!("{} {label}: {error}", symbols::ERROR),
    },
    StepStatus::Skipped { reason } => format!("{} {label} (skipped: {reason})", symbols::SKIPPED),
  }
}

pub fn print_step(step: &StepReport) {
  let line = step_line(step);
  match step.status {
    StepStatus::Done => println!("  {}", line.if_supports_color(Stream::Stdout, |s| s.green())),
    StepStatus::Failed { .. } => println!("  {}", line.if_supports_color(Stream::Stdout, |s| s.red())),
    StepStatus::Skipped { .. } => println!("  {}", line.if_supports_color(Stream::Stdout, |s| s.dimmed())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use buildgit2_lib::library::Library;
  use std::path::PathBuf;

  #[test]
  fn test_format_duration() {
    assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
    assert_eq!(format_duration(Duration::from_millis(1500)), "1s");
    assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
  }

  #[test]
  fn failed_step_points_at_its_log() {
    let step = StepReport {
      library: Library::OpenSsl,
      kind: StepKind::Build,
      target: "openssl/macOS-arm64".to_string(),
      status: StepStatus::Failed {
        error: "configure failed".to_string(),
      },
      log: Some(PathBuf::from("/work/openssl/macOS-arm64/build.log")),
    };

    assert_eq!(
      step_line(&step),
      "✗ build openssl/macOS-arm64: configure failed (→ /work/openssl/macOS-arm64/build.log)"
    );
  }

  #[test]
  fn skipped_step_shows_reason() {
    let step = StepReport {
      library: Library::LibGit2,
      kind: StepKind::Merge,
      target: "libgit2/macOS-arm64-x86_64".to_string(),
      status: StepStatus::Skipped {
        reason: "cancelled".to_string(),
      },
      log: None,
    };

    assert_eq!(step_line(&step), "- merge libgit2/macOS-arm64-x86_64 (skipped: cancelled)");
  }
}
