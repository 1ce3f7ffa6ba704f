//! CLI output formatting utilities.
//!
//! Colored status lines, trace rendering, and human-readable durations and
//! timestamps.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use owo_colors::{OwoColorize, Stream};

use kiln_lib::Trace;

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
  pub const STALE: &str = "~";
}

/// Round to whole milliseconds before formatting.
pub fn format_duration(duration: Duration) -> String {
  let millis = Duration::from_millis(duration.as_millis() as u64);
  if millis.is_zero() {
    return "0ms".to_string();
  }
  humantime::format_duration(millis).to_string()
}

/// Format a stamp in nanoseconds since the epoch; negative stamps are "never".
pub fn format_stamp(stamp: i64) -> String {
  if stamp < 0 {
    return "never".to_string();
  }
  let time: SystemTime = UNIX_EPOCH + Duration::from_nanos(stamp as u64);
  humantime::format_rfc3339_seconds(time).to_string()
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

/// One line per group: `→ [1] c, d`.
pub fn print_trace(trace: &Trace) {
  for (index, group) in trace.groups().iter().enumerate() {
    println!(
      "{} [{}] {}",
      symbols::ARROW.if_supports_color(Stream::Stdout, |s| s.cyan()),
      index + 1,
      group.join(", ")
    );
  }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
