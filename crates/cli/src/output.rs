//! Terminal output for the `haul` commands.
//!
//! Results go to stdout so they can be piped; failures go to stderr. Colors
//! are applied only when the target stream supports them.

use std::time::Duration;

use anyhow::Context;
use owo_colors::{OwoColorize, Stream};

/// Kind of a one-line status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  /// A command finished its work.
  Done,
  /// Nothing failed, but there is something worth noting.
  Note,
  /// The command failed.
  Failed,
}

impl Status {
  pub fn symbol(self) -> &'static str {
    match self {
      Status::Done => "✓",
      Status::Note => "•",
      Status::Failed => "✗",
    }
  }

  pub fn stream(self) -> Stream {
    match self {
      Status::Failed => Stream::Stderr,
      Status::Done | Status::Note => Stream::Stdout,
    }
  }

  /// The line as printed, colored for `stream()` when supported.
  pub fn line(self, message: &str) -> String {
    let stream = self.stream();
    let symbol = self.symbol();
    match self {
      Status::Done => format!("{} {}", symbol.if_supports_color(stream, |s| s.green()), message),
      Status::Note => format!("{} {}", symbol.if_supports_color(stream, |s| s.blue()), message),
      Status::Failed => format!(
        "{} {}",
        symbol.if_supports_color(stream, |s| s.red()),
        message.if_supports_color(stream, |s| s.red())
      ),
    }
  }

  pub fn print(self, message: &str) {
    let line = self.line(message);
    match self.stream() {
      Stream::Stderr => eprintln!("{}", line),
      _ => println!("{}", line),
    }
  }
}

pub fn print_success(message: &str) {
  Status::Done.print(message);
}

pub fn print_info(message: &str) {
  Status::Note.print(message);
}

pub fn print_error(message: &str) {
  Status::Failed.print(message);
}

/// An indented `label: value` line under a status line.
pub fn print_stat(label: &str, value: &str) {
  println!("  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

/// Summary printed after `haul build` executed a plan.
pub fn build_summary(tasks: usize, elapsed: Duration) -> String {
  match tasks {
    0 => "Nothing to build; everything is up to date.".to_string(),
    n => format!("Built {} package(s) in {}", n, format_duration(elapsed)),
  }
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  match secs {
    60.. => format!("{}m {}s", secs / 60, secs % 60),
    1.. => format!("{}.{:02}s", secs, duration.subsec_millis() / 10),
    0 => format!("{}ms", duration.subsec_millis()),
  }
}
