//! Types for plan execution.

use std::path::PathBuf;

use thiserror::Error;

use crate::install::DumpError;
use crate::plan::dag::CycleError;
use crate::types::PackageIdentifier;

/// Errors that can occur while executing a plan.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// A build command exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {cmd}{}", stderr_suffix(.stderr))]
  CmdFailed {
    cmd: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  CycleDetected(#[from] CycleError),

  #[error("failed to register package: {0}")]
  Registration(#[from] DumpError),

  #[error("cannot build package search path: {0}")]
  PackagePath(#[from] std::env::JoinPathsError),

  /// A build task stopped without a result, e.g. by panicking.
  #[error("build task aborted: {0}")]
  Aborted(String),

  /// An immutable package's sources are not where the plan says.
  #[error("sources for {ident} not found at {}", path.display())]
  MissingSource { ident: PackageIdentifier, path: PathBuf },

  /// Some tasks failed; their dependents were skipped.
  #[error("{} package(s) failed to build: {}; {} skipped", .failed.len(), join(.failed), .skipped.len())]
  TasksFailed {
    failed: Vec<PackageIdentifier>,
    skipped: Vec<PackageIdentifier>,
  },
}

fn stderr_suffix(stderr: &str) -> String {
  if stderr.is_empty() {
    String::new()
  } else {
    format!("\n{}", stderr)
  }
}

fn join(idents: &[PackageIdentifier]) -> String {
  idents.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}

/// What happened to every task of a plan.
#[derive(Debug, Default)]
pub struct ExecuteSummary {
  pub built: Vec<PackageIdentifier>,
  pub failed: Vec<(PackageIdentifier, ExecuteError)>,
  /// Skipped task and the failed dependency that caused it.
  pub skipped: Vec<(PackageIdentifier, PackageIdentifier)>,
}

impl ExecuteSummary {
  pub fn is_success(&self) -> bool {
    self.failed.is_empty() && self.skipped.is_empty()
  }

  pub fn total(&self) -> usize {
    self.built.len() + self.failed.len() + self.skipped.len()
  }

  /// Collapse into an error if anything did not build.
  pub fn into_result(self) -> Result<Vec<PackageIdentifier>, ExecuteError> {
    if self.is_success() {
      return Ok(self.built);
    }
    Err(ExecuteError::TasksFailed {
      failed: self.failed.into_iter().map(|(ident, _)| ident).collect(),
      skipped: self.skipped.into_iter().map(|(ident, _)| ident).collect(),
    })
  }
}

/// Number of tasks to run at once for a `--jobs` value. Zero picks the CPU count.
pub fn parallelism(jobs: usize) -> usize {
  if jobs > 0 {
    return jobs;
  }
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}
