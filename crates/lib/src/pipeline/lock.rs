//! Early release of the snapshot lock.
//!
//! The caller acquires the snapshot lock before the pipeline starts. Once a
//! plan exists we know whether this run will write to the snapshot install
//! tree at all. If every task is local it will not, and the lock is released
//! before execution so other invocations can use the snapshot while this one
//! keeps building.
//!
//! A plan with even one snapshot task keeps the lock for the whole run, even
//! after its snapshot tasks are finished.

use std::io;

use tracing::debug;

use crate::plan::{Plan, TaskLocation};
use crate::snapshot_lock::ReleaseLock;

/// Whether the snapshot lock may be dropped before execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockDecision {
  ReleaseEarly,
  Retain,
}

/// Release early iff every task is local. An empty plan is all-local.
pub fn release_decision(plan: &Plan) -> LockDecision {
  if plan.tasks().all(|task| task.location == TaskLocation::Local) {
    LockDecision::ReleaseEarly
  } else {
    LockDecision::Retain
  }
}

/// Apply [`release_decision`] to `lock`, if the caller holds one.
pub fn maybe_release_early(plan: &Plan, lock: Option<&mut dyn ReleaseLock>) -> io::Result<LockDecision> {
  let decision = release_decision(plan);

  if decision == LockDecision::ReleaseEarly
    && let Some(lock) = lock
  {
    debug!("All installs are local; releasing snapshot lock early.");
    lock.release()?;
  }

  Ok(decision)
}
