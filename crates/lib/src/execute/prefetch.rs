//! Prefetching dependency sources.
//!
//! Dependencies are pinned to source directories, so fetching reduces to
//! checking every immutable task's sources are present before anything runs.

use tracing::{debug, info};

use crate::consts::PACKAGE_MANIFEST;
use crate::pipeline::{BoxError, Prefetcher};
use crate::plan::{Plan, TaskType};

use super::types::ExecuteError;

/// The bundled [`Prefetcher`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SourcePrefetcher;

impl SourcePrefetcher {
  pub fn check(&self, plan: &Plan) -> Result<usize, ExecuteError> {
    let mut checked = 0;
    for task in plan.tasks() {
      let TaskType::Immutable { location, .. } = &task.task_type else {
        continue;
      };

      if !location.path().join(PACKAGE_MANIFEST).is_file() {
        return Err(ExecuteError::MissingSource {
          ident: task.ident.clone(),
          path: location.path().to_path_buf(),
        });
      }
      debug!(package = %task.ident, path = %location.path().display(), "sources present");
      checked += 1;
    }

    info!(checked, "prefetched dependency sources");
    Ok(checked)
  }
}

impl Prefetcher for SourcePrefetcher {
  fn prefetch(&self, plan: &Plan) -> Result<(), BoxError> {
    self.check(plan)?;
    Ok(())
  }
}
