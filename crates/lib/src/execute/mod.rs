//! Plan execution.
//!
//! Tasks run wave by wave: every task of a wave has all its plan
//! dependencies in earlier waves, and tasks inside a wave run in parallel up
//! to the `--jobs` limit. A failed task makes every dependent task skip.
//!
//! Executing a task runs the package's build command in its source directory
//! and then registers the package in the database of the task's tier.

pub mod cmd;
mod prefetch;
pub mod types;

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{debug, error, info, warn};

use crate::consts::{BIN_DIR_ENV, DIST_DIR_ENV, INSTALL_ROOT_ENV, PACKAGE_PATH_ENV};
use crate::install::DumpPackage;
use crate::install::dump::write_registration;
use crate::pipeline::{BoxError, ExecuteRequest, Executor};
use crate::plan::dag::PlanDag;
use crate::plan::{Task, TaskType};
use crate::types::PackageIdentifier;

pub use prefetch::SourcePrefetcher;
pub use types::{ExecuteError, ExecuteSummary, parallelism};

/// Everything one spawned task needs, owned.
#[derive(Debug, Clone)]
struct TaskJob {
  ident: PackageIdentifier,
  command: Option<String>,
  source_dir: PathBuf,
  db: PathBuf,
  env: BTreeMap<String, OsString>,
  registration: DumpPackage,
}

impl TaskJob {
  fn new(task: &Task, request: &ExecuteRequest<'_>, package_path: &OsString) -> Self {
    let base = request.base;
    let install_root = base.roots.for_location(task.location).to_path_buf();
    let dist_dir = base.dist_dir.join(task.ident.to_string());

    let env = BTreeMap::from([
      (PACKAGE_PATH_ENV.to_string(), package_path.clone()),
      (INSTALL_ROOT_ENV.to_string(), install_root.into_os_string()),
      (BIN_DIR_ENV.to_string(), base.roots.bin_dir(task.location).into_os_string()),
      (DIST_DIR_ENV.to_string(), dist_dir.into_os_string()),
    ]);

    let source_hash = match &task.task_type {
      TaskType::FilePath { source_hash, .. } => Some(source_hash.clone()),
      TaskType::Immutable { .. } => None,
    };

    Self {
      ident: task.ident.clone(),
      command: task.package().build.clone(),
      source_dir: task.task_type.source_dir().to_path_buf(),
      db: base.tiers.for_location(task.location).to_path_buf(),
      env,
      registration: DumpPackage {
        name: task.ident.name.clone(),
        version: task.ident.version.clone(),
        profiling: request.options.wants_profiling(),
        haddock: request.options.haddock,
        symbols: request.options.wants_symbols(),
        source_hash,
      },
    }
  }

  async fn run(self) -> Result<(), ExecuteError> {
    for dir in self.env.iter().filter(|(k, _)| *k != PACKAGE_PATH_ENV).map(|(_, v)| v) {
      tokio::fs::create_dir_all(dir).await?;
    }

    match &self.command {
      Some(command) => {
        cmd::run_build(command, &self.source_dir, &self.env).await?;
      }
      None => debug!(package = %self.ident, "no build command; registering only"),
    }

    write_registration(&self.db, &self.registration)?;
    Ok(())
  }
}

/// Execute every task of the request's plan.
pub async fn execute_plan(request: ExecuteRequest<'_>) -> Result<ExecuteSummary, ExecuteError> {
  let plan = request.plan;
  info!(
    tasks = plan.len(),
    targets = request.targets.len(),
    "starting plan execution"
  );

  let dag = PlanDag::from_plan(plan);
  let waves = dag.waves()?;
  info!(wave_count = waves.len(), "computed execution waves");

  let package_path = request.base.tiers.package_path()?;
  let summary = run_waves(&dag, &waves, parallelism(request.options.jobs), |ident| {
    TaskJob::new(&plan.tasks[ident], &request, &package_path).run()
  })
  .await;

  info!(
    built = summary.built.len(),
    failed = summary.failed.len(),
    skipped = summary.skipped.len(),
    "plan execution complete"
  );

  Ok(summary)
}

/// Run `waves` in order, starting each task with `start` unless one of its
/// dependencies failed.
async fn run_waves<F, Fut>(dag: &PlanDag, waves: &[Vec<PackageIdentifier>], jobs: usize, mut start: F) -> ExecuteSummary
where
  F: FnMut(&PackageIdentifier) -> Fut,
  Fut: Future<Output = Result<(), ExecuteError>> + Send + 'static,
{
  let semaphore = Arc::new(Semaphore::new(jobs));
  let mut summary = ExecuteSummary::default();
  let mut failed: HashMap<PackageIdentifier, PackageIdentifier> = HashMap::new();

  for (wave_idx, wave) in waves.iter().enumerate() {
    debug!(wave = wave_idx, tasks = wave.len(), "executing wave");

    let mut ready = Vec::new();
    for ident in wave {
      let failed_dep = dag
        .dependencies(ident)
        .into_iter()
        .find_map(|dep| failed.get(&dep).cloned());

      if let Some(root_cause) = failed_dep {
        warn!(package = %ident, failed_dep = %root_cause, "skipping package due to failed dependency");
        failed.insert(ident.clone(), root_cause.clone());
        summary.skipped.push((ident.clone(), root_cause));
      } else {
        ready.push((ident.clone(), start(ident)));
      }
    }

    for (ident, result) in execute_wave(ready, semaphore.clone()).await {
      match result {
        Ok(()) => {
          info!(package = %ident, "package built");
          summary.built.push(ident);
        }
        Err(e) => {
          error!(package = %ident, error = %e, "package failed to build");
          failed.insert(ident.clone(), ident.clone());
          summary.failed.push((ident, e));
        }
      }
    }
  }

  summary
}

/// Run one wave's jobs in parallel, bounded by `semaphore`. Every job yields
/// exactly one result; a job that panics becomes [`ExecuteError::Aborted`].
async fn execute_wave<Fut>(
  jobs: Vec<(PackageIdentifier, Fut)>,
  semaphore: Arc<Semaphore>,
) -> Vec<(PackageIdentifier, Result<(), ExecuteError>)>
where
  Fut: Future<Output = Result<(), ExecuteError>> + Send + 'static,
{
  let mut join_set = JoinSet::new();
  let mut idents: HashMap<task::Id, PackageIdentifier> = HashMap::new();

  for (ident, job) in jobs {
    let semaphore = semaphore.clone();
    let handle = join_set.spawn(async move {
      match semaphore.acquire_owned().await {
        Ok(_permit) => job.await,
        Err(_) => Err(ExecuteError::Io(std::io::Error::other("task semaphore closed"))),
      }
    });
    idents.insert(handle.id(), ident);
  }

  let mut results = Vec::new();
  while let Some(joined) = join_set.join_next_with_id().await {
    let (id, result) = match joined {
      Ok((id, result)) => (id, result),
      Err(e) => {
        error!(error = %e, "build task panicked");
        (e.id(), Err(ExecuteError::Aborted(e.to_string())))
      }
    };
    if let Some(ident) = idents.remove(&id) {
      results.push((ident, result));
    }
  }

  results.sort_by(|a, b| a.0.cmp(&b.0));
  results
}

/// The bundled [`Executor`]: runs the plan on a private tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaveExecutor;

impl Executor for WaveExecutor {
  fn execute(&self, request: ExecuteRequest<'_>) -> Result<(), BoxError> {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let summary = runtime.block_on(execute_plan(request))?;
    summary.into_result()?;
    Ok(())
  }
}
