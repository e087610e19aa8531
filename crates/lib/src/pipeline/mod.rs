//! The build pipeline.
//!
//! [`build`] runs a fixed sequence of stages and stops at the first failure:
//!
//! 1. Work out which installed artifacts are acceptable (profiling, haddock, symbols)
//! 2. Hand every file of the build to the caller's watcher
//! 3. Reject local packages with unbuildable components
//! 4. Probe what is already installed
//! 5. Resolve database tiers and install roots
//! 6. Construct the plan
//! 7. Reject local installs of packages outside the project, unless allowed
//! 8. Release the snapshot lock early if nothing will touch the snapshot
//! 9. Check the toolchain supports `allow-newer`
//! 10. Warn about experimental options
//! 11. Warn about executable name collisions
//! 12. Prefetch dependency sources, if asked
//! 13. Print the plan (dry run) or execute it

pub mod lock;
mod types;

pub use types::*;

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::collision::detect_collisions;
use crate::consts::MIN_ALLOW_NEWER_TOOLCHAIN;
use crate::context::{BuildContext, BuildOptions};
use crate::package::LocalPackage;
use crate::plan::print::render_plan;
use crate::plan::{Plan, SourceMap, TaskLocation};
use crate::snapshot_lock::ReleaseLock;
use crate::tiers::BaseConfig;
use crate::types::{PackageName, Version};

use lock::maybe_release_early;

/// Run one build.
///
/// `lock` is the snapshot lock the caller acquired, if any. The pipeline may
/// release it early; the caller stays responsible for releasing it on every
/// other path. `on_files` is called exactly once with every file the build
/// depends on.
pub fn build(
  ctx: &BuildContext,
  options: &BuildOptions,
  collaborators: &Collaborators<'_>,
  locals: &[LocalPackage],
  source_map: &SourceMap,
  lock: Option<&mut dyn ReleaseLock>,
  on_files: impl FnOnce(BTreeSet<PathBuf>),
) -> Result<BuildOutcome, BuildError> {
  info!(locals = locals.len(), targets = source_map.targets.len(), "starting build");

  let installed_options = InstalledOptions::from_options(options);

  on_files(gather_files(ctx, locals));

  check_buildable(locals)?;

  let install_map = source_map.install_map();
  let probed = collaborators
    .prober
    .probe(installed_options, &install_map)
    .map_err(BuildError::Probe)?;
  debug!(
    installed = probed.installed.len(),
    global = probed.global_dumps.len(),
    snapshot = probed.snapshot_dumps.len(),
    local = probed.local_dumps.len(),
    "probed installed packages"
  );

  let base = BaseConfig::new(ctx, options);

  let plan = collaborators
    .planner
    .construct(
      &base,
      &probed.local_dumps,
      collaborators.loader,
      source_map,
      &probed.installed,
      options.only_dependencies,
    )
    .map_err(BuildError::Plan)?;
  debug!(tasks = plan.len(), "constructed build plan");

  if !ctx.allow_locals {
    check_local_installs(&plan, locals)?;
  }

  let decision = maybe_release_early(&plan, lock).map_err(BuildError::LockRelease)?;

  check_toolchain(options, &ctx.compiler.toolchain)?;

  if options.split_objs {
    warn!("Building with split-objs is an experimental feature.");
  }

  for (exe, collision) in detect_collisions(&plan, locals) {
    warn!(exe = %exe, "{}", collision.message(&exe));
  }

  if options.prefetch {
    collaborators.prefetcher.prefetch(&plan).map_err(BuildError::Prefetch)?;
  }

  if options.dry_run {
    let rendered = render_plan(&plan)?;
    return Ok(BuildOutcome::DryRun {
      rendered,
      lock: decision,
    });
  }

  let targets = source_map.target_idents();
  collaborators
    .executor
    .execute(ExecuteRequest {
      options,
      base: &base,
      locals,
      global_dumps: &probed.global_dumps,
      snapshot_dumps: &probed.snapshot_dumps,
      local_dumps: &probed.local_dumps,
      installed: &probed.installed,
      targets: &targets,
      plan: &plan,
    })
    .map_err(BuildError::Execute)?;

  info!(tasks = plan.len(), "build complete");
  Ok(BuildOutcome::Executed {
    tasks: plan.len(),
    lock: decision,
  })
}

/// Every file of every local package, plus the project file.
fn gather_files(ctx: &BuildContext, locals: &[LocalPackage]) -> BTreeSet<PathBuf> {
  locals
    .iter()
    .flat_map(|lp| lp.files.iter().cloned())
    .chain(std::iter::once(ctx.config_path.clone()))
    .collect()
}

fn check_buildable(locals: &[LocalPackage]) -> Result<(), BuildError> {
  let unbuildable: BTreeMap<PackageName, BTreeSet<_>> = locals
    .iter()
    .filter(|lp| !lp.unbuildable.is_empty())
    .map(|lp| (lp.name().clone(), lp.unbuildable.clone()))
    .collect();

  if unbuildable.is_empty() {
    Ok(())
  } else {
    Err(BuildError::UnbuildableComponents(UnbuildableComponents(unbuildable)))
  }
}

/// Local tasks must belong to the project.
fn check_local_installs(plan: &Plan, locals: &[LocalPackage]) -> Result<(), BuildError> {
  let project: BTreeSet<&PackageName> = locals.iter().map(LocalPackage::name).collect();

  let outside: Vec<_> = plan
    .tasks()
    .filter(|task| task.location == TaskLocation::Local && !project.contains(&task.ident.name))
    .map(|task| task.ident.clone())
    .collect();

  if outside.is_empty() {
    Ok(())
  } else {
    Err(BuildError::DisallowedLocalInstall(outside))
  }
}

fn check_toolchain(options: &BuildOptions, toolchain: &Version) -> Result<(), BuildError> {
  let required = Version::new(MIN_ALLOW_NEWER_TOOLCHAIN);
  if options.allow_newer && *toolchain < required {
    return Err(BuildError::IncompatibleToolchainConstraint {
      found: toolchain.clone(),
      required,
    });
  }
  Ok(())
}
