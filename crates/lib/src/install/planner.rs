//! Plan construction from a resolved source map.
//!
//! Starting at the targets, every package reachable through declared
//! dependencies becomes a task unless an up-to-date registration exists. A
//! package whose dependency gets rebuilt is rebuilt as well.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::{debug, trace};

use crate::install::DumpPackage;
use crate::package::LocalPackage;
use crate::pipeline::{BoxError, PackageLoader, PlanConstructor};
use crate::plan::{InstalledMap, Plan, SourceMap, Task, TaskLocation, TaskType};
use crate::tiers::BaseConfig;
use crate::types::{PackageIdentifier, PackageName, Version};

#[derive(Debug, Error)]
pub enum PlanError {
  #[error("package '{package}' depends on '{dependency}', which is neither in the project nor a known dependency")]
  UnknownDependency {
    package: PackageName,
    dependency: PackageName,
  },

  #[error("target '{0}' is neither in the project nor a known dependency")]
  UnknownTarget(PackageName),

  #[error("dependency cycle through package '{0}'")]
  Cycle(PackageName),

  #[error("failed to load package '{package}': {source}")]
  Load {
    package: PackageName,
    #[source]
    source: BoxError,
  },
}

/// The bundled [`PlanConstructor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolvedPlanner;

impl PlanConstructor for ResolvedPlanner {
  fn construct(
    &self,
    _base: &BaseConfig,
    local_dumps: &[DumpPackage],
    loader: &dyn PackageLoader,
    source_map: &SourceMap,
    installed: &InstalledMap,
    initial_steps_only: bool,
  ) -> Result<Plan, BoxError> {
    let mut walker = Walker {
      source_map,
      installed,
      local_dumps,
      loader,
      visits: BTreeMap::new(),
      plan: Plan::new(),
    };

    for target in &source_map.targets {
      if !source_map.project.contains_key(target) && !source_map.deps.contains_key(target) {
        return Err(PlanError::UnknownTarget(target.clone()).into());
      }
      walker.visit(target, None)?;
    }

    let mut plan = walker.plan;
    if initial_steps_only {
      plan.tasks.retain(|ident, _| !source_map.targets.contains(&ident.name));
    }

    debug!(tasks = plan.len(), initial_steps_only, "constructed plan");
    Ok(plan)
  }
}

#[derive(Debug, Clone)]
enum Visit {
  InProgress,
  /// Finished; `Some` when the package has a task in the plan.
  Done(Option<PackageIdentifier>),
}

struct Walker<'a> {
  source_map: &'a SourceMap,
  installed: &'a InstalledMap,
  local_dumps: &'a [DumpPackage],
  loader: &'a dyn PackageLoader,
  visits: BTreeMap<PackageName, Visit>,
  plan: Plan,
}

impl Walker<'_> {
  /// Visit `name`, returning its identifier if it ends up in the plan.
  fn visit(&mut self, name: &PackageName, dependent: Option<&PackageName>) -> Result<Option<PackageIdentifier>, PlanError> {
    match self.visits.get(name) {
      Some(Visit::InProgress) => return Err(PlanError::Cycle(name.clone())),
      Some(Visit::Done(ident)) => return Ok(ident.clone()),
      None => {}
    }
    self.visits.insert(name.clone(), Visit::InProgress);

    let task = if let Some(lp) = self.source_map.project.get(name) {
      self.local_task(lp)?
    } else if let Some(dep) = self.source_map.deps.get(name) {
      if self.is_installed(name, dep.location, &dep.version) {
        trace!(package = %name, "dependency already installed");
        None
      } else {
        let package = self
          .loader
          .load(&dep.source, &dep.flags, &self.source_map.compiler_flags)
          .map_err(|source| PlanError::Load {
            package: name.clone(),
            source,
          })?;
        let deps = self.visit_all(name, &package.depends)?;
        Some(Task {
          ident: package.ident.clone(),
          task_type: TaskType::Immutable {
            package,
            location: dep.source.clone(),
          },
          location: dep.location,
          deps,
        })
      }
    } else if self.installed.contains_key(name) {
      None
    } else {
      return Err(PlanError::UnknownDependency {
        package: dependent.cloned().unwrap_or_else(|| name.clone()),
        dependency: name.clone(),
      });
    };

    let ident = task.map(|task| {
      let ident = task.ident.clone();
      self.plan.insert(task);
      ident
    });
    self.visits.insert(name.clone(), Visit::Done(ident.clone()));
    Ok(ident)
  }

  fn visit_all(
    &mut self,
    package: &PackageName,
    depends: &BTreeSet<PackageName>,
  ) -> Result<BTreeSet<PackageIdentifier>, PlanError> {
    let mut deps = BTreeSet::new();
    for dep in depends {
      if let Some(ident) = self.visit(dep, Some(package))? {
        deps.insert(ident);
      }
    }
    Ok(deps)
  }

  fn local_task(&mut self, lp: &LocalPackage) -> Result<Option<Task>, PlanError> {
    let deps = self.visit_all(lp.name(), &lp.package.depends)?;

    if deps.is_empty() && self.is_up_to_date(lp) {
      trace!(package = %lp.ident(), "local package unchanged");
      return Ok(None);
    }

    Ok(Some(Task {
      ident: lp.ident().clone(),
      task_type: TaskType::FilePath {
        package: lp.package.clone(),
        dir: lp.dir.clone(),
        source_hash: lp.source_hash.clone(),
      },
      location: TaskLocation::Local,
      deps,
    }))
  }

  fn is_installed(&self, name: &PackageName, location: TaskLocation, version: &Version) -> bool {
    self
      .installed
      .get(name)
      .is_some_and(|(found, found_version)| *found == location && found_version == version)
  }

  /// Registered locally from exactly these sources.
  fn is_up_to_date(&self, lp: &LocalPackage) -> bool {
    self.is_installed(lp.name(), TaskLocation::Local, &lp.ident().version)
      && self
        .local_dumps
        .iter()
        .any(|dump| dump.ident() == *lp.ident() && dump.source_hash.as_deref() == Some(lp.source_hash.as_str()))
  }
}
