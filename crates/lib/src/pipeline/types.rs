//! Collaborator contracts and result types for the build pipeline.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;

use thiserror::Error;

use crate::context::BuildOptions;
use crate::install::DumpPackage;
use crate::package::{LocalPackage, Package};
use crate::plan::dag::CycleError;
use crate::plan::{InstallMap, InstalledMap, PackageLocation, Plan, SourceMap};
use crate::tiers::BaseConfig;
use crate::types::{ComponentName, PackageIdentifier, PackageName, Version};

use super::lock::LockDecision;

/// Error type collaborators report through. Opaque to the pipeline.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// What kind of installed artifacts satisfy this build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstalledOptions {
  pub want_profiling: bool,
  pub want_haddock: bool,
  pub want_symbols: bool,
}

impl InstalledOptions {
  pub fn from_options(options: &BuildOptions) -> Self {
    Self {
      want_profiling: options.wants_profiling(),
      want_haddock: options.haddock,
      want_symbols: options.wants_symbols(),
    }
  }
}

/// Installed packages, classified by the tier they were found in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Probed {
  pub installed: InstalledMap,
  pub global_dumps: Vec<DumpPackage>,
  pub snapshot_dumps: Vec<DumpPackage>,
  pub local_dumps: Vec<DumpPackage>,
}

/// Loads the description of a package from its source location.
///
/// Must return the same package for the same arguments within one run.
pub trait PackageLoader {
  fn load(
    &self,
    location: &PackageLocation,
    flags: &BTreeMap<String, bool>,
    compiler_flags: &[String],
  ) -> Result<Package, BoxError>;
}

/// Turns the source map and what is installed into a [`Plan`].
pub trait PlanConstructor {
  /// With `initial_steps_only`, the plan covers only what the targets
  /// depend on, not the targets themselves.
  fn construct(
    &self,
    base: &BaseConfig,
    local_dumps: &[DumpPackage],
    loader: &dyn PackageLoader,
    source_map: &SourceMap,
    installed: &InstalledMap,
    initial_steps_only: bool,
  ) -> Result<Plan, BoxError>;
}

/// Finds out what is already installed across the database tiers.
pub trait InstalledProber {
  fn probe(&self, options: InstalledOptions, install_map: &InstallMap) -> Result<Probed, BoxError>;
}

/// Everything an executor needs to carry out a plan.
#[derive(Debug, Clone, Copy)]
pub struct ExecuteRequest<'a> {
  pub options: &'a BuildOptions,
  pub base: &'a BaseConfig,
  pub locals: &'a [LocalPackage],
  pub global_dumps: &'a [DumpPackage],
  pub snapshot_dumps: &'a [DumpPackage],
  pub local_dumps: &'a [DumpPackage],
  pub installed: &'a InstalledMap,
  pub targets: &'a BTreeSet<PackageIdentifier>,
  pub plan: &'a Plan,
}

/// Carries out a plan. May run for a long time.
pub trait Executor {
  fn execute(&self, request: ExecuteRequest<'_>) -> Result<(), BoxError>;
}

/// Makes the sources of a plan's dependencies available ahead of execution.
pub trait Prefetcher {
  fn prefetch(&self, plan: &Plan) -> Result<(), BoxError>;
}

/// The collaborators one pipeline run talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
  pub prober: &'a dyn InstalledProber,
  pub planner: &'a dyn PlanConstructor,
  pub loader: &'a dyn PackageLoader,
  pub executor: &'a dyn Executor,
  pub prefetcher: &'a dyn Prefetcher,
}

/// How a pipeline run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
  /// Nothing was executed; `rendered` describes what would have been.
  DryRun { rendered: String, lock: LockDecision },
  /// The plan was handed to the executor and completed.
  Executed { tasks: usize, lock: LockDecision },
}

impl BuildOutcome {
  pub fn lock_decision(&self) -> LockDecision {
    match self {
      BuildOutcome::DryRun { lock, .. } | BuildOutcome::Executed { lock, .. } => *lock,
    }
  }
}

/// Components a package declares but cannot build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnbuildableComponents(pub BTreeMap<PackageName, BTreeSet<ComponentName>>);

impl fmt::Display for UnbuildableComponents {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(
      f,
      "The following components have 'buildable: false' set in their package manifest, and so cannot be targets:"
    )?;
    for (package, components) in &self.0 {
      let components: Vec<String> = components.iter().map(|c| c.to_string()).collect();
      writeln!(f, "    {}: {}", package, components.join(", "))?;
    }
    write!(
      f,
      "To resolve this, either provide flags such that these components are buildable, or only specify buildable targets."
    )
  }
}

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("{0}")]
  UnbuildableComponents(UnbuildableComponents),

  #[error(
    "the following packages are not part of the project and would be installed into its local tree: {}\n\
     Add them to the project or set 'allow-locals: true'.",
    join_idents(.0)
  )]
  DisallowedLocalInstall(Vec<PackageIdentifier>),

  #[error("allow-newer requires toolchain {required} or later, but {found} is in use")]
  IncompatibleToolchainConstraint { found: Version, required: Version },

  #[error("failed to probe installed packages: {0}")]
  Probe(#[source] BoxError),

  #[error("failed to construct build plan: {0}")]
  Plan(#[source] BoxError),

  #[error("failed to prefetch dependencies: {0}")]
  Prefetch(#[source] BoxError),

  #[error("build failed: {0}")]
  Execute(#[source] BoxError),

  #[error("failed to release snapshot lock: {0}")]
  LockRelease(#[source] io::Error),

  #[error("failed to render build plan: {0}")]
  Render(#[from] CycleError),
}

fn join_idents(idents: &[PackageIdentifier]) -> String {
  idents.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}
