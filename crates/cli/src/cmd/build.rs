//! Implementation of the `haul build` command.
//!
//! Loads the project, takes the snapshot lock and runs the build pipeline
//! with the bundled collaborators.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use haul_lib::context::BuildOptions;
use haul_lib::execute::{SourcePrefetcher, WaveExecutor};
use haul_lib::install::{DbProber, ResolvedPlanner};
use haul_lib::pipeline::{BuildOutcome, Collaborators, build};
use haul_lib::project::ManifestLoader;
use haul_lib::snapshot_lock::SnapshotLock;
use haul_lib::tiers::{DatabaseTierSet, InstallRoots};
use haul_lib::types::PackageName;

use super::load_context;
use crate::output::{build_summary, print_info, print_success};

#[derive(Debug, Args)]
pub struct BuildArgs {
  /// Packages to build (default: every project package)
  targets: Vec<String>,

  /// Print the plan without building anything
  #[arg(long)]
  dry_run: bool,

  /// Check dependency sources are present before building
  #[arg(long)]
  prefetch: bool,

  /// Build with profiling enabled
  #[arg(long)]
  profile: bool,

  /// Generate documentation
  #[arg(long)]
  haddock: bool,

  /// Keep debugging symbols in installed executables
  #[arg(long)]
  no_strip: bool,

  /// Split object files (experimental)
  #[arg(long)]
  split_objs: bool,

  /// Ignore upper version bounds of dependencies
  #[arg(long)]
  allow_newer: bool,

  /// Only build what the targets depend on
  #[arg(long)]
  only_dependencies: bool,

  /// Number of packages to build at once (0: one per CPU)
  #[arg(short, long, default_value_t = 0)]
  jobs: usize,

  /// Extra compiler option passed to every package (repeatable)
  #[arg(long = "compiler-option", value_name = "OPTION", allow_hyphen_values = true)]
  compiler_options: Vec<String>,
}

impl BuildArgs {
  fn options(&self) -> BuildOptions {
    BuildOptions {
      targets: self.targets.iter().map(PackageName::new).collect(),
      dry_run: self.dry_run,
      prefetch: self.prefetch,
      library_profiling: self.profile,
      executable_profiling: self.profile,
      haddock: self.haddock,
      keep_symbols: self.no_strip,
      split_objs: self.split_objs,
      allow_newer: self.allow_newer,
      only_dependencies: self.only_dependencies,
      jobs: self.jobs,
      compiler_flags: self.compiler_options.clone(),
    }
  }
}

pub fn cmd_build(project: Option<&Path>, args: &BuildArgs) -> Result<()> {
  let started = Instant::now();
  let options = args.options();

  let (project, ctx) = load_context(project)?;
  let source_map = project.source_map(&options.targets, &options.compiler_flags)?;

  let roots = InstallRoots::resolve(&ctx);
  let mut lock = SnapshotLock::acquire(&roots.snapshot, "haul build").context("Failed to lock snapshot")?;

  let prober = DbProber::new(DatabaseTierSet::resolve(&ctx));
  let collaborators = Collaborators {
    prober: &prober,
    planner: &ResolvedPlanner,
    loader: &ManifestLoader,
    executor: &WaveExecutor,
    prefetcher: &SourcePrefetcher,
  };

  let outcome = build(
    &ctx,
    &options,
    &collaborators,
    &project.locals,
    &source_map,
    Some(&mut lock),
    |files| debug!(files = files.len(), "build inputs gathered"),
  )?;

  match outcome {
    BuildOutcome::DryRun { rendered, .. } => print!("{}", rendered),
    BuildOutcome::Executed { tasks: 0, .. } => print_info(&build_summary(0, started.elapsed())),
    BuildOutcome::Executed { tasks, .. } => print_success(&build_summary(tasks, started.elapsed())),
  }

  Ok(())
}
