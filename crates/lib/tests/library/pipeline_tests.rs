use std::cell::Cell;
use std::collections::BTreeSet;
use std::path::PathBuf;

use haul_lib::context::BuildOptions;
use haul_lib::pipeline::lock::LockDecision;
use haul_lib::pipeline::{BuildError, BuildOutcome, build};
use haul_lib::plan::{Plan, TaskLocation};
use haul_lib::snapshot_lock::ReleaseLock;
use haul_lib::types::{ComponentName, ExeName, PackageName, Version};

use super::common::*;

fn run(
  spies: &Spies,
  options: &BuildOptions,
  locals: &[haul_lib::package::LocalPackage],
  lock: Option<&mut dyn ReleaseLock>,
) -> Result<BuildOutcome, BuildError> {
  let ctx = context();
  build(
    &ctx,
    options,
    &spies.collaborators(),
    locals,
    &source_map(locals),
    lock,
    |_| {},
  )
}

#[test]
fn unbuildable_components_stop_before_planning() {
  let spies = Spies::default();
  let mut broken = local("app");
  broken.unbuildable.insert(ComponentName::Executable(ExeName::new("tool")));

  let err = run(&spies, &BuildOptions::default(), &[broken], None).unwrap_err();

  assert!(matches!(err, BuildError::UnbuildableComponents(_)));
  assert!(err.to_string().contains("    app: exe:tool"));
  assert!(spies.prober.seen.get().is_none());
  assert_eq!(spies.planner.calls.get(), 0);
  assert_eq!(spies.executor.calls.get(), 0);
}

#[test]
fn files_are_reported_once_even_on_failure() {
  let spies = Spies::default();
  let mut broken = local("app");
  broken.unbuildable.insert(ComponentName::Library);
  let locals = [broken];

  let calls = Cell::new(0);
  let mut seen = BTreeSet::new();
  let result = build(
    &context(),
    &BuildOptions::default(),
    &spies.collaborators(),
    &locals,
    &source_map(&locals),
    None,
    |files| {
      calls.set(calls.get() + 1);
      seen = files;
    },
  );

  assert!(result.is_err());
  assert_eq!(calls.get(), 1);
  assert!(seen.contains(&PathBuf::from("/project/haul.yaml")));
  assert!(seen.contains(&PathBuf::from("/project/app/src/main.txt")));
}

#[test]
fn all_local_plan_releases_lock_before_execution() {
  let spies = Spies::with_plan(plan(&[("app", TaskLocation::Local)]));
  let mut lock = CountingLock::default();

  let outcome = run(&spies, &BuildOptions::default(), &[local("app")], Some(&mut lock)).unwrap();

  assert_eq!(lock.releases, 1);
  assert_eq!(outcome.lock_decision(), LockDecision::ReleaseEarly);
  assert_eq!(spies.executor.calls.get(), 1);
}

#[test]
fn snapshot_task_retains_lock() {
  let spies = Spies::with_plan(plan(&[("app", TaskLocation::Local), ("text", TaskLocation::Snapshot)]));
  let mut lock = CountingLock::default();

  let outcome = run(&spies, &BuildOptions::default(), &[local("app")], Some(&mut lock)).unwrap();

  assert_eq!(lock.releases, 0);
  assert_eq!(outcome, BuildOutcome::Executed {
    tasks: 2,
    lock: LockDecision::Retain,
  });
}

#[test]
fn empty_plan_still_releases_lock() {
  let spies = Spies::default();
  let mut lock = CountingLock::default();

  run(&spies, &BuildOptions::default(), &[local("app")], Some(&mut lock)).unwrap();
  assert_eq!(lock.releases, 1);
}

#[test]
fn failed_lock_release_aborts_before_execution() {
  let spies = Spies::with_plan(plan(&[("app", TaskLocation::Local)]));
  let mut lock = CountingLock {
    fail: true,
    ..Default::default()
  };

  let err = run(&spies, &BuildOptions::default(), &[local("app")], Some(&mut lock)).unwrap_err();

  assert!(matches!(err, BuildError::LockRelease(_)));
  assert_eq!(err.to_string(), "failed to release snapshot lock: lock file vanished");
  assert_eq!(lock.releases, 1);
  assert_eq!(spies.prefetcher.calls.get(), 0);
  assert_eq!(spies.executor.calls.get(), 0);
}

#[test]
fn foreign_local_installs_rejected_when_disallowed() {
  let spies = Spies::with_plan(plan(&[("app", TaskLocation::Local), ("vendored", TaskLocation::Local)]));
  let mut ctx = context();
  ctx.allow_locals = false;
  let locals = [local("app")];
  let mut lock = CountingLock::default();

  let err = build(
    &ctx,
    &BuildOptions::default(),
    &spies.collaborators(),
    &locals,
    &source_map(&locals),
    Some(&mut lock),
    |_| {},
  )
  .unwrap_err();

  let BuildError::DisallowedLocalInstall(outside) = &err else {
    panic!("unexpected error: {err}");
  };
  assert_eq!(outside, &vec![ident("vendored")]);
  assert_eq!(lock.releases, 0);
  assert_eq!(spies.executor.calls.get(), 0);
}

#[test]
fn foreign_local_installs_allowed_by_default() {
  let spies = Spies::with_plan(plan(&[("app", TaskLocation::Local), ("vendored", TaskLocation::Local)]));
  assert!(run(&spies, &BuildOptions::default(), &[local("app")], None).is_ok());
}

#[test]
fn allow_newer_rejects_old_toolchain() {
  let spies = Spies::with_plan(plan(&[("app", TaskLocation::Local)]));
  let mut ctx = context();
  ctx.compiler.toolchain = Version::new(vec![1, 20, 0, 0]);
  let options = BuildOptions {
    allow_newer: true,
    ..Default::default()
  };
  let locals = [local("app")];

  let err = build(
    &ctx,
    &options,
    &spies.collaborators(),
    &locals,
    &source_map(&locals),
    None,
    |_| {},
  )
  .unwrap_err();

  assert_eq!(
    err.to_string(),
    "allow-newer requires toolchain 1.22 or later, but 1.20.0.0 is in use"
  );
  assert_eq!(spies.executor.calls.get(), 0);
}

#[test]
fn dry_run_renders_without_executing() {
  let spies = Spies::with_plan(plan(&[("text", TaskLocation::Snapshot)]));
  let options = BuildOptions {
    dry_run: true,
    ..Default::default()
  };

  let outcome = run(&spies, &options, &[local("app")], None).unwrap();

  let BuildOutcome::DryRun { rendered, lock } = outcome else {
    panic!("expected a dry run");
  };
  assert!(rendered.starts_with("Would build:\n"));
  assert!(rendered.contains("text-1.0: database=snapshot"));
  assert_eq!(lock, LockDecision::Retain);
  assert_eq!(spies.executor.calls.get(), 0);
}

#[test]
fn dry_run_of_empty_plan() {
  let spies = Spies::default();
  let options = BuildOptions {
    dry_run: true,
    ..Default::default()
  };

  let outcome = run(&spies, &options, &[local("app")], None).unwrap();
  assert_eq!(outcome, BuildOutcome::DryRun {
    rendered: "Nothing to build.\n".to_string(),
    lock: LockDecision::ReleaseEarly,
  });
}

#[test]
fn prefetch_only_when_asked() {
  let spies = Spies::with_plan(plan(&[("text", TaskLocation::Snapshot)]));
  run(&spies, &BuildOptions::default(), &[local("app")], None).unwrap();
  assert_eq!(spies.prefetcher.calls.get(), 0);

  let options = BuildOptions {
    prefetch: true,
    ..Default::default()
  };
  run(&spies, &options, &[local("app")], None).unwrap();
  assert_eq!(spies.prefetcher.calls.get(), 1);
}

#[test]
fn executor_receives_targets_and_probe_results() {
  let mut spies = Spies::with_plan(plan(&[("app", TaskLocation::Local)]));
  spies
    .prober
    .probed
    .installed
    .insert(PackageName::new("text"), (TaskLocation::Snapshot, Version::new(vec![2, 0])));

  run(&spies, &BuildOptions::default(), &[local("app")], None).unwrap();

  assert_eq!(*spies.executor.targets.borrow(), BTreeSet::from([ident("app")]));
  assert_eq!(spies.executor.tasks.get(), 1);
  assert!(spies.executor.installed.borrow().contains_key(&PackageName::new("text")));
}

#[test]
fn options_reach_prober_and_planner() {
  let spies = Spies::default();
  let options = BuildOptions {
    library_profiling: true,
    only_dependencies: true,
    ..Default::default()
  };

  run(&spies, &options, &[local("app")], None).unwrap();

  let seen = spies.prober.seen.get().unwrap();
  assert!(seen.want_profiling);
  assert!(!seen.want_haddock);
  assert_eq!(spies.planner.initial_steps_only.get(), Some(true));
}

#[test]
fn probe_failure_stops_the_build() {
  let mut spies = Spies::with_plan(Plan::new());
  spies.prober.fail = true;

  let err = run(&spies, &BuildOptions::default(), &[local("app")], None).unwrap_err();
  assert_eq!(
    err.to_string(),
    "failed to probe installed packages: package database unreadable"
  );
  assert_eq!(spies.planner.calls.get(), 0);
}
