use std::fs;
use std::path::Path;

use tempfile::TempDir;

use haul_lib::context::{BuildContext, BuildOptions};
use haul_lib::execute::{SourcePrefetcher, WaveExecutor};
use haul_lib::install::dump::read_db;
use haul_lib::install::{DbProber, ResolvedPlanner};
use haul_lib::pipeline::lock::LockDecision;
use haul_lib::pipeline::{BuildOutcome, Collaborators, build};
use haul_lib::platform::{Arch, Os, Platform};
use haul_lib::project::{ManifestLoader, Project};
use haul_lib::snapshot_lock::{ReleaseLock, SnapshotLock};
use haul_lib::tiers::{DatabaseTierSet, InstallRoots};
use haul_lib::types::PackageName;

const PROJECT: &str = "\
snapshot: lts-22.7
compiler:
  wanted: '9.6.4'
  toolchain: '3.10.1.0'
packages:
  - app
dependencies:
  - name: text
    version: '2.0'
    path: ../sources/text
";

const APP: &str = "\
name: app
version: '0.1'
depends: [text]
executables:
  app: {}
";

const TEXT: &str = "\
name: text
version: '2.0'
library: {}
";

struct Workspace {
  temp: TempDir,
}

impl Workspace {
  fn new() -> Self {
    let temp = TempDir::new().unwrap();
    write(&temp.path().join("project/haul.yaml"), PROJECT);
    write(&temp.path().join("project/app/package.yaml"), APP);
    write(&temp.path().join("project/app/src/Main.txt"), "main = pure ()\n");
    write(&temp.path().join("sources/text/package.yaml"), TEXT);
    Self { temp }
  }

  fn project(&self) -> Project {
    Project::load(&self.temp.path().join("project/haul.yaml")).unwrap()
  }

  fn context(&self, project: &Project) -> BuildContext {
    project.context(Platform::new(Arch::X86_64, Os::Linux), self.temp.path().join("shared"))
  }

  fn build(&self, options: &BuildOptions, lock: Option<&mut dyn ReleaseLock>) -> BuildOutcome {
    let project = self.project();
    let ctx = self.context(&project);
    let source_map = project.source_map(&[], &[]).unwrap();

    let prober = DbProber::new(DatabaseTierSet::resolve(&ctx));
    let collaborators = Collaborators {
      prober: &prober,
      planner: &ResolvedPlanner,
      loader: &ManifestLoader,
      executor: &WaveExecutor,
      prefetcher: &SourcePrefetcher,
    };

    build(&ctx, options, &collaborators, &project.locals, &source_map, lock, |_| {}).unwrap()
  }
}

fn write(path: &Path, content: &str) {
  fs::create_dir_all(path.parent().unwrap()).unwrap();
  fs::write(path, content).unwrap();
}

#[test]
fn dry_run_lists_dependency_before_project_package() {
  let ws = Workspace::new();
  let options = BuildOptions {
    dry_run: true,
    ..Default::default()
  };

  let BuildOutcome::DryRun { rendered, lock } = ws.build(&options, None) else {
    panic!("expected a dry run");
  };

  let lines: Vec<&str> = rendered.lines().collect();
  assert_eq!(lines[0], "Would build:");
  assert!(lines[1].starts_with("  text-2.0: database=snapshot"));
  assert!(lines[2].starts_with("  app-0.1: database=local"));
  assert!(lines[2].ends_with("after: text-2.0"));
  assert_eq!(lock, LockDecision::Retain);
}

#[test]
fn second_build_is_a_no_op_and_releases_lock_early() {
  let ws = Workspace::new();
  let project = ws.project();
  let ctx = ws.context(&project);
  let roots = InstallRoots::resolve(&ctx);

  let mut lock = SnapshotLock::acquire(&roots.snapshot, "haul build").unwrap();
  let first = ws.build(&BuildOptions::default(), Some(&mut lock));
  assert_eq!(first, BuildOutcome::Executed {
    tasks: 2,
    lock: LockDecision::Retain,
  });
  assert!(lock.is_held());

  let tiers = DatabaseTierSet::resolve(&ctx);
  let snapshot = read_db(&tiers.snapshot).unwrap();
  assert_eq!(snapshot.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(), vec!["text"]);
  let local = read_db(&tiers.local).unwrap();
  assert_eq!(local.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(), vec!["app"]);

  let second = ws.build(&BuildOptions::default(), Some(&mut lock));
  assert_eq!(second, BuildOutcome::Executed {
    tasks: 0,
    lock: LockDecision::ReleaseEarly,
  });
  assert!(!lock.is_held());
}

#[test]
fn edited_sources_rebuild_only_the_project_package() {
  let ws = Workspace::new();
  ws.build(&BuildOptions::default(), None);

  write(&ws.temp.path().join("project/app/src/Main.txt"), "main = print 1\n");

  let options = BuildOptions {
    dry_run: true,
    ..Default::default()
  };
  let BuildOutcome::DryRun { rendered, lock } = ws.build(&options, None) else {
    panic!("expected a dry run");
  };
  assert_eq!(rendered.lines().count(), 2);
  assert!(rendered.contains("app-0.1: database=local"));
  assert_eq!(lock, LockDecision::ReleaseEarly);
}

#[test]
fn unreadable_dependency_fails_planning() {
  let ws = Workspace::new();
  fs::remove_file(ws.temp.path().join("sources/text/package.yaml")).unwrap();

  let project = ws.project();
  let ctx = ws.context(&project);
  let source_map = project.source_map(&[PackageName::new("app")], &[]).unwrap();
  let prober = DbProber::new(DatabaseTierSet::resolve(&ctx));
  let collaborators = Collaborators {
    prober: &prober,
    planner: &ResolvedPlanner,
    loader: &ManifestLoader,
    executor: &WaveExecutor,
    prefetcher: &SourcePrefetcher,
  };

  let err = build(
    &ctx,
    &BuildOptions::default(),
    &collaborators,
    &project.locals,
    &source_map,
    None,
    |_| {},
  )
  .unwrap_err();
  assert!(err.to_string().starts_with("failed to construct build plan"));
  assert!(!InstallRoots::resolve(&ctx).local.exists());
}
