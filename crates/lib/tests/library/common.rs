use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::PathBuf;

use haul_lib::context::{BuildContext, CompilerInfo};
use haul_lib::install::DumpPackage;
use haul_lib::package::{LocalPackage, Package};
use haul_lib::pipeline::{
  BoxError, Collaborators, ExecuteRequest, Executor, InstalledOptions, InstalledProber, PackageLoader,
  PlanConstructor, Prefetcher, Probed,
};
use haul_lib::plan::{InstallMap, InstalledMap, PackageLocation, Plan, SourceMap, Task, TaskLocation, TaskType};
use haul_lib::platform::{Arch, Os, Platform};
use haul_lib::snapshot_lock::ReleaseLock;
use haul_lib::tiers::BaseConfig;
use haul_lib::types::{PackageIdentifier, PackageName, Version};

pub fn ident(name: &str) -> PackageIdentifier {
  PackageIdentifier::new(PackageName::new(name), Version::new(vec![1, 0]))
}

pub fn context() -> BuildContext {
  BuildContext {
    platform: Platform::new(Arch::X86_64, Os::Linux),
    compiler: CompilerInfo {
      wanted: Version::new(vec![9, 6, 4]),
      actual: Version::new(vec![9, 6, 4]),
      toolchain: Version::new(vec![3, 10, 1, 0]),
      global_db: PathBuf::from("/compiler/pkgdb"),
    },
    project_root: PathBuf::from("/project"),
    config_path: PathBuf::from("/project/haul.yaml"),
    root: PathBuf::from("/shared"),
    snapshot: "lts-22.7".to_string(),
    extra_dbs: Vec::new(),
    allow_locals: true,
    global_hints: BTreeMap::new(),
  }
}

pub fn package(name: &str, exes: &[&str]) -> Package {
  Package {
    ident: ident(name),
    depends: BTreeSet::new(),
    exes: exes.iter().map(|e| haul_lib::types::ExeName::new(*e)).collect(),
    build: None,
  }
}

pub fn local(name: &str) -> LocalPackage {
  let dir = PathBuf::from("/project").join(name);
  LocalPackage {
    package: package(name, &[]),
    files: [dir.join("package.yaml"), dir.join("src/main.txt")].into_iter().collect(),
    dir,
    components: BTreeSet::new(),
    unbuildable: BTreeSet::new(),
    exes: BTreeSet::new(),
    source_hash: format!("hash-{name}"),
  }
}

pub fn task(name: &str, location: TaskLocation) -> Task {
  let task_type = match location {
    TaskLocation::Local => TaskType::FilePath {
      package: package(name, &[]),
      dir: PathBuf::from("/project").join(name),
      source_hash: format!("hash-{name}"),
    },
    TaskLocation::Snapshot => TaskType::Immutable {
      package: package(name, &[]),
      location: PackageLocation(PathBuf::from("/sources").join(name)),
    },
  };
  Task {
    ident: ident(name),
    task_type,
    location,
    deps: BTreeSet::new(),
  }
}

pub fn plan(tasks: &[(&str, TaskLocation)]) -> Plan {
  let mut plan = Plan::new();
  for (name, location) in tasks {
    plan.insert(task(name, *location));
  }
  plan
}

pub fn source_map(locals: &[LocalPackage]) -> SourceMap {
  SourceMap {
    project: locals.iter().map(|lp| (lp.name().clone(), lp.clone())).collect(),
    targets: locals.iter().map(|lp| lp.name().clone()).collect(),
    ..Default::default()
  }
}

/// Returns a fixed probe result and remembers the options it saw.
#[derive(Default)]
pub struct SpyProber {
  pub probed: Probed,
  pub seen: Cell<Option<InstalledOptions>>,
  pub fail: bool,
}

impl InstalledProber for SpyProber {
  fn probe(&self, options: InstalledOptions, _install_map: &InstallMap) -> Result<Probed, BoxError> {
    self.seen.set(Some(options));
    if self.fail {
      return Err("package database unreadable".into());
    }
    Ok(self.probed.clone())
  }
}

/// Hands back a fixed plan.
#[derive(Default)]
pub struct SpyPlanner {
  pub plan: Plan,
  pub calls: Cell<usize>,
  pub initial_steps_only: Cell<Option<bool>>,
}

impl PlanConstructor for SpyPlanner {
  fn construct(
    &self,
    _base: &BaseConfig,
    _local_dumps: &[DumpPackage],
    _loader: &dyn PackageLoader,
    _source_map: &SourceMap,
    _installed: &InstalledMap,
    initial_steps_only: bool,
  ) -> Result<Plan, BoxError> {
    self.calls.set(self.calls.get() + 1);
    self.initial_steps_only.set(Some(initial_steps_only));
    Ok(self.plan.clone())
  }
}

pub struct NoLoader;

impl PackageLoader for NoLoader {
  fn load(
    &self,
    location: &PackageLocation,
    _flags: &BTreeMap<String, bool>,
    _compiler_flags: &[String],
  ) -> Result<Package, BoxError> {
    Err(format!("unexpected load of {}", location.path().display()).into())
  }
}

/// Records what it was asked to execute.
#[derive(Default)]
pub struct SpyExecutor {
  pub calls: Cell<usize>,
  pub targets: RefCell<BTreeSet<PackageIdentifier>>,
  pub tasks: Cell<usize>,
  pub installed: RefCell<InstalledMap>,
}

impl Executor for SpyExecutor {
  fn execute(&self, request: ExecuteRequest<'_>) -> Result<(), BoxError> {
    self.calls.set(self.calls.get() + 1);
    *self.targets.borrow_mut() = request.targets.clone();
    *self.installed.borrow_mut() = request.installed.clone();
    self.tasks.set(request.plan.len());
    Ok(())
  }
}

#[derive(Default)]
pub struct SpyPrefetcher {
  pub calls: Cell<usize>,
}

impl Prefetcher for SpyPrefetcher {
  fn prefetch(&self, _plan: &Plan) -> Result<(), BoxError> {
    self.calls.set(self.calls.get() + 1);
    Ok(())
  }
}

/// Counts releases; with `fail` set, every release errors.
#[derive(Default)]
pub struct CountingLock {
  pub releases: usize,
  pub fail: bool,
}

impl ReleaseLock for CountingLock {
  fn release(&mut self) -> io::Result<()> {
    self.releases += 1;
    if self.fail {
      return Err(io::Error::other("lock file vanished"));
    }
    Ok(())
  }
}

/// One set of spies, wired together.
#[derive(Default)]
pub struct Spies {
  pub prober: SpyProber,
  pub planner: SpyPlanner,
  pub executor: SpyExecutor,
  pub prefetcher: SpyPrefetcher,
}

impl Spies {
  pub fn with_plan(plan: Plan) -> Self {
    Self {
      planner: SpyPlanner {
        plan,
        ..Default::default()
      },
      ..Default::default()
    }
  }

  pub fn collaborators(&self) -> Collaborators<'_> {
    Collaborators {
      prober: &self.prober,
      planner: &self.planner,
      loader: &NoLoader,
      executor: &self.executor,
      prefetcher: &self.prefetcher,
    }
  }
}
