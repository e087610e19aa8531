use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::package::{LocalPackage, Package};
use crate::types::{PackageIdentifier, PackageName, Version};

/// Which install tree a task writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskLocation {
  /// The shared snapshot install tree, guarded by the snapshot lock.
  Snapshot,
  /// The project's own install tree.
  Local,
}

impl TaskLocation {
  pub fn as_str(&self) -> &'static str {
    match self {
      TaskLocation::Snapshot => "snapshot",
      TaskLocation::Local => "local",
    }
  }
}

impl fmt::Display for TaskLocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Where an immutable package's sources live.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageLocation(pub PathBuf);

impl PackageLocation {
  pub fn path(&self) -> &Path {
    &self.0
  }
}

/// How a task obtains its sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskType {
  /// Build from a local checkout owned by the project.
  FilePath {
    package: Package,
    dir: PathBuf,
    source_hash: String,
  },
  /// Build from a fetched, immutable location.
  Immutable { package: Package, location: PackageLocation },
}

impl TaskType {
  pub fn package(&self) -> &Package {
    match self {
      TaskType::FilePath { package, .. } | TaskType::Immutable { package, .. } => package,
    }
  }

  pub fn source_dir(&self) -> &Path {
    match self {
      TaskType::FilePath { dir, .. } => dir,
      TaskType::Immutable { location, .. } => location.path(),
    }
  }

  pub fn is_file_path(&self) -> bool {
    matches!(self, TaskType::FilePath { .. })
  }
}

/// One unit of build work for a single package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
  pub ident: PackageIdentifier,
  pub task_type: TaskType,
  pub location: TaskLocation,
  /// Plan tasks that must complete before this one starts.
  pub deps: BTreeSet<PackageIdentifier>,
}

impl Task {
  pub fn package(&self) -> &Package {
    self.task_type.package()
  }
}

/// The full set of work needed to satisfy the requested targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
  pub tasks: BTreeMap<PackageIdentifier, Task>,
}

impl Plan {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, task: Task) {
    self.tasks.insert(task.ident.clone(), task);
  }

  pub fn is_empty(&self) -> bool {
    self.tasks.is_empty()
  }

  pub fn len(&self) -> usize {
    self.tasks.len()
  }

  pub fn tasks(&self) -> impl Iterator<Item = &Task> {
    self.tasks.values()
  }
}

/// A resolved dependency that is not part of the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySource {
  pub version: Version,
  pub location: TaskLocation,
  pub source: PackageLocation,
  pub flags: BTreeMap<String, bool>,
}

/// Every package available to this build, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
  /// Project packages.
  pub project: BTreeMap<PackageName, LocalPackage>,
  /// Resolved dependencies, both extra-deps and snapshot packages.
  pub deps: BTreeMap<PackageName, DependencySource>,
  /// Packages the user asked to build.
  pub targets: BTreeSet<PackageName>,
  /// Extra flags passed to the compiler for every package.
  pub compiler_flags: Vec<String>,
}

impl SourceMap {
  /// Expected version and install location for every known package.
  pub fn install_map(&self) -> InstallMap {
    let project = self
      .project
      .iter()
      .map(|(name, lp)| (name.clone(), (TaskLocation::Local, lp.ident().version.clone())));
    let deps = self
      .deps
      .iter()
      .map(|(name, dep)| (name.clone(), (dep.location, dep.version.clone())));
    project.chain(deps).collect()
  }

  /// Identifiers of the requested targets.
  pub fn target_idents(&self) -> BTreeSet<PackageIdentifier> {
    self
      .targets
      .iter()
      .filter_map(|name| {
        if let Some(lp) = self.project.get(name) {
          Some(lp.ident().clone())
        } else {
          self
            .deps
            .get(name)
            .map(|dep| PackageIdentifier::new(name.clone(), dep.version.clone()))
        }
      })
      .collect()
  }
}

/// What the source map expects to be installed, and where.
pub type InstallMap = BTreeMap<PackageName, (TaskLocation, Version)>;

/// What is already installed, and where. Global packages count as `Snapshot`.
pub type InstalledMap = BTreeMap<PackageName, (TaskLocation, Version)>;
