//! Project files (`haul.yaml`) and the packages they declare.
//!
//! ```yaml
//! snapshot: lts-22.7
//! compiler:
//!   wanted: 9.6.4
//!   toolchain: 3.10.1.0
//! packages:
//!   - .
//!   - libs/core
//! extra-deps:
//!   - name: vendored
//!     version: 1.0.0
//!     path: vendor/vendored
//! dependencies:
//!   - name: text
//!     version: 2.0.2
//!     path: /srv/sources/text-2.0.2
//!     flags:
//!       simd: true
//! extra-package-dbs: []
//! allow-locals: true
//! global-hints:
//!   base: 4.18.2.0
//! ```
//!
//! Relative paths are resolved against the directory holding the project file.

pub mod manifest;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::consts::{PKGDB_DIR, PROJECT_FILE};
use crate::context::{BuildContext, CompilerInfo};
use crate::package::LocalPackage;
use crate::plan::{DependencySource, PackageLocation, SourceMap, TaskLocation};
use crate::platform::Platform;
use crate::types::{PackageName, Version};
use crate::util::hash::HashError;

pub use manifest::{ManifestLoader, PackageManifest};

#[derive(Debug, Error)]
pub enum ProjectError {
  #[error("no {} found in {} or any parent directory", PROJECT_FILE, start.display())]
  NotFound { start: PathBuf },

  #[error("failed to read {}: {source}", path.display())]
  Read { path: PathBuf, source: std::io::Error },

  #[error("failed to parse {}: {source}", path.display())]
  Parse { path: PathBuf, source: serde_yaml::Error },

  #[error("failed to hash package sources: {0}")]
  Hash(#[from] HashError),

  #[error("package '{0}' is declared more than once")]
  DuplicatePackage(PackageName),

  #[error("unknown target '{0}': not a project package or dependency")]
  UnknownTarget(PackageName),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CompilerConfig {
  pub wanted: Version,
  /// Defaults to `wanted`.
  #[serde(default)]
  pub actual: Option<Version>,
  pub toolchain: Version,
  /// Defaults to `<root>/compilers/<actual>/pkgdb`.
  #[serde(default)]
  pub global_db: Option<PathBuf>,
}

/// A dependency pinned to a source directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DependencyConfig {
  pub name: PackageName,
  pub version: Version,
  pub path: PathBuf,
  #[serde(default)]
  pub flags: BTreeMap<String, bool>,
}

/// The parsed contents of `haul.yaml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ProjectConfig {
  pub snapshot: String,
  pub compiler: CompilerConfig,
  #[serde(default = "default_packages")]
  pub packages: Vec<PathBuf>,
  /// Dependencies installed into the project's own tree.
  #[serde(default)]
  pub extra_deps: Vec<DependencyConfig>,
  /// Dependencies installed into the shared snapshot tree.
  #[serde(default)]
  pub dependencies: Vec<DependencyConfig>,
  #[serde(default)]
  pub extra_package_dbs: Vec<PathBuf>,
  #[serde(default = "default_allow_locals")]
  pub allow_locals: bool,
  #[serde(default)]
  pub global_hints: BTreeMap<PackageName, Version>,
}

fn default_packages() -> Vec<PathBuf> {
  vec![PathBuf::from(".")]
}

fn default_allow_locals() -> bool {
  true
}

/// A loaded project: its configuration and every local package.
#[derive(Debug, Clone)]
pub struct Project {
  pub root: PathBuf,
  pub config_path: PathBuf,
  pub config: ProjectConfig,
  pub locals: Vec<LocalPackage>,
}

impl Project {
  /// Find the project file in `start` or the closest parent holding one.
  pub fn discover(start: &Path) -> Result<PathBuf, ProjectError> {
    start
      .ancestors()
      .map(|dir| dir.join(PROJECT_FILE))
      .find(|candidate| candidate.is_file())
      .ok_or_else(|| ProjectError::NotFound {
        start: start.to_path_buf(),
      })
  }

  /// Read the project file and every package it lists.
  pub fn load(config_path: &Path) -> Result<Self, ProjectError> {
    let config_path = dunce::canonicalize(config_path).map_err(|source| ProjectError::Read {
      path: config_path.to_path_buf(),
      source,
    })?;
    let root = config_path
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_else(|| PathBuf::from("."));

    let content = fs::read_to_string(&config_path).map_err(|source| ProjectError::Read {
      path: config_path.clone(),
      source,
    })?;
    let config: ProjectConfig = serde_yaml::from_str(&content).map_err(|source| ProjectError::Parse {
      path: config_path.clone(),
      source,
    })?;

    let mut seen = BTreeSet::new();
    let mut locals = Vec::with_capacity(config.packages.len());
    for dir in &config.packages {
      let dir = resolve(&root, dir);
      let local = PackageManifest::read(&dir)?.to_local(dir)?;
      if !seen.insert(local.name().clone()) {
        return Err(ProjectError::DuplicatePackage(local.name().clone()));
      }
      debug!(package = %local.ident(), files = local.files.len(), "loaded local package");
      locals.push(local);
    }

    info!(project = %root.display(), packages = locals.len(), "loaded project");
    Ok(Self {
      root,
      config_path,
      config,
      locals,
    })
  }

  /// The build context for this project on `platform`, sharing `root`.
  pub fn context(&self, platform: Platform, root: PathBuf) -> BuildContext {
    let compiler = &self.config.compiler;
    let actual = compiler.actual.clone().unwrap_or_else(|| compiler.wanted.clone());
    let global_db = match &compiler.global_db {
      Some(db) => resolve(&self.root, db),
      None => root.join("compilers").join(actual.to_string()).join(PKGDB_DIR),
    };

    BuildContext {
      platform,
      compiler: CompilerInfo {
        wanted: compiler.wanted.clone(),
        actual,
        toolchain: compiler.toolchain.clone(),
        global_db,
      },
      project_root: self.root.clone(),
      config_path: self.config_path.clone(),
      root,
      snapshot: self.config.snapshot.clone(),
      extra_dbs: self
        .config
        .extra_package_dbs
        .iter()
        .map(|db| resolve(&self.root, db))
        .collect(),
      allow_locals: self.config.allow_locals,
      global_hints: self.config.global_hints.clone(),
    }
  }

  /// Everything this build can draw on, with `targets` selected.
  ///
  /// No targets selects every project package.
  pub fn source_map(&self, targets: &[PackageName], compiler_flags: &[String]) -> Result<SourceMap, ProjectError> {
    let project: BTreeMap<PackageName, LocalPackage> =
      self.locals.iter().map(|lp| (lp.name().clone(), lp.clone())).collect();

    let extra = self.config.extra_deps.iter().map(|dep| (dep, TaskLocation::Local));
    let snapshot = self.config.dependencies.iter().map(|dep| (dep, TaskLocation::Snapshot));

    let mut deps = BTreeMap::new();
    for (dep, location) in extra.chain(snapshot) {
      if project.contains_key(&dep.name) || deps.contains_key(&dep.name) {
        return Err(ProjectError::DuplicatePackage(dep.name.clone()));
      }
      deps.insert(
        dep.name.clone(),
        DependencySource {
          version: dep.version.clone(),
          location,
          source: PackageLocation(resolve(&self.root, &dep.path)),
          flags: dep.flags.clone(),
        },
      );
    }

    let targets: BTreeSet<PackageName> = if targets.is_empty() {
      project.keys().cloned().collect()
    } else {
      targets.iter().cloned().collect()
    };
    if let Some(unknown) = targets
      .iter()
      .find(|t| !project.contains_key(*t) && !deps.contains_key(*t))
    {
      return Err(ProjectError::UnknownTarget(unknown.clone()));
    }

    Ok(SourceMap {
      project,
      deps,
      targets,
      compiler_flags: compiler_flags.to_vec(),
    })
  }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
  if path.is_absolute() {
    path.to_path_buf()
  } else {
    root.join(path)
  }
}
