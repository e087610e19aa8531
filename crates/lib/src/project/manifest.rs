//! Package manifests (`package.yaml`).
//!
//! ```yaml
//! name: my-app
//! version: 0.1.0
//! depends: [text]
//! flags:
//!   fast: false
//! library: {}
//! executables:
//!   my-app: {}
//!   my-bench-tool:
//!     requires-flags: [fast]
//! tests:
//!   spec:
//!     buildable: false
//! build: ./build.sh
//! ```
//!
//! A component is buildable when its `buildable` field (default `true`) is
//! set and every flag in `requires-flags` is on.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::trace;

use crate::consts::{PACKAGE_MANIFEST, WORK_DIR};
use crate::package::{LocalPackage, Package};
use crate::pipeline::{BoxError, PackageLoader};
use crate::plan::PackageLocation;
use crate::types::{ComponentName, ExeName, PackageIdentifier, PackageName, Version};
use crate::util::hash::hash_sources;

use super::ProjectError;

/// Entries never counted as package sources.
const SOURCE_EXCLUDES: &[&str] = &[WORK_DIR, ".git"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ComponentConfig {
  #[serde(default = "default_buildable")]
  pub buildable: bool,
  #[serde(default)]
  pub requires_flags: Vec<String>,
}

fn default_buildable() -> bool {
  true
}

impl ComponentConfig {
  fn is_buildable(&self, flags: &BTreeMap<String, bool>) -> bool {
    self.buildable
      && self
        .requires_flags
        .iter()
        .all(|flag| flags.get(flag).copied().unwrap_or(false))
  }
}

/// The parsed contents of a `package.yaml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PackageManifest {
  pub name: PackageName,
  pub version: Version,
  #[serde(default)]
  pub depends: BTreeSet<PackageName>,
  /// Flag defaults, overridable per build.
  #[serde(default)]
  pub flags: BTreeMap<String, bool>,
  #[serde(default)]
  pub library: Option<ComponentConfig>,
  #[serde(default)]
  pub executables: BTreeMap<ExeName, ComponentConfig>,
  #[serde(default)]
  pub tests: BTreeMap<String, ComponentConfig>,
  #[serde(default)]
  pub benchmarks: BTreeMap<String, ComponentConfig>,
  #[serde(default)]
  pub build: Option<String>,
}

impl PackageManifest {
  /// Read `<dir>/package.yaml`.
  pub fn read(dir: &Path) -> Result<Self, ProjectError> {
    let path = dir.join(PACKAGE_MANIFEST);
    let content = fs::read_to_string(&path).map_err(|source| ProjectError::Read {
      path: path.clone(),
      source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ProjectError::Parse { path, source })
  }

  pub fn ident(&self) -> PackageIdentifier {
    PackageIdentifier::new(self.name.clone(), self.version.clone())
  }

  /// Manifest defaults with `overrides` applied.
  fn effective_flags(&self, overrides: &BTreeMap<String, bool>) -> BTreeMap<String, bool> {
    let mut flags = self.flags.clone();
    flags.extend(overrides.iter().map(|(k, v)| (k.clone(), *v)));
    flags
  }

  /// Every declared component with whether it can be built.
  fn components(&self, flags: &BTreeMap<String, bool>) -> Vec<(ComponentName, bool)> {
    let library = self
      .library
      .iter()
      .map(|config| (ComponentName::Library, config.is_buildable(flags)));
    let exes = self
      .executables
      .iter()
      .map(|(name, config)| (ComponentName::Executable(name.clone()), config.is_buildable(flags)));
    let tests = self
      .tests
      .iter()
      .map(|(name, config)| (ComponentName::Test(name.clone()), config.is_buildable(flags)));
    let benchmarks = self
      .benchmarks
      .iter()
      .map(|(name, config)| (ComponentName::Benchmark(name.clone()), config.is_buildable(flags)));

    library.chain(exes).chain(tests).chain(benchmarks).collect()
  }

  /// The package as the planner sees it.
  pub fn to_package(&self, overrides: &BTreeMap<String, bool>) -> Package {
    let flags = self.effective_flags(overrides);
    let exes = self
      .executables
      .iter()
      .filter(|(_, config)| config.is_buildable(&flags))
      .map(|(name, _)| name.clone())
      .collect();

    Package {
      ident: self.ident(),
      depends: self.depends.clone(),
      exes,
      build: self.build.clone(),
    }
  }

  /// The package as a project member rooted at `dir`.
  pub fn to_local(&self, dir: PathBuf) -> Result<LocalPackage, ProjectError> {
    let flags = self.effective_flags(&BTreeMap::new());
    let components = self.components(&flags);
    let sources = hash_sources(&dir, SOURCE_EXCLUDES)?;

    Ok(LocalPackage {
      package: self.to_package(&BTreeMap::new()),
      files: sources.files,
      source_hash: sources.hash,
      unbuildable: components
        .iter()
        .filter(|(_, buildable)| !buildable)
        .map(|(name, _)| name.clone())
        .collect(),
      components: components.into_iter().map(|(name, _)| name).collect(),
      exes: self.executables.keys().cloned().collect(),
      dir,
    })
  }
}

/// The bundled [`PackageLoader`]: reads `package.yaml` at the location.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestLoader;

impl PackageLoader for ManifestLoader {
  fn load(
    &self,
    location: &PackageLocation,
    flags: &BTreeMap<String, bool>,
    compiler_flags: &[String],
  ) -> Result<Package, BoxError> {
    trace!(location = %location.path().display(), ?flags, ?compiler_flags, "loading package manifest");
    let manifest = PackageManifest::read(location.path())?;
    Ok(manifest.to_package(flags))
  }
}
