//! Immutable build context.
//!
//! Everything process-wide the pipeline needs (platform, compiler, project
//! paths, flags) is collected once into a [`BuildContext`] and threaded
//! through calls by reference. Nothing in the library reads ambient state
//! after the context is built, so tests can hand in synthetic contexts.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::consts::WORK_DIR;
use crate::platform::Platform;
use crate::types::{PackageName, Version};

/// The compiler selected for this build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerInfo {
  /// Version requested by the project.
  pub wanted: Version,
  /// Version actually in use.
  pub actual: Version,
  /// Version of the build library shipped with the compiler.
  pub toolchain: Version,
  /// The compiler's own, read-only package database.
  pub global_db: PathBuf,
}

/// Per-invocation options, usually from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
  /// Packages to build. Empty means every project package.
  pub targets: Vec<PackageName>,
  pub dry_run: bool,
  pub prefetch: bool,
  pub library_profiling: bool,
  pub executable_profiling: bool,
  pub haddock: bool,
  /// Keep debugging symbols instead of stripping them.
  pub keep_symbols: bool,
  pub split_objs: bool,
  /// Relax upper version bounds of dependencies.
  pub allow_newer: bool,
  /// Build only the dependencies of the targets.
  pub only_dependencies: bool,
  /// Maximum number of tasks run at once. Zero picks the CPU count.
  pub jobs: usize,
  /// Extra flags passed to the compiler for every package.
  pub compiler_flags: Vec<String>,
}

impl BuildOptions {
  pub fn wants_profiling(&self) -> bool {
    self.library_profiling || self.executable_profiling
  }

  pub fn wants_symbols(&self) -> bool {
    self.keep_symbols
  }
}

/// Process-wide configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
  pub platform: Platform,
  pub compiler: CompilerInfo,
  /// Directory containing the project file.
  pub project_root: PathBuf,
  /// The project file itself.
  pub config_path: PathBuf,
  /// Shared root holding snapshot install trees.
  pub root: PathBuf,
  /// Name of the snapshot the dependencies come from.
  pub snapshot: String,
  /// User-declared read-only package databases, in declaration order.
  pub extra_dbs: Vec<PathBuf>,
  /// Whether local packages outside the project may be installed.
  pub allow_locals: bool,
  /// Versions of the compiler's global packages, when known.
  pub global_hints: BTreeMap<PackageName, Version>,
}

impl BuildContext {
  /// The project-private work directory.
  pub fn work_dir(&self) -> PathBuf {
    self.project_root.join(WORK_DIR)
  }

  /// Directory holding intermediate build products.
  pub fn dist_dir(&self) -> PathBuf {
    self
      .work_dir()
      .join("dist")
      .join(self.platform.triple())
      .join(format!("toolchain-{}", self.compiler.toolchain))
  }

  /// Subpath shared by both install roots: `<platform>/<snapshot>/<compiler>`.
  pub fn install_subpath(&self) -> PathBuf {
    PathBuf::from(self.platform.triple())
      .join(&self.snapshot)
      .join(self.compiler.actual.to_string())
  }
}

#[cfg(test)]
pub(crate) mod testutil {
  use super::*;
  use crate::platform::{Arch, Os};

  /// A synthetic context rooted at `/project` with the shared root at `/root`.
  pub fn context() -> BuildContext {
    BuildContext {
      platform: Platform::new(Arch::X86_64, Os::Linux),
      compiler: CompilerInfo {
        wanted: Version::new(vec![9, 6, 4]),
        actual: Version::new(vec![9, 6, 4]),
        toolchain: Version::new(vec![3, 10, 1, 0]),
        global_db: PathBuf::from("/compiler/lib/package.conf.d"),
      },
      project_root: PathBuf::from("/project"),
      config_path: PathBuf::from("/project/haul.yaml"),
      root: PathBuf::from("/root"),
      snapshot: "lts-22.7".to_string(),
      extra_dbs: vec![PathBuf::from("/extra/one"), PathBuf::from("/extra/two")],
      allow_locals: true,
      global_hints: BTreeMap::new(),
    }
  }
}
