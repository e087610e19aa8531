//! Package database tiers.
//!
//! Installed packages are looked up in four tiers, consulted front to back:
//!
//! 1. **global**: shipped with the compiler, read-only
//! 2. **extra**: user-declared databases, read-only, in declaration order
//! 3. **snapshot**: shared between projects, guarded by the snapshot lock
//! 4. **local**: private to the project
//!
//! A package registered in a later tier shadows the same package in an
//! earlier one.

use std::ffi::OsString;
use std::fmt;
use std::path::{Component, MAIN_SEPARATOR, Path, PathBuf};

use crate::consts::{BIN_DIR, DOC_DIR, PKGDB_DIR, REPORT_DIR, WORK_DIR};
use crate::context::{BuildContext, BuildOptions};
use crate::plan::TaskLocation;

/// One of the four database tiers. Ordered by lookup precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DatabaseTier {
  Global,
  Extra,
  Snapshot,
  Local,
}

impl DatabaseTier {
  pub fn as_str(&self) -> &'static str {
    match self {
      DatabaseTier::Global => "global",
      DatabaseTier::Extra => "extra",
      DatabaseTier::Snapshot => "snapshot",
      DatabaseTier::Local => "local",
    }
  }

  /// Whether builds may register packages into this tier.
  pub fn is_writable(&self) -> bool {
    matches!(self, DatabaseTier::Snapshot | DatabaseTier::Local)
  }
}

impl fmt::Display for DatabaseTier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A tier together with the database directory backing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierLocation {
  pub tier: DatabaseTier,
  pub path: PathBuf,
}

/// The two writable install roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRoots {
  pub snapshot: PathBuf,
  pub local: PathBuf,
}

impl InstallRoots {
  pub fn resolve(ctx: &BuildContext) -> Self {
    let subpath = ctx.install_subpath();
    Self {
      snapshot: ctx.root.join("snapshots").join(&subpath),
      local: ctx.project_root.join(WORK_DIR).join("install").join(&subpath),
    }
  }

  pub fn for_location(&self, location: TaskLocation) -> &Path {
    match location {
      TaskLocation::Snapshot => &self.snapshot,
      TaskLocation::Local => &self.local,
    }
  }

  pub fn bin_dir(&self, location: TaskLocation) -> PathBuf {
    self.for_location(location).join(BIN_DIR)
  }

  pub fn doc_dir(&self, location: TaskLocation) -> PathBuf {
    self.for_location(location).join(DOC_DIR)
  }

  /// Coverage reports only ever live in the local tree.
  pub fn report_dir(&self) -> PathBuf {
    self.local.join(REPORT_DIR)
  }
}

/// The ordered set of package databases for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseTierSet {
  pub global: PathBuf,
  pub extra: Vec<PathBuf>,
  pub snapshot: PathBuf,
  pub local: PathBuf,
}

impl DatabaseTierSet {
  /// Resolve every tier from the context. Pure, never fails.
  pub fn resolve(ctx: &BuildContext) -> Self {
    let roots = InstallRoots::resolve(ctx);
    Self {
      global: ctx.compiler.global_db.clone(),
      extra: ctx.extra_dbs.clone(),
      snapshot: roots.snapshot.join(PKGDB_DIR),
      local: roots.local.join(PKGDB_DIR),
    }
  }

  /// All tiers in lookup order: global, each extra, snapshot, local.
  pub fn ordered(&self) -> Vec<TierLocation> {
    let mut tiers = Vec::with_capacity(self.extra.len() + 3);
    tiers.push(TierLocation {
      tier: DatabaseTier::Global,
      path: self.global.clone(),
    });
    tiers.extend(self.extra.iter().map(|path| TierLocation {
      tier: DatabaseTier::Extra,
      path: path.clone(),
    }));
    tiers.push(TierLocation {
      tier: DatabaseTier::Snapshot,
      path: self.snapshot.clone(),
    });
    tiers.push(TierLocation {
      tier: DatabaseTier::Local,
      path: self.local.clone(),
    });
    tiers
  }

  /// The writable database a task registers into.
  pub fn for_location(&self, location: TaskLocation) -> &Path {
    match location {
      TaskLocation::Snapshot => &self.snapshot,
      TaskLocation::Local => &self.local,
    }
  }

  /// Value for the compiler's package path variable.
  ///
  /// Most specific first: local, snapshot, each extra, global, joined with
  /// the platform path-list separator.
  pub fn package_path(&self) -> Result<OsString, std::env::JoinPathsError> {
    let mut paths: Vec<&Path> = vec![&self.local, &self.snapshot];
    paths.extend(self.extra.iter().map(PathBuf::as_path));
    paths.push(&self.global);
    std::env::join_paths(paths)
  }
}

/// Everything derived from the context that the planner and executor share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseConfig {
  pub tiers: DatabaseTierSet,
  pub roots: InstallRoots,
  pub dist_dir: PathBuf,
  pub options: BuildOptions,
}

impl BaseConfig {
  pub fn new(ctx: &BuildContext, options: &BuildOptions) -> Self {
    Self {
      tiers: DatabaseTierSet::resolve(ctx),
      roots: InstallRoots::resolve(ctx),
      dist_dir: ctx.dist_dir(),
      options: options.clone(),
    }
  }
}

/// Render a path for humans and scripts, without a trailing separator.
///
/// Rendering is idempotent. A filesystem root (`/`, `C:\`) keeps its
/// separator, since `C:` alone names the drive's current directory.
pub fn render_path(path: &Path) -> String {
  let rendered = path.to_string_lossy();
  let trimmed = rendered.trim_end_matches(['/', MAIN_SEPARATOR]);

  let mut components = path.components();
  let is_root = matches!(
    (components.next(), components.next(), components.next()),
    (Some(Component::RootDir), None, None) | (Some(Component::Prefix(_)), Some(Component::RootDir), None)
  );
  if is_root {
    return format!("{}{}", trimmed, MAIN_SEPARATOR);
  }
  trimmed.to_string()
}
