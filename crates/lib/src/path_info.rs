//! Named filesystem locations of a build, for humans and scripts.
//!
//! Every value is rendered without a trailing separator so shell scripts can
//! append to it safely.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::context::BuildContext;
use crate::plan::TaskLocation;
use crate::tiers::{DatabaseTierSet, InstallRoots, render_path};

/// A location that cannot be rendered, typically a path list whose members
/// contain the platform's list separator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot render {key}: {reason}")]
pub struct PathInfoError {
  pub key: PathKey,
  pub reason: String,
}

/// A named location. Declaration order is listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathKey {
  ProjectRoot,
  ConfigLocation,
  BinPath,
  SnapshotInstallRoot,
  LocalInstallRoot,
  GlobalPkgDb,
  ExtraPkgDbs,
  SnapshotPkgDb,
  LocalPkgDb,
  PackagePath,
  DistDir,
  SnapshotDocRoot,
  LocalDocRoot,
  LocalReportRoot,
}

impl PathKey {
  pub const ALL: [PathKey; 14] = [
    PathKey::ProjectRoot,
    PathKey::ConfigLocation,
    PathKey::BinPath,
    PathKey::SnapshotInstallRoot,
    PathKey::LocalInstallRoot,
    PathKey::GlobalPkgDb,
    PathKey::ExtraPkgDbs,
    PathKey::SnapshotPkgDb,
    PathKey::LocalPkgDb,
    PathKey::PackagePath,
    PathKey::DistDir,
    PathKey::SnapshotDocRoot,
    PathKey::LocalDocRoot,
    PathKey::LocalReportRoot,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      PathKey::ProjectRoot => "project-root",
      PathKey::ConfigLocation => "config-location",
      PathKey::BinPath => "bin-path",
      PathKey::SnapshotInstallRoot => "snapshot-install-root",
      PathKey::LocalInstallRoot => "local-install-root",
      PathKey::GlobalPkgDb => "global-pkg-db",
      PathKey::ExtraPkgDbs => "extra-pkg-dbs",
      PathKey::SnapshotPkgDb => "snapshot-pkg-db",
      PathKey::LocalPkgDb => "local-pkg-db",
      PathKey::PackagePath => "package-path",
      PathKey::DistDir => "dist-dir",
      PathKey::SnapshotDocRoot => "snapshot-doc-root",
      PathKey::LocalDocRoot => "local-doc-root",
      PathKey::LocalReportRoot => "local-report-root",
    }
  }

  pub fn description(&self) -> &'static str {
    match self {
      PathKey::ProjectRoot => "Project root (directory of the project file)",
      PathKey::ConfigLocation => "Project file location",
      PathKey::BinPath => "Search path with both install trees' bin directories first",
      PathKey::SnapshotInstallRoot => "Snapshot installation root",
      PathKey::LocalInstallRoot => "Local project installation root",
      PathKey::GlobalPkgDb => "Global package database",
      PathKey::ExtraPkgDbs => "Extra package databases",
      PathKey::SnapshotPkgDb => "Snapshot package database",
      PathKey::LocalPkgDb => "Local project package database",
      PathKey::PackagePath => "Package database search path handed to builds",
      PathKey::DistDir => "Directory for intermediate build products",
      PathKey::SnapshotDocRoot => "Snapshot documentation root",
      PathKey::LocalDocRoot => "Local project documentation root",
      PathKey::LocalReportRoot => "Local project coverage report root",
    }
  }
}

impl fmt::Display for PathKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Resolved values for every [`PathKey`].
///
/// Each key is resolved on its own, so one unrepresentable location does not
/// hide the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathInfo {
  entries: Vec<(PathKey, Result<String, PathInfoError>)>,
}

impl PathInfo {
  /// Resolve every location. `search_path` is the caller's `PATH`, appended
  /// after the install trees' bin directories.
  pub fn new(ctx: &BuildContext, search_path: Option<&OsStr>) -> Self {
    let tiers = DatabaseTierSet::resolve(ctx);
    let roots = InstallRoots::resolve(ctx);

    let mut bin_path = vec![roots.bin_dir(TaskLocation::Local), roots.bin_dir(TaskLocation::Snapshot)];
    if let Some(search_path) = search_path {
      bin_path.extend(std::env::split_paths(search_path));
    }

    let entries = PathKey::ALL
      .iter()
      .map(|&key| {
        let value = match key {
          PathKey::ProjectRoot => Ok(render_path(&ctx.project_root)),
          PathKey::ConfigLocation => Ok(render_path(&ctx.config_path)),
          PathKey::BinPath => render_list(&bin_path),
          PathKey::SnapshotInstallRoot => Ok(render_path(&roots.snapshot)),
          PathKey::LocalInstallRoot => Ok(render_path(&roots.local)),
          PathKey::GlobalPkgDb => Ok(render_path(&tiers.global)),
          PathKey::ExtraPkgDbs => render_list(&tiers.extra),
          PathKey::SnapshotPkgDb => Ok(render_path(&tiers.snapshot)),
          PathKey::LocalPkgDb => Ok(render_path(&tiers.local)),
          PathKey::PackagePath => tiers
            .package_path()
            .and_then(|joined| render_list(&std::env::split_paths(&joined).collect::<Vec<_>>())),
          PathKey::DistDir => Ok(render_path(&ctx.dist_dir())),
          PathKey::SnapshotDocRoot => Ok(render_path(&roots.doc_dir(TaskLocation::Snapshot))),
          PathKey::LocalDocRoot => Ok(render_path(&roots.doc_dir(TaskLocation::Local))),
          PathKey::LocalReportRoot => Ok(render_path(&roots.report_dir())),
        };
        let value = value.map_err(|e| PathInfoError {
          key,
          reason: e.to_string(),
        });
        (key, value)
      })
      .collect();

    Self { entries }
  }

  /// The rendered value of `key`, if it could be resolved.
  pub fn get(&self, key: PathKey) -> Option<&str> {
    self.value(key).ok()
  }

  fn value(&self, key: PathKey) -> Result<&str, PathInfoError> {
    match self.entries.iter().find(|(k, _)| *k == key) {
      Some((_, Ok(value))) => Ok(value.as_str()),
      Some((_, Err(e))) => Err(e.clone()),
      None => Err(PathInfoError {
        key,
        reason: "unknown location".to_string(),
      }),
    }
  }

  /// Render the selected locations, one per line.
  ///
  /// Nothing selected lists everything. Exactly one selected prints the bare
  /// value; otherwise each line is prefixed with `<name>: `. Fails only if a
  /// location that is rendered could not be resolved.
  pub fn render(&self, selected: &[PathKey]) -> Result<String, PathInfoError> {
    if let [only] = selected {
      return Ok(format!("{}\n", self.value(*only)?));
    }

    let mut out = String::new();
    for key in PathKey::ALL {
      if selected.is_empty() || selected.contains(&key) {
        out.push_str(&format!("{}: {}\n", key, self.value(key)?));
      }
    }
    Ok(out)
  }
}

fn render_list(paths: &[PathBuf]) -> Result<String, std::env::JoinPathsError> {
  let rendered: Vec<String> = paths.iter().map(|p| render_path(p)).collect();
  let joined: OsString = std::env::join_paths(rendered.iter().map(Path::new))?;
  Ok(joined.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::context::testutil::context;

  #[test]
  fn every_key_has_a_value() {
    let info = PathInfo::new(&context(), None);
    for key in PathKey::ALL {
      assert!(info.get(key).is_some(), "{key} missing");
    }
  }

  #[test]
  fn nothing_selected_lists_all_with_names() {
    let info = PathInfo::new(&context(), None);
    let rendered = info.render(&[]).unwrap();
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines.len(), PathKey::ALL.len());
    assert!(lines[0].starts_with("project-root: "));
  }

  #[test]
  #[cfg(unix)]
  fn single_selection_prints_bare_value() {
    let info = PathInfo::new(&context(), None);
    assert_eq!(
      info.render(&[PathKey::LocalPkgDb]).unwrap(),
      "/project/.haul-work/install/x86_64-linux/lts-22.7/9.6.4/pkgdb\n"
    );
  }

  #[test]
  #[cfg(unix)]
  fn several_selections_keep_listing_order() {
    let info = PathInfo::new(&context(), None);
    assert_eq!(
      info.render(&[PathKey::ConfigLocation, PathKey::ProjectRoot]).unwrap(),
      "project-root: /project\nconfig-location: /project/haul.yaml\n"
    );
  }

  #[test]
  #[cfg(unix)]
  fn bin_path_puts_install_trees_before_search_path() {
    let info = PathInfo::new(&context(), Some(OsStr::new("/usr/bin:/bin/")));
    assert_eq!(
      info.get(PathKey::BinPath).unwrap(),
      "/project/.haul-work/install/x86_64-linux/lts-22.7/9.6.4/bin:\
       /root/snapshots/x86_64-linux/lts-22.7/9.6.4/bin:\
       /usr/bin:/bin"
    );
  }

  #[test]
  fn values_never_end_with_a_separator() {
    let info = PathInfo::new(&context(), None);
    for key in PathKey::ALL {
      let value = info.get(key).unwrap();
      assert!(!value.ends_with(std::path::MAIN_SEPARATOR), "{key}: {value}");
    }
  }

  #[test]
  #[cfg(unix)]
  fn unrepresentable_list_only_fails_when_rendered() {
    let mut ctx = context();
    ctx.project_root = PathBuf::from("/home/me/a:b");
    let info = PathInfo::new(&ctx, None);

    assert_eq!(info.render(&[PathKey::ProjectRoot]).unwrap(), "/home/me/a:b\n");
    assert_eq!(
      info.render(&[PathKey::ProjectRoot, PathKey::SnapshotPkgDb]).unwrap(),
      "project-root: /home/me/a:b\nsnapshot-pkg-db: /root/snapshots/x86_64-linux/lts-22.7/9.6.4/pkgdb\n"
    );

    let err = info.render(&[PathKey::PackagePath]).unwrap_err();
    assert_eq!(err.key, PathKey::PackagePath);
    assert!(info.get(PathKey::PackagePath).is_none());
    assert!(info.render(&[]).is_err());
  }
}
