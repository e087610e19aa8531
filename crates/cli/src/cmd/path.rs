//! Implementation of the `haul path` command.

use std::path::Path;

use anyhow::Result;
use clap::Args;

use haul_lib::path_info::{PathInfo, PathKey};

use super::load_context;

/// Select locations to print. None selected prints all of them, labelled.
#[derive(Debug, Default, Args)]
pub struct PathArgs {
  /// Project root (directory of the project file)
  #[arg(long)]
  project_root: bool,
  /// Project file location
  #[arg(long)]
  config_location: bool,
  /// Search path with both install trees' bin directories first
  #[arg(long)]
  bin_path: bool,
  /// Snapshot installation root
  #[arg(long)]
  snapshot_install_root: bool,
  /// Local project installation root
  #[arg(long)]
  local_install_root: bool,
  /// Global package database
  #[arg(long)]
  global_pkg_db: bool,
  /// Extra package databases
  #[arg(long)]
  extra_pkg_dbs: bool,
  /// Snapshot package database
  #[arg(long)]
  snapshot_pkg_db: bool,
  /// Local project package database
  #[arg(long)]
  local_pkg_db: bool,
  /// Package database search path handed to builds
  #[arg(long)]
  package_path: bool,
  /// Directory for intermediate build products
  #[arg(long)]
  dist_dir: bool,
  /// Snapshot documentation root
  #[arg(long)]
  snapshot_doc_root: bool,
  /// Local project documentation root
  #[arg(long)]
  local_doc_root: bool,
  /// Local project coverage report root
  #[arg(long)]
  local_report_root: bool,
}

impl PathArgs {
  fn selected(&self) -> Vec<PathKey> {
    let flags = [
      (self.project_root, PathKey::ProjectRoot),
      (self.config_location, PathKey::ConfigLocation),
      (self.bin_path, PathKey::BinPath),
      (self.snapshot_install_root, PathKey::SnapshotInstallRoot),
      (self.local_install_root, PathKey::LocalInstallRoot),
      (self.global_pkg_db, PathKey::GlobalPkgDb),
      (self.extra_pkg_dbs, PathKey::ExtraPkgDbs),
      (self.snapshot_pkg_db, PathKey::SnapshotPkgDb),
      (self.local_pkg_db, PathKey::LocalPkgDb),
      (self.package_path, PathKey::PackagePath),
      (self.dist_dir, PathKey::DistDir),
      (self.snapshot_doc_root, PathKey::SnapshotDocRoot),
      (self.local_doc_root, PathKey::LocalDocRoot),
      (self.local_report_root, PathKey::LocalReportRoot),
    ];
    flags.into_iter().filter(|(on, _)| *on).map(|(_, key)| key).collect()
  }
}

pub fn cmd_path(project: Option<&Path>, args: &PathArgs) -> Result<()> {
  let (_, ctx) = load_context(project)?;
  let search_path = std::env::var_os("PATH");
  let info = PathInfo::new(&ctx, search_path.as_deref());
  print!("{}", info.render(&args.selected())?);
  Ok(())
}
