//! Platform directories.
//!
//! The shared root holds every snapshot install tree and is shared by all
//! projects of a user. It defaults to the XDG data directory and can be moved
//! with `HAUL_ROOT`.

use std::path::PathBuf;

use crate::consts::{APP_NAME, ROOT_ENV};

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  std::env::var_os("USERPROFILE")
    .map(PathBuf::from)
    .unwrap_or_else(std::env::temp_dir)
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(std::env::temp_dir)
}

/// Returns the directory for data files for the application
#[cfg(windows)]
pub fn data_dir() -> PathBuf {
  std::env::var_os("APPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|| home_dir().join("AppData").join("Roaming"))
    .join(APP_NAME)
}

/// Returns the directory for data files for the application
#[cfg(not(windows))]
pub fn data_dir() -> PathBuf {
  let data_home = std::env::var("XDG_DATA_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".local").join("share"));
  data_home.join(APP_NAME)
}

/// Returns the shared root directory.
///
/// `HAUL_ROOT` wins over the platform data directory.
pub fn root_dir() -> PathBuf {
  if let Some(root) = std::env::var_os(ROOT_ENV) {
    return PathBuf::from(root);
  }
  data_dir()
}

/// Directory holding snapshot install trees, one per platform/snapshot/compiler.
pub fn snapshots_dir() -> PathBuf {
  root_dir().join("snapshots")
}
