//! Constants shared across the crate.

/// Application name, used for directory names under the platform roots.
pub const APP_NAME: &str = "haul";

/// Project file searched for when no `--project` is given.
pub const PROJECT_FILE: &str = "haul.yaml";

/// Manifest file expected at the root of every package directory.
pub const PACKAGE_MANIFEST: &str = "package.yaml";

/// Project-private work directory, relative to the project root.
pub const WORK_DIR: &str = ".haul-work";

/// Environment variable overriding the shared root directory.
pub const ROOT_ENV: &str = "HAUL_ROOT";

/// Environment variable handed to builds listing the package databases.
pub const PACKAGE_PATH_ENV: &str = "HAUL_PACKAGE_PATH";

/// Subdirectory of an install root holding the package database.
pub const PKGDB_DIR: &str = "pkgdb";

/// Subdirectory of an install root holding installed executables.
pub const BIN_DIR: &str = "bin";

/// Subdirectory of an install root holding generated documentation.
pub const DOC_DIR: &str = "doc";

/// Subdirectory of the local install root holding coverage reports.
pub const REPORT_DIR: &str = "hpc";

/// Oldest toolchain library version that understands relaxed bounds.
pub const MIN_ALLOW_NEWER_TOOLCHAIN: &[u32] = &[1, 22];

/// Length of the hex source hash recorded in registrations.
pub const SOURCE_HASH_LEN: usize = 20;

/// Environment variable handed to builds naming their install root.
pub const INSTALL_ROOT_ENV: &str = "HAUL_INSTALL_ROOT";

/// Environment variable handed to builds naming the bin directory to install into.
pub const BIN_DIR_ENV: &str = "HAUL_BIN_DIR";

/// Environment variable handed to builds naming their scratch directory.
pub const DIST_DIR_ENV: &str = "HAUL_DIST_DIR";
