//! Package registrations inside a package database.
//!
//! A database is a directory of `<name>-<version>.yaml` files, one per
//! installed package:
//!
//! ```yaml
//! name: text
//! version: 2.0.2
//! profiling: false
//! haddock: false
//! symbols: false
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::types::{PackageIdentifier, PackageName, Version};

#[derive(Debug, Error)]
pub enum DumpError {
  #[error("failed to read package database {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("invalid registration {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("failed to write registration {}: {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to serialize registration for {ident}: {source}")]
  Serialize {
    ident: PackageIdentifier,
    #[source]
    source: serde_yaml::Error,
  },
}

/// One installed package as recorded in a database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DumpPackage {
  pub name: PackageName,
  pub version: Version,
  #[serde(default)]
  pub profiling: bool,
  #[serde(default)]
  pub haddock: bool,
  #[serde(default)]
  pub symbols: bool,
  /// Hash of the sources a local package was built from.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_hash: Option<String>,
}

impl DumpPackage {
  pub fn ident(&self) -> PackageIdentifier {
    PackageIdentifier::new(self.name.clone(), self.version.clone())
  }
}

/// Path of the registration for `ident` inside `db`.
pub fn registration_path(db: &Path, ident: &PackageIdentifier) -> PathBuf {
  db.join(format!("{}.yaml", ident))
}

/// Read every registration in `db`, sorted by identifier.
///
/// A missing database is empty, not an error.
pub fn read_db(db: &Path) -> Result<Vec<DumpPackage>, DumpError> {
  let entries = match fs::read_dir(db) {
    Ok(entries) => entries,
    Err(e) if e.kind() == io::ErrorKind::NotFound => {
      trace!(db = %db.display(), "package database does not exist");
      return Ok(Vec::new());
    }
    Err(source) => {
      return Err(DumpError::Read {
        path: db.to_path_buf(),
        source,
      });
    }
  };

  let mut dumps = Vec::new();
  for entry in entries {
    let path = entry
      .map_err(|source| DumpError::Read {
        path: db.to_path_buf(),
        source,
      })?
      .path();
    if path.extension().is_none_or(|ext| ext != "yaml") {
      continue;
    }

    let content = fs::read_to_string(&path).map_err(|source| DumpError::Read {
      path: path.clone(),
      source,
    })?;
    let dump: DumpPackage = serde_yaml::from_str(&content).map_err(|source| DumpError::Parse {
      path: path.clone(),
      source,
    })?;
    dumps.push(dump);
  }

  dumps.sort_by_key(DumpPackage::ident);
  debug!(db = %db.display(), count = dumps.len(), "read package database");
  Ok(dumps)
}

/// Write `dump` into `db`, creating the database if needed.
pub fn write_registration(db: &Path, dump: &DumpPackage) -> Result<PathBuf, DumpError> {
  let path = registration_path(db, &dump.ident());
  let content = serde_yaml::to_string(dump).map_err(|source| DumpError::Serialize {
    ident: dump.ident(),
    source,
  })?;

  fs::create_dir_all(db)
    .and_then(|()| fs::write(&path, content))
    .map_err(|source| DumpError::Write {
      path: path.clone(),
      source,
    })?;

  debug!(path = %path.display(), "wrote registration");
  Ok(path)
}
