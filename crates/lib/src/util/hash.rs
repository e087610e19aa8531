//! Hashing of package sources.
//!
//! A package's source hash covers the relative path and contents of every
//! file under its directory, so a registration made from the same sources can
//! be recognised on the next run.

use std::collections::BTreeSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use walkdir::WalkDir;

use crate::consts::SOURCE_HASH_LEN;

#[derive(Debug, Error)]
pub enum HashError {
  #[error("failed to walk {}: {message}", path.display())]
  WalkDir { path: PathBuf, message: String },

  #[error("failed to read file {}: {source}", path.display())]
  ReadFile {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// The files of a package directory and their combined hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSnapshot {
  pub files: BTreeSet<PathBuf>,
  /// Truncated hex SHA-256.
  pub hash: String,
}

/// Walk `dir` and hash every regular file, skipping entries named in `exclude`.
///
/// Entries are visited in file name order, so the hash only changes when a
/// path or a file's contents change.
pub fn hash_sources(dir: &Path, exclude: &[&str]) -> Result<SourceSnapshot, HashError> {
  let walker = WalkDir::new(dir)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(|e| e.file_name().to_str().is_none_or(|name| !exclude.contains(&name)));

  let mut files = BTreeSet::new();
  let mut hasher = Sha256::new();

  for entry in walker {
    let entry = entry.map_err(|e| HashError::WalkDir {
      path: dir.to_path_buf(),
      message: e.to_string(),
    })?;
    if !entry.file_type().is_file() {
      continue;
    }

    let path = entry.path();
    let rel = path.strip_prefix(dir).unwrap_or(path);
    hasher.update(format!("F:{}:{}\n", rel.to_string_lossy(), hash_file(path)?).as_bytes());
    files.insert(path.to_path_buf());
  }

  let full = hex::encode(hasher.finalize());
  Ok(SourceSnapshot {
    files,
    hash: full[..SOURCE_HASH_LEN].to_string(),
  })
}

/// Full hex SHA-256 of a file's contents.
pub fn hash_file(path: &Path) -> Result<String, HashError> {
  let read_error = |source: std::io::Error| HashError::ReadFile {
    path: path.to_path_buf(),
    source,
  };

  let mut file = fs::File::open(path).map_err(read_error)?;
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(read_error)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(hex::encode(hasher.finalize()))
}
