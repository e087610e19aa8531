//! Advisory lock guarding the shared snapshot install tree.
//!
//! One exclusive `flock` (or `LockFileEx` on Windows) per snapshot install
//! root. The caller acquires it before running the build pipeline; the
//! pipeline may hand it back early through [`ReleaseLock`]. Whatever happens,
//! dropping the [`SnapshotLock`] releases it.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const LOCK_FILENAME: &str = ".lock";

/// Something that can give up the snapshot lock before it is dropped.
pub trait ReleaseLock {
  /// Release the lock. Calling it again after success is a no-op.
  fn release(&mut self) -> io::Result<()>;
}

/// Written into the lock file by the holder, read back on contention.
#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
  pub version: u32,
  pub pid: u32,
  pub started_at_unix: u64,
  pub command: String,
  pub install_root: PathBuf,
}

#[derive(Debug, Error)]
pub enum SnapshotLockError {
  #[error(
    "Snapshot is locked by another process: {command} (PID {pid}, started {started_at})\n\
             If you're sure no haul process is running, remove the lock file:\n  {}",
    lock_path.display()
  )]
  Contention {
    command: String,
    pid: u32,
    started_at: String,
    lock_path: PathBuf,
  },

  #[error(
    "Snapshot is locked (could not read lock metadata)\n\
             If you're sure no haul process is running, remove the lock file:\n  {}",
    lock_path.display()
  )]
  ContentionUnknown { lock_path: PathBuf },

  #[error("Failed to create snapshot install root: {0}")]
  CreateDir(#[source] io::Error),

  #[error("Failed to open lock file: {0}")]
  OpenFile(#[source] io::Error),

  #[error("Failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),

  #[error("Failed to acquire lock: {0}")]
  LockFailed(#[source] io::Error),
}

/// An exclusive lock on one snapshot install root.
pub struct SnapshotLock {
  file: Option<File>,
  lock_path: PathBuf,
}

impl SnapshotLock {
  /// Take the lock without waiting.
  ///
  /// Fails with [`SnapshotLockError::Contention`] naming the holder when
  /// another process has it.
  pub fn acquire(install_root: &Path, command: &str) -> Result<Self, SnapshotLockError> {
    let lock_path = install_root.join(LOCK_FILENAME);

    std::fs::create_dir_all(install_root).map_err(SnapshotLockError::CreateDir)?;

    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(&lock_path)
      .map_err(SnapshotLockError::OpenFile)?;

    if let Err(err) = try_lock(&file) {
      if err.kind() == io::ErrorKind::WouldBlock {
        return Err(Self::read_contention_error(&lock_path));
      }
      return Err(SnapshotLockError::LockFailed(err));
    }

    Self::write_metadata(&file, command, install_root)?;
    debug!(path = %lock_path.display(), "acquired snapshot lock");

    Ok(SnapshotLock {
      file: Some(file),
      lock_path,
    })
  }

  /// Reads the lock metadata through the held handle.
  ///
  /// Opening a second handle would fail on Windows, where locks are mandatory.
  pub fn read_metadata(&self) -> io::Result<LockMetadata> {
    use std::io::{Seek, SeekFrom};

    let Some(mut file) = self.file.as_ref() else {
      return Err(io::Error::other("lock already released"));
    };
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }

  pub fn is_held(&self) -> bool {
    self.file.is_some()
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }

  fn write_metadata(file: &File, command: &str, install_root: &Path) -> Result<(), SnapshotLockError> {
    let metadata = LockMetadata {
      version: 1,
      pid: std::process::id(),
      started_at_unix: SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs(),
      command: command.to_string(),
      install_root: install_root.to_path_buf(),
    };

    file.set_len(0).map_err(SnapshotLockError::WriteMetadata)?;
    let mut writer = io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &metadata)
      .map_err(|e| SnapshotLockError::WriteMetadata(io::Error::other(e)))?;
    writer.flush().map_err(SnapshotLockError::WriteMetadata)?;

    Ok(())
  }

  fn read_contention_error(lock_path: &Path) -> SnapshotLockError {
    if let Ok(mut file) = File::open(lock_path) {
      let mut contents = String::new();
      if file.read_to_string(&mut contents).is_ok()
        && let Ok(metadata) = serde_json::from_str::<LockMetadata>(&contents)
      {
        return SnapshotLockError::Contention {
          command: metadata.command,
          pid: metadata.pid,
          started_at: format!("Unix timestamp {}", metadata.started_at_unix),
          lock_path: lock_path.to_path_buf(),
        };
      }
    }

    SnapshotLockError::ContentionUnknown {
      lock_path: lock_path.to_path_buf(),
    }
  }
}

impl ReleaseLock for SnapshotLock {
  fn release(&mut self) -> io::Result<()> {
    let Some(file) = self.file.take() else {
      return Ok(());
    };
    unlock(&file)?;
    debug!(path = %self.lock_path.display(), "released snapshot lock");
    Ok(())
  }
}

#[cfg(unix)]
fn try_lock(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::NonBlockingLockExclusive)
    .map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(unix)]
fn unlock(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::Unlock).map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn try_lock(file: &File) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::HANDLE;
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;

  // SAFETY: OVERLAPPED is a plain data struct that is valid when zero-initialized,
  // and the handle stays open for the duration of the call.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(
      handle,
      LOCKFILE_FAIL_IMMEDIATELY | LOCKFILE_EXCLUSIVE_LOCK,
      0,
      1,
      0,
      &mut overlapped,
    )
  };

  if result == 0 {
    Err(io::Error::last_os_error())
  } else {
    Ok(())
  }
}

#[cfg(windows)]
fn unlock(file: &File) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::HANDLE;
  use windows_sys::Win32::Storage::FileSystem::UnlockFileEx;

  let handle = file.as_raw_handle() as HANDLE;

  // SAFETY: same invariants as in `try_lock`.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    UnlockFileEx(handle, 0, 1, 0, &mut overlapped)
  };

  if result == 0 {
    Err(io::Error::last_os_error())
  } else {
    Ok(())
  }
}
