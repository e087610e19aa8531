//! Host platform detection.
//!
//! The platform triple names the per-platform directories of both install
//! trees, so a shared root can serve several machines.

pub mod paths;

use std::fmt;

/// CPU architectures with install trees of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
  X86_64,
  Aarch64,
}

/// Operating systems with install trees of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
  Linux,
  MacOs,
  Windows,
}

impl Arch {
  fn detect() -> Option<Self> {
    match std::env::consts::ARCH {
      "x86_64" => Some(Self::X86_64),
      "aarch64" => Some(Self::Aarch64),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86_64 => "x86_64",
      Self::Aarch64 => "aarch64",
    }
  }
}

impl Os {
  fn detect() -> Option<Self> {
    match std::env::consts::OS {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::MacOs),
      "windows" => Some(Self::Windows),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::MacOs => "osx",
      Self::Windows => "windows",
    }
  }
}

/// Platform identifier combining architecture and OS (e.g., "x86_64-linux")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
  pub arch: Arch,
  pub os: Os,
}

impl Platform {
  pub fn new(arch: Arch, os: Os) -> Self {
    Self { arch, os }
  }

  /// Detect the host platform.
  ///
  /// Returns `None` if the OS or architecture is not supported
  pub fn current() -> Option<Self> {
    Some(Self {
      arch: Arch::detect()?,
      os: Os::detect()?,
    })
  }

  pub fn triple(&self) -> String {
    format!("{}-{}", self.arch.as_str(), self.os.as_str())
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.triple())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn triple_is_arch_dash_os() {
    assert_eq!(Platform::new(Arch::Aarch64, Os::MacOs).triple(), "aarch64-osx");
    assert_eq!(Platform::new(Arch::X86_64, Os::Linux).triple(), "x86_64-linux");
  }

  #[test]
  fn host_is_supported() {
    assert!(Platform::current().is_some(), "host platform should be supported");
  }
}
