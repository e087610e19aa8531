//! Package identity types.
//!
//! These are the small value types everything else keys on: package names,
//! versions, identifiers, executable and component names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of a package, e.g. `text` or `my-app`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(pub String);

impl PackageName {
  pub fn new(name: impl Into<String>) -> Self {
    Self(name.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for PackageName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Name of an executable component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExeName(pub String);

impl ExeName {
  pub fn new(name: impl Into<String>) -> Self {
    Self(name.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ExeName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version '{0}': expected dot-separated non-negative integers")]
pub struct VersionParseError(pub String);

/// A package version: dot-separated non-negative integers, compared component-wise.
///
/// `1.2` sorts before `1.2.0`, which sorts before `1.10`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(Vec<u32>);

impl Version {
  pub fn new(components: impl Into<Vec<u32>>) -> Self {
    Self(components.into())
  }

  pub fn components(&self) -> &[u32] {
    &self.0
  }
}

impl FromStr for Version {
  type Err = VersionParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let components = s
      .split('.')
      .map(|part| {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
          return Err(VersionParseError(s.to_string()));
        }
        part.parse::<u32>().map_err(|_| VersionParseError(s.to_string()))
      })
      .collect::<Result<Vec<_>, _>>()?;
    Ok(Self(components))
  }
}

impl TryFrom<String> for Version {
  type Error = VersionParseError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<Version> for String {
  fn from(value: Version) -> Self {
    value.to_string()
  }
}

impl fmt::Display for Version {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for component in &self.0 {
      if !first {
        f.write_str(".")?;
      }
      write!(f, "{}", component)?;
      first = false;
    }
    Ok(())
  }
}

/// A package name paired with a version. Unique per resolved package.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PackageIdentifier {
  pub name: PackageName,
  pub version: Version,
}

impl PackageIdentifier {
  pub fn new(name: PackageName, version: Version) -> Self {
    Self { name, version }
  }
}

impl fmt::Display for PackageIdentifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.name, self.version)
  }
}

/// A named component of a package.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComponentName {
  Library,
  Executable(ExeName),
  Test(String),
  Benchmark(String),
}

impl fmt::Display for ComponentName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ComponentName::Library => f.write_str("lib"),
      ComponentName::Executable(name) => write!(f, "exe:{}", name),
      ComponentName::Test(name) => write!(f, "test:{}", name),
      ComponentName::Benchmark(name) => write!(f, "bench:{}", name),
    }
  }
}
