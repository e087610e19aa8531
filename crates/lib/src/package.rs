//! Loaded packages.
//!
//! A [`Package`] is what the planner and executor need to know about any
//! package. A [`LocalPackage`] wraps one with the project-side facts: where it
//! lives, which files it owns, and which of its components can be built.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::types::{ComponentName, ExeName, PackageIdentifier, PackageName};

/// A loaded package description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
  pub ident: PackageIdentifier,
  /// Names of the packages this one depends on.
  pub depends: BTreeSet<PackageName>,
  /// Executables that can actually be built.
  pub exes: BTreeSet<ExeName>,
  /// Shell command that builds the package, if any.
  pub build: Option<String>,
}

impl Package {
  pub fn name(&self) -> &PackageName {
    &self.ident.name
  }
}

/// A package that is part of the project under build.
///
/// Created when the project's package set is loaded and not modified for the
/// rest of the invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPackage {
  pub package: Package,
  /// Root directory of the package checkout.
  pub dir: PathBuf,
  /// Every file the package comprises, for change watching.
  pub files: BTreeSet<PathBuf>,
  /// Every declared component, buildable or not.
  pub components: BTreeSet<ComponentName>,
  /// Declared components that cannot be built on this configuration.
  pub unbuildable: BTreeSet<ComponentName>,
  /// Every declared executable, buildable or not.
  pub exes: BTreeSet<ExeName>,
  /// Hash over the contents of `files`.
  pub source_hash: String,
}

impl LocalPackage {
  pub fn name(&self) -> &PackageName {
    self.package.name()
  }

  pub fn ident(&self) -> &PackageIdentifier {
    &self.package.ident
  }
}
