//! Executable name collisions.
//!
//! Every installed executable lands in a shared `bin` directory, so two
//! packages building an executable with the same name overwrite each other.
//! Collisions are allowed; they are only surfaced as warnings.

use std::collections::BTreeMap;

use crate::package::LocalPackage;
use crate::plan::{Plan, TaskType};
use crate::types::{ExeName, PackageName};

/// Packages involved in one executable name collision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
  /// Packages building the executable in this run. Never empty.
  pub building: Vec<PackageName>,
  /// Other project packages declaring the same executable.
  pub shadowed: Vec<PackageName>,
}

impl Collision {
  /// Human-readable warning for this collision.
  pub fn message(&self, exe: &ExeName) -> String {
    let several = self.building.len() > 1;
    let kind = if several {
      "several executables with the same name:"
    } else {
      "executable"
    };

    let mut lines = vec![format!("Building {} {}.", kind, exes_text(&self.building, exe))];
    if several {
      lines.push("Only one of them will be available on the bin path or locally installed.".to_string());
    }
    if !self.shadowed.is_empty() {
      lines.push(format!(
        "Other executables with the same name might be overwritten: {}.",
        exes_text(&self.shadowed, exe)
      ));
    }
    lines.join("\n")
  }
}

fn exes_text(packages: &[PackageName], exe: &ExeName) -> String {
  packages
    .iter()
    .map(|p| format!("'{}:{}'", p, exe))
    .collect::<Vec<_>>()
    .join(", ")
}

/// Find executable names built more than once, or shadowing another project
/// package's executable.
pub fn detect_collisions(targets: &Plan, locals: &[LocalPackage]) -> BTreeMap<ExeName, Collision> {
  let exes_to_build = group_by_exe(targets.tasks().flat_map(|task| match &task.task_type {
    TaskType::FilePath { package, .. } => package
      .exes
      .iter()
      .map(|exe| (exe.clone(), package.name().clone()))
      .collect::<Vec<_>>(),
    TaskType::Immutable { .. } => Vec::new(),
  }));

  let local_exes = group_by_exe(
    locals
      .iter()
      .flat_map(|lp| lp.exes.iter().map(|exe| (exe.clone(), lp.name().clone()))),
  );

  let mut collisions = BTreeMap::new();
  for (exe, building) in exes_to_build {
    let Some(owners) = local_exes.get(&exe) else {
      continue;
    };

    let shadowed: Vec<PackageName> = owners.iter().filter(|p| !building.contains(p)).cloned().collect();

    if building.len() > 1 || !shadowed.is_empty() {
      collisions.insert(exe, Collision { building, shadowed });
    }
  }

  collisions
}

/// Sort `(exe, package)` pairs and group them by executable in one pass.
///
/// Package lists come out sorted and deduplicated, so the grouping does not
/// depend on input order.
fn group_by_exe(pairs: impl Iterator<Item = (ExeName, PackageName)>) -> BTreeMap<ExeName, Vec<PackageName>> {
  let mut pairs: Vec<(ExeName, PackageName)> = pairs.collect();
  pairs.sort();
  pairs.dedup();

  let mut groups: Vec<(ExeName, Vec<PackageName>)> = Vec::new();
  for (exe, package) in pairs {
    match groups.last_mut() {
      Some((last, packages)) if *last == exe => packages.push(package),
      _ => groups.push((exe, vec![package])),
    }
  }

  groups.into_iter().collect()
}
