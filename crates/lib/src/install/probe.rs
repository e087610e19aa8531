//! Installed package discovery across database tiers.

use tracing::{debug, trace};

use crate::pipeline::{BoxError, InstalledOptions, InstalledProber, Probed};
use crate::plan::{InstallMap, TaskLocation};
use crate::tiers::{DatabaseTier, DatabaseTierSet};

use super::dump::{DumpError, DumpPackage, read_db};

/// Reads registrations from every tier of a [`DatabaseTierSet`].
#[derive(Debug, Clone)]
pub struct DbProber {
  tiers: DatabaseTierSet,
}

impl DbProber {
  pub fn new(tiers: DatabaseTierSet) -> Self {
    Self { tiers }
  }

  /// Probe every tier, front to back, so later tiers shadow earlier ones.
  pub fn probe_tiers(&self, options: InstalledOptions, install_map: &InstallMap) -> Result<Probed, DumpError> {
    let mut probed = Probed::default();

    for tier in self.tiers.ordered() {
      let location = tier_location(tier.tier);

      for dump in read_db(&tier.path)? {
        if !satisfies(&dump, options) {
          trace!(package = %dump.ident(), tier = %tier.tier, "registration lacks wanted artifacts");
          continue;
        }

        if is_wanted(&dump, tier.tier, install_map) {
          probed
            .installed
            .insert(dump.name.clone(), (location, dump.version.clone()));
        }

        match tier.tier {
          DatabaseTier::Global | DatabaseTier::Extra => probed.global_dumps.push(dump),
          DatabaseTier::Snapshot => probed.snapshot_dumps.push(dump),
          DatabaseTier::Local => probed.local_dumps.push(dump),
        }
      }
    }

    debug!(installed = probed.installed.len(), "probed package databases");
    Ok(probed)
  }
}

impl InstalledProber for DbProber {
  fn probe(&self, options: InstalledOptions, install_map: &InstallMap) -> Result<Probed, BoxError> {
    Ok(self.probe_tiers(options, install_map)?)
  }
}

/// Read-only tiers count as the snapshot location.
fn tier_location(tier: DatabaseTier) -> TaskLocation {
  match tier {
    DatabaseTier::Local => TaskLocation::Local,
    DatabaseTier::Global | DatabaseTier::Extra | DatabaseTier::Snapshot => TaskLocation::Snapshot,
  }
}

fn satisfies(dump: &DumpPackage, options: InstalledOptions) -> bool {
  (!options.want_profiling || dump.profiling)
    && (!options.want_haddock || dump.haddock)
    && (!options.want_symbols || dump.symbols)
}

/// A registration counts as installed when the build expects that exact
/// version in that location. Read-only tiers also provide packages the
/// build does not mention at all.
fn is_wanted(dump: &DumpPackage, tier: DatabaseTier, install_map: &InstallMap) -> bool {
  match install_map.get(&dump.name) {
    Some((location, version)) => {
      *version == dump.version && (!tier.is_writable() || *location == tier_location(tier))
    }
    None => !tier.is_writable(),
  }
}

#[cfg(test)]
mod tests {
  use std::path::Path;

  use tempfile::TempDir;

  use super::*;
  use crate::install::dump::write_registration;
  use crate::types::{PackageName, Version};

  struct Dbs {
    _temp: TempDir,
    tiers: DatabaseTierSet,
  }

  fn dbs() -> Dbs {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let tiers = DatabaseTierSet {
      global: root.join("global"),
      extra: vec![root.join("extra")],
      snapshot: root.join("snapshot"),
      local: root.join("local"),
    };
    Dbs { _temp: temp, tiers }
  }

  fn register(db: &Path, name: &str, version: &str, profiling: bool) {
    write_registration(
      db,
      &DumpPackage {
        name: PackageName::new(name),
        version: version.parse().unwrap(),
        profiling,
        haddock: false,
        symbols: false,
        source_hash: None,
      },
    )
    .unwrap();
  }

  fn expect(map: &mut InstallMap, name: &str, location: TaskLocation, version: &str) {
    map.insert(PackageName::new(name), (location, version.parse().unwrap()));
  }

  fn installed(probed: &Probed, name: &str) -> Option<(TaskLocation, Version)> {
    probed.installed.get(&PackageName::new(name)).cloned()
  }

  #[test]
  fn classifies_dumps_by_tier() {
    let dbs = dbs();
    register(&dbs.tiers.global, "base", "4.18", false);
    register(&dbs.tiers.extra[0], "vendored", "1.0", false);
    register(&dbs.tiers.snapshot, "text", "2.0", false);
    register(&dbs.tiers.local, "my-app", "0.1", false);

    let mut map = InstallMap::new();
    expect(&mut map, "text", TaskLocation::Snapshot, "2.0");
    expect(&mut map, "my-app", TaskLocation::Local, "0.1");

    let probed = DbProber::new(dbs.tiers.clone())
      .probe_tiers(InstalledOptions::default(), &map)
      .unwrap();

    assert_eq!(probed.global_dumps.len(), 2);
    assert_eq!(probed.snapshot_dumps.len(), 1);
    assert_eq!(probed.local_dumps.len(), 1);
    assert_eq!(installed(&probed, "base").unwrap().0, TaskLocation::Snapshot);
    assert_eq!(installed(&probed, "vendored").unwrap().0, TaskLocation::Snapshot);
    assert_eq!(installed(&probed, "text").unwrap().0, TaskLocation::Snapshot);
    assert_eq!(installed(&probed, "my-app").unwrap().0, TaskLocation::Local);
  }

  #[test]
  fn later_tiers_shadow_earlier_ones() {
    let dbs = dbs();
    register(&dbs.tiers.global, "text", "1.0", false);
    register(&dbs.tiers.local, "text", "2.0", false);

    let mut map = InstallMap::new();
    expect(&mut map, "text", TaskLocation::Local, "2.0");

    let probed = DbProber::new(dbs.tiers.clone())
      .probe_tiers(InstalledOptions::default(), &map)
      .unwrap();
    assert_eq!(
      installed(&probed, "text"),
      Some((TaskLocation::Local, "2.0".parse().unwrap()))
    );
  }

  #[test]
  fn wrong_version_or_location_is_not_installed() {
    let dbs = dbs();
    register(&dbs.tiers.snapshot, "text", "1.0", false);
    register(&dbs.tiers.local, "aeson", "2.2", false);

    let mut map = InstallMap::new();
    expect(&mut map, "text", TaskLocation::Snapshot, "2.0");
    expect(&mut map, "aeson", TaskLocation::Snapshot, "2.2");

    let probed = DbProber::new(dbs.tiers.clone())
      .probe_tiers(InstalledOptions::default(), &map)
      .unwrap();
    assert!(probed.installed.is_empty());
    assert_eq!(probed.snapshot_dumps.len(), 1);
  }

  #[test]
  fn unwanted_writable_registrations_are_ignored() {
    let dbs = dbs();
    register(&dbs.tiers.snapshot, "stale", "1.0", false);

    let probed = DbProber::new(dbs.tiers.clone())
      .probe_tiers(InstalledOptions::default(), &InstallMap::new())
      .unwrap();
    assert!(probed.installed.is_empty());
  }

  #[test]
  fn profiling_builds_need_profiling_registrations() {
    let dbs = dbs();
    register(&dbs.tiers.snapshot, "text", "2.0", false);
    register(&dbs.tiers.snapshot, "aeson", "2.2", true);

    let mut map = InstallMap::new();
    expect(&mut map, "text", TaskLocation::Snapshot, "2.0");
    expect(&mut map, "aeson", TaskLocation::Snapshot, "2.2");

    let options = InstalledOptions {
      want_profiling: true,
      ..Default::default()
    };
    let probed = DbProber::new(dbs.tiers.clone()).probe_tiers(options, &map).unwrap();
    assert!(installed(&probed, "text").is_none());
    assert!(installed(&probed, "aeson").is_some());
  }
}
