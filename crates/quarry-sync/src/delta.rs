//! Reconciliation of remote units against the committed inventory.
//!
//! Identity is the package key plus the archive checksum. A key whose
//! checksum changed upstream is replaced in both modes, since a key is
//! unique within a repository version. A local unit that was only indexed
//! (on-demand) is replaced by an immediate remote unit so its artifacts get
//! downloaded.

use std::collections::{HashMap, HashSet};

use quarry_core::PackageKey;
use quarry_store::{ContentUnit, Inventory};

use crate::content::DeclarativeContent;

#[derive(Debug, Clone, Default)]
pub struct ContentDelta {
    /// Remote units not present locally
    pub to_add: Vec<DeclarativeContent>,
    /// Local units to drop from the next version
    pub to_remove: Vec<PackageKey>,
}

fn local_identity(unit: &ContentUnit) -> (PackageKey, String) {
    (unit.key(), unit.record.checksum.to_ascii_lowercase())
}

impl ContentDelta {
    /// Diff `remote` against `inventory`.
    ///
    /// In mirror mode local units absent from `remote` are removed, except
    /// those named in `unlisted`: names whose remote state is unknown for this
    /// run. Otherwise only additions (and replacements) are produced.
    pub fn compute(
        remote: Vec<DeclarativeContent>,
        inventory: &Inventory,
        mirror: bool,
        unlisted: &HashSet<String>,
    ) -> Self {
        let local: HashMap<(PackageKey, String), bool> = inventory
            .units
            .iter()
            .map(|unit| (local_identity(unit), unit.is_stored()))
            .collect();
        let upstream: HashSet<(PackageKey, String)> =
            remote.iter().map(DeclarativeContent::identity).collect();

        let mut queued = HashSet::new();
        let mut to_add = Vec::new();
        for unit in remote {
            let identity = unit.identity();
            let satisfied = match local.get(&identity) {
                Some(&stored) => stored || unit.deferred,
                None => false,
            };
            if satisfied || !queued.insert(identity) {
                continue;
            }
            to_add.push(unit);
        }

        let replaced: HashSet<PackageKey> = to_add.iter().map(DeclarativeContent::key).collect();
        let to_remove = inventory
            .units
            .iter()
            .filter(|unit| {
                let identity = local_identity(unit);
                if replaced.contains(&identity.0) {
                    return true;
                }
                mirror && !unlisted.contains(&unit.record.name) && !upstream.contains(&identity)
            })
            .map(ContentUnit::key)
            .collect();

        Self { to_add, to_remove }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Local units that survive into the next version
    pub fn retained(&self, inventory: &Inventory) -> Vec<ContentUnit> {
        let removed: HashSet<&PackageKey> = self.to_remove.iter().collect();
        inventory
            .units
            .iter()
            .filter(|unit| !removed.contains(&unit.key()))
            .cloned()
            .collect()
    }
}
