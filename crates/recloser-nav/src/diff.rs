//! Structural comparison of two firmware service trees.
//!
//! Each firmware is first reduced to a [`Snapshot`]: service key → display name,
//! feature key set and child snapshot. [`compare_snapshots`] then walks both
//! snapshots level by level. Output order is fixed: keys of the first snapshot
//! ascending (removed or modified), then keys only in the second ascending
//! (added).

use crate::tree::ServiceArena;
use recloser_core::CatalogStore;
use recloser_core::error::Result;
use recloser_core::model::FirmwareId;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Per-level image of a firmware tree keyed by service key.
pub type Snapshot = BTreeMap<String, SnapshotNode>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotNode {
    pub display_name: String,
    /// Description keys of the service's features.
    pub features: BTreeSet<String>,
    pub children: Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DifferenceKind {
    Added,
    Removed,
    Modified,
    Unchanged,
}

impl DifferenceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DifferenceKind::Added => "ADDED",
            DifferenceKind::Removed => "REMOVED",
            DifferenceKind::Modified => "MODIFIED",
            DifferenceKind::Unchanged => "UNCHANGED",
        }
    }
}

impl fmt::Display for DifferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDiff {
    pub feature_key: String,
    pub kind: DifferenceKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDiff {
    pub service_key: String,
    pub display_name: String,
    pub kind: DifferenceKind,
    pub feature_differences: Vec<FeatureDiff>,
    pub child_differences: Vec<ServiceDiff>,
}

/// Node counts for one comparison level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

impl DiffSummary {
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.modified == 0
    }
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} service(s) added, {} service(s) removed, {} service(s) modified",
            self.added, self.removed, self.modified
        )
    }
}

/// Result of comparing one pair of snapshot levels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelDiff {
    pub summary: DiffSummary,
    pub differences: Vec<ServiceDiff>,
}

/// Comparison of two firmware trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDiff {
    pub firmware_a: FirmwareId,
    pub firmware_b: FirmwareId,
    pub language_code: String,
    /// Counts of the top level only; nested changes surface as one MODIFIED parent.
    pub summary: DiffSummary,
    pub differences: Vec<ServiceDiff>,
}

/// Reduce one firmware to a snapshot, resolving display names in `language_code`.
pub fn snapshot<S: CatalogStore + ?Sized>(
    store: &S,
    firmware: FirmwareId,
    language_code: &str,
) -> Result<Snapshot> {
    let arena = ServiceArena::load(store, firmware)?;
    snapshot_level(store, &arena, arena.roots(), language_code)
}

fn snapshot_level<S: CatalogStore + ?Sized>(
    store: &S,
    arena: &ServiceArena,
    indices: &[usize],
    language_code: &str,
) -> Result<Snapshot> {
    let mut level = Snapshot::new();
    for &idx in indices {
        let node = arena.node(idx);
        let service = &node.service;
        match level.entry(service.service_key.clone()) {
            Entry::Occupied(_) => {
                tracing::warn!(
                    "duplicate service key '{}' (service {}) in firmware {}; keeping the first",
                    service.service_key,
                    service.id,
                    service.firmware_id
                );
            }
            Entry::Vacant(slot) => {
                let features = store
                    .features_by(service.id)?
                    .into_iter()
                    .map(|f| f.description_key)
                    .collect();
                slot.insert(SnapshotNode {
                    display_name: store.translation_for(&service.description_key, language_code)?,
                    features,
                    children: snapshot_level(store, arena, &node.children, language_code)?,
                });
            }
        }
    }
    Ok(level)
}

/// Compare two snapshot levels. Unchanged nodes are never emitted.
pub fn compare_snapshots(a: &Snapshot, b: &Snapshot) -> LevelDiff {
    let mut out = LevelDiff::default();

    for (key, node_a) in a {
        match b.get(key) {
            None => {
                out.summary.removed += 1;
                out.differences.push(whole_node(key, node_a, DifferenceKind::Removed));
            }
            Some(node_b) => {
                let feature_differences = compare_features(&node_a.features, &node_b.features);
                let children = compare_snapshots(&node_a.children, &node_b.children);
                if feature_differences.is_empty() && children.differences.is_empty() {
                    continue;
                }
                out.summary.modified += 1;
                out.differences.push(ServiceDiff {
                    service_key: key.clone(),
                    display_name: node_a.display_name.clone(),
                    kind: DifferenceKind::Modified,
                    feature_differences,
                    child_differences: children.differences,
                });
            }
        }
    }

    for (key, node_b) in b {
        if !a.contains_key(key) {
            out.summary.added += 1;
            out.differences.push(whole_node(key, node_b, DifferenceKind::Added));
        }
    }

    out
}

/// A node present on one side only: every feature carries the node's kind.
fn whole_node(key: &str, node: &SnapshotNode, kind: DifferenceKind) -> ServiceDiff {
    ServiceDiff {
        service_key: key.to_string(),
        display_name: node.display_name.clone(),
        kind,
        feature_differences: node
            .features
            .iter()
            .map(|f| FeatureDiff {
                feature_key: f.clone(),
                kind,
            })
            .collect(),
        child_differences: Vec::new(),
    }
}

fn compare_features(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Vec<FeatureDiff> {
    let removed = a.difference(b).map(|f| FeatureDiff {
        feature_key: f.clone(),
        kind: DifferenceKind::Removed,
    });
    let added = b.difference(a).map(|f| FeatureDiff {
        feature_key: f.clone(),
        kind: DifferenceKind::Added,
    });
    removed.chain(added).collect()
}

/// Compare the service trees of two firmwares.
pub fn diff_trees<S: CatalogStore + ?Sized>(
    store: &S,
    firmware_a: FirmwareId,
    firmware_b: FirmwareId,
    language_code: &str,
) -> Result<TreeDiff> {
    tracing::debug!(
        "comparing firmware {} with {} ({})",
        firmware_a,
        firmware_b,
        language_code
    );
    let a = snapshot(store, firmware_a, language_code)?;
    let b = snapshot(store, firmware_b, language_code)?;
    let LevelDiff {
        summary,
        differences,
    } = compare_snapshots(&a, &b);
    Ok(TreeDiff {
        firmware_a,
        firmware_b,
        language_code: language_code.to_string(),
        summary,
        differences,
    })
}
