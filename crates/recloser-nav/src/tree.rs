//! Firmware-scoped service tree materialization.
//!
//! The store hands back one level at a time; [`ServiceArena`] walks those levels
//! depth-first into a flat vector with child index lists, refusing to visit any
//! service twice. Nested results are built from the arena afterwards.

use recloser_core::CatalogStore;
use recloser_core::error::{CatalogError, Result};
use recloser_core::model::{FeatureId, FirmwareId, Service, ServiceId, Translation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One service in an arena plus the arena indices of its children.
#[derive(Debug, Clone)]
pub struct ArenaNode {
    pub service: Service,
    pub children: Vec<usize>,
}

/// Flat, acyclic image of a service forest.
#[derive(Debug, Clone, Default)]
pub struct ServiceArena {
    nodes: Vec<ArenaNode>,
    roots: Vec<usize>,
}

impl ServiceArena {
    /// Load every service of `firmware`, starting at its roots.
    pub fn load<S: CatalogStore + ?Sized>(store: &S, firmware: FirmwareId) -> Result<Self> {
        tracing::debug!("loading service tree for firmware {}", firmware);
        let roots = store.services_by(None, firmware)?;
        Self::load_from(store, roots)
    }

    /// Load the subtree below (and including) one service.
    pub fn load_subtree<S: CatalogStore + ?Sized>(store: &S, root: Service) -> Result<Self> {
        Self::load_from(store, vec![root])
    }

    fn load_from<S: CatalogStore + ?Sized>(store: &S, roots: Vec<Service>) -> Result<Self> {
        let mut arena = Self::default();
        let mut visited = HashSet::new();
        for root in roots {
            let idx = arena.insert(store, root, &mut visited)?;
            arena.roots.push(idx);
        }
        Ok(arena)
    }

    fn insert<S: CatalogStore + ?Sized>(
        &mut self,
        store: &S,
        service: Service,
        visited: &mut HashSet<ServiceId>,
    ) -> Result<usize> {
        if !visited.insert(service.id) {
            return Err(CatalogError::CycleDetected {
                service_id: service.id,
            });
        }
        let (id, firmware) = (service.id, service.firmware_id);
        let idx = self.nodes.len();
        self.nodes.push(ArenaNode {
            service,
            children: Vec::new(),
        });
        for child in store.services_by(Some(id), firmware)? {
            let child_idx = self.insert(store, child, visited)?;
            self.nodes[idx].children.push(child_idx);
        }
        Ok(idx)
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn node(&self, idx: usize) -> &ArenaNode {
        &self.nodes[idx]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Services in depth-first order.
    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.nodes.iter().map(|n| &n.service)
    }
}

/// A feature as shown in a service tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub id: FeatureId,
    /// The feature's description key.
    pub key: String,
    pub translations: Vec<Translation>,
}

/// A service with its features and nested children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceNode {
    pub id: ServiceId,
    pub service_key: String,
    pub translations: Vec<Translation>,
    pub features: Vec<FeatureSummary>,
    pub children: Vec<ServiceNode>,
}

impl ServiceNode {
    /// Count of this node and every descendant.
    pub fn subtree_size(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(ServiceNode::subtree_size)
            .sum::<usize>()
    }
}

/// Build the full service/feature tree of one firmware.
///
/// Roots and siblings keep store order. A firmware without services yields an
/// empty list; a parent chain that loops yields `CycleDetected`.
pub fn build_tree<S: CatalogStore + ?Sized>(
    store: &S,
    firmware: FirmwareId,
) -> Result<Vec<ServiceNode>> {
    let arena = ServiceArena::load(store, firmware)?;
    arena
        .roots()
        .iter()
        .map(|&idx| materialize(store, &arena, idx))
        .collect()
}

fn materialize<S: CatalogStore + ?Sized>(
    store: &S,
    arena: &ServiceArena,
    idx: usize,
) -> Result<ServiceNode> {
    let node = arena.node(idx);
    let service = &node.service;

    let mut features = Vec::new();
    for feature in store.features_by(service.id)? {
        features.push(FeatureSummary {
            id: feature.id,
            translations: store.translations_for(&feature.description_key)?,
            key: feature.description_key,
        });
    }

    let children = node
        .children
        .iter()
        .map(|&child| materialize(store, arena, child))
        .collect::<Result<Vec<_>>>()?;

    Ok(ServiceNode {
        id: service.id,
        service_key: service.service_key.clone(),
        translations: store.translations_for(&service.description_key)?,
        features,
        children,
    })
}
