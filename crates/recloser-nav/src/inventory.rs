//! Whole-catalog read: every recloser, its firmware versions and their trees.

use crate::tree::{ServiceNode, build_tree};
use recloser_core::CatalogStore;
use recloser_core::error::Result;
use recloser_core::model::{FirmwareId, RecloserId, Translation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareInventory {
    pub id: FirmwareId,
    pub version: String,
    pub services: Vec<ServiceNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecloserInventory {
    pub id: RecloserId,
    pub model: String,
    pub translations: Vec<Translation>,
    pub firmwares: Vec<FirmwareInventory>,
}

pub fn full_inventory<S: CatalogStore + ?Sized>(store: &S) -> Result<Vec<RecloserInventory>> {
    let reclosers = store.reclosers()?;
    tracing::debug!("building inventory for {} recloser(s)", reclosers.len());

    let mut out = Vec::with_capacity(reclosers.len());
    for recloser in reclosers {
        let mut firmwares = Vec::new();
        for fw in store.firmware_versions_for(recloser.id)? {
            firmwares.push(FirmwareInventory {
                services: build_tree(store, fw.id)?,
                id: fw.id,
                version: fw.version,
            });
        }
        out.push(RecloserInventory {
            id: recloser.id,
            translations: store.translations_for(&recloser.description_key)?,
            model: recloser.model,
            firmwares,
        });
    }
    Ok(out)
}
