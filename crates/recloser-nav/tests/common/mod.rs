#![allow(dead_code)]

use recloser_core::CatalogStore;
use recloser_core::error::{CatalogError, Result};
use recloser_core::model::*;
use recloser_core::schema::SchemaVariant;
use recloser_core::sqlite::SqliteCatalog;
use std::cell::Cell;
use std::collections::HashMap;

/// Hand-built store for shapes SQLite refuses to hold (loops, duplicate keys)
/// and for injected failures.
#[derive(Default)]
pub struct MemoryStore {
    pub services: Vec<Service>,
    pub features: Vec<Feature>,
    pub translations: HashMap<String, Vec<Translation>>,
    pub bindings: HashMap<FeatureId, Vec<ComponentBinding>>,
    pub limits: HashMap<BindingId, Vec<LimitValue>>,
    /// Fail every read after this many successful ones.
    pub fail_after: Option<usize>,
    pub reads: Cell<usize>,
}

impl MemoryStore {
    pub fn push_service(&mut self, id: ServiceId, key: &str, parent: Option<ServiceId>, fw: FirmwareId) {
        self.services.push(Service {
            id,
            service_key: key.to_string(),
            description_key: key.to_string(),
            parent_id: parent,
            firmware_id: fw,
        });
    }

    pub fn push_feature(&mut self, id: FeatureId, key: &str, service: ServiceId) {
        self.features.push(Feature {
            id,
            description_key: key.to_string(),
            service_id: service,
        });
    }

    fn tick(&self) -> Result<()> {
        let n = self.reads.get() + 1;
        self.reads.set(n);
        match self.fail_after {
            Some(limit) if n > limit => Err(CatalogError::StoreUnavailable(
                "connection reset".into(),
            )),
            _ => Ok(()),
        }
    }
}

impl CatalogStore for MemoryStore {
    fn translations_for(&self, key: &str) -> Result<Vec<Translation>> {
        self.tick()?;
        Ok(self.translations.get(key).cloned().unwrap_or_default())
    }

    fn services_by(&self, parent: Option<ServiceId>, firmware: FirmwareId) -> Result<Vec<Service>> {
        self.tick()?;
        Ok(self
            .services
            .iter()
            .filter(|s| s.parent_id == parent && s.firmware_id == firmware)
            .cloned()
            .collect())
    }

    fn service(&self, id: ServiceId) -> Result<Option<Service>> {
        self.tick()?;
        Ok(self.services.iter().find(|s| s.id == id).cloned())
    }

    fn features_by(&self, service: ServiceId) -> Result<Vec<Feature>> {
        self.tick()?;
        Ok(self
            .features
            .iter()
            .filter(|f| f.service_id == service)
            .cloned()
            .collect())
    }

    fn bindings_for(&self, feature: FeatureId) -> Result<Vec<ComponentBinding>> {
        self.tick()?;
        Ok(self.bindings.get(&feature).cloned().unwrap_or_default())
    }

    fn limits_for(&self, binding: BindingId) -> Result<Vec<LimitValue>> {
        self.tick()?;
        Ok(self.limits.get(&binding).cloned().unwrap_or_default())
    }

    fn reclosers(&self) -> Result<Vec<Recloser>> {
        self.tick()?;
        Ok(Vec::new())
    }

    fn firmware_versions_for(&self, _recloser: RecloserId) -> Result<Vec<FirmwareVersion>> {
        self.tick()?;
        Ok(Vec::new())
    }

    fn firmware(&self, _id: FirmwareId) -> Result<Option<FirmwareVersion>> {
        self.tick()?;
        Ok(None)
    }

    fn languages(&self) -> Result<Vec<Language>> {
        self.tick()?;
        Ok(Vec::new())
    }

    fn component_types(&self) -> Result<Vec<ComponentType>> {
        self.tick()?;
        Ok(Vec::new())
    }

    fn limit_types(&self) -> Result<Vec<LimitType>> {
        self.tick()?;
        Ok(Vec::new())
    }
}

/// Ids of the two-firmware protection scenario.
pub struct Scenario {
    pub catalog: SqliteCatalog,
    pub recloser: RecloserId,
    pub fw_a: FirmwareId,
    pub fw_b: FirmwareId,
    pub prot_a: ServiceId,
    pub prot_b: ServiceId,
    pub overcurrent_a: FeatureId,
}

pub fn make_service(cat: &SqliteCatalog, key: &str, fw: FirmwareId, parent: Option<ServiceId>) -> ServiceId {
    cat.add_service(&NewService {
        service_key: key.to_string(),
        description_key: key.to_string(),
        firmware_id: fw,
        parent_id: parent,
    })
    .unwrap()
}

/// Firmware A: SEC_PROT{FEAT_OVERCURRENT}. Firmware B: the same plus
/// FEAT_OSCILLOGRAPHY.
pub fn make_scenario() -> Scenario {
    let cat = SqliteCatalog::open_in_memory(SchemaVariant::FirmwareScoped).unwrap();
    cat.add_language("enUs", "English").unwrap();
    cat.add_language("ptBr", "Português").unwrap();
    cat.add_key_with_translations("SEC_PROT", &[("enUs", "Protection"), ("ptBr", "Proteção")])
        .unwrap();
    cat.add_key_with_translations("FEAT_OVERCURRENT", &[("enUs", "Overcurrent")])
        .unwrap();

    let recloser = cat.add_recloser("ZEUS", "3P4W").unwrap();
    let fw_a = cat.add_firmware("v1.0.0", recloser).unwrap();
    let fw_b = cat.add_firmware("v1.1.0", recloser).unwrap();

    let prot_a = make_service(&cat, "SEC_PROT", fw_a, None);
    let overcurrent_a = cat.add_feature("FEAT_OVERCURRENT", prot_a).unwrap();

    let prot_b = make_service(&cat, "SEC_PROT", fw_b, None);
    cat.add_feature("FEAT_OVERCURRENT", prot_b).unwrap();
    cat.add_feature("FEAT_OSCILLOGRAPHY", prot_b).unwrap();

    Scenario {
        catalog: cat,
        recloser,
        fw_a,
        fw_b,
        prot_a,
        prot_b,
        overcurrent_a,
    }
}
