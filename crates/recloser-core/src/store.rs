//! The read contract every derived catalog operation depends on.
//!
//! Tree building, diffing and layout assembly take an explicit `&S where S:
//! CatalogStore` handle; they never know which storage shape backs it.

use crate::error::Result;
use crate::model::{
    BindingId, ComponentBinding, ComponentType, Feature, FeatureId, FirmwareId, FirmwareVersion,
    Language, LimitType, LimitValue, Recloser, RecloserId, Service, ServiceId, Translation,
};

/// Point-in-time catalog reads. List results follow insertion (id) order.
pub trait CatalogStore {
    /// All translations recorded for a description key.
    fn translations_for(&self, key: &str) -> Result<Vec<Translation>>;

    /// The translation of `key` in `language_code`, or `""` when none exists.
    fn translation_for(&self, key: &str, language_code: &str) -> Result<String> {
        Ok(self
            .translations_for(key)?
            .into_iter()
            .find(|t| t.language_code == language_code)
            .map(|t| t.value)
            .unwrap_or_default())
    }

    /// Services of `firmware` whose parent is `parent`; `None` selects roots.
    fn services_by(&self, parent: Option<ServiceId>, firmware: FirmwareId)
    -> Result<Vec<Service>>;

    fn service(&self, id: ServiceId) -> Result<Option<Service>>;

    fn features_by(&self, service: ServiceId) -> Result<Vec<Feature>>;

    /// Every component binding of a feature. The model permits more than one.
    fn bindings_for(&self, feature: FeatureId) -> Result<Vec<ComponentBinding>>;

    /// The binding used for layout: the first one by binding id.
    fn layout_binding_for(&self, feature: FeatureId) -> Result<Option<ComponentBinding>> {
        Ok(self.bindings_for(feature)?.into_iter().next())
    }

    fn limits_for(&self, binding: BindingId) -> Result<Vec<LimitValue>>;

    fn reclosers(&self) -> Result<Vec<Recloser>>;

    fn firmware_versions_for(&self, recloser: RecloserId) -> Result<Vec<FirmwareVersion>>;

    fn firmware(&self, id: FirmwareId) -> Result<Option<FirmwareVersion>>;

    fn languages(&self) -> Result<Vec<Language>>;

    fn component_types(&self) -> Result<Vec<ComponentType>>;

    fn limit_types(&self) -> Result<Vec<LimitType>>;
}
