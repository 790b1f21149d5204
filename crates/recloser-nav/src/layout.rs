//! Screen layout assembly: a service, its features with their bound UI
//! component and limits, and every descendant service.

use crate::tree::ServiceArena;
use recloser_core::CatalogStore;
use recloser_core::error::Result;
use recloser_core::model::{
    ComponentKind, Feature, FeatureId, LimitKind, LimitValue, ServiceId, Translation,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLayout {
    pub feature_id: FeatureId,
    pub feature_key: String,
    pub translations: Vec<Translation>,
    /// Component type name of the first binding, if the feature has one.
    pub component_type: Option<String>,
    pub component_key: Option<String>,
    pub limits: Vec<LimitValue>,
}

impl FeatureLayout {
    pub fn component_kind(&self) -> Option<ComponentKind> {
        self.component_type
            .as_deref()
            .and_then(ComponentKind::from_name)
    }

    /// Raw value of one limit.
    pub fn limit(&self, kind: LimitKind) -> Option<&str> {
        self.limits
            .iter()
            .find(|l| l.key == kind.as_str())
            .map(|l| l.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLayout {
    pub service_id: ServiceId,
    pub service_key: String,
    pub translations: Vec<Translation>,
    pub features: Vec<FeatureLayout>,
    pub children: Vec<ServiceLayout>,
}

impl ServiceLayout {
    /// Find a feature anywhere in this layout.
    pub fn find_feature(&self, id: FeatureId) -> Option<&FeatureLayout> {
        self.features
            .iter()
            .find(|f| f.feature_id == id)
            .or_else(|| self.children.iter().find_map(|c| c.find_feature(id)))
    }
}

/// Assemble the layout rooted at `service`. Returns `Ok(None)` when the service
/// does not exist.
pub fn assemble_layout<S: CatalogStore + ?Sized>(
    store: &S,
    service: ServiceId,
) -> Result<Option<ServiceLayout>> {
    tracing::debug!("assembling layout for service {}", service);
    let Some(root) = store.service(service)? else {
        return Ok(None);
    };
    let arena = ServiceArena::load_subtree(store, root)?;
    match arena.roots().first() {
        Some(&idx) => Ok(Some(layout_node(store, &arena, idx)?)),
        None => Ok(None),
    }
}

fn layout_node<S: CatalogStore + ?Sized>(
    store: &S,
    arena: &ServiceArena,
    idx: usize,
) -> Result<ServiceLayout> {
    let node = arena.node(idx);
    let service = &node.service;

    let features = store
        .features_by(service.id)?
        .into_iter()
        .map(|f| feature_layout(store, f))
        .collect::<Result<Vec<_>>>()?;

    let children = node
        .children
        .iter()
        .map(|&child| layout_node(store, arena, child))
        .collect::<Result<Vec<_>>>()?;

    Ok(ServiceLayout {
        service_id: service.id,
        service_key: service.service_key.clone(),
        translations: store.translations_for(&service.description_key)?,
        features,
        children,
    })
}

fn feature_layout<S: CatalogStore + ?Sized>(store: &S, feature: Feature) -> Result<FeatureLayout> {
    let bindings = store.bindings_for(feature.id)?;
    if bindings.len() > 1 {
        tracing::warn!(
            "feature {} has {} component bindings; using binding {}",
            feature.id,
            bindings.len(),
            bindings[0].binding_id
        );
    }

    let (component_type, component_key, limits) = match bindings.into_iter().next() {
        Some(binding) => (
            Some(binding.component.type_name),
            Some(binding.component.key),
            store.limits_for(binding.binding_id)?,
        ),
        None => (None, None, Vec::new()),
    };

    Ok(FeatureLayout {
        feature_id: feature.id,
        translations: store.translations_for(&feature.description_key)?,
        feature_key: feature.description_key,
        component_type,
        component_key,
        limits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_feature(limits: Vec<LimitValue>) -> FeatureLayout {
        FeatureLayout {
            feature_id: 1,
            feature_key: "NUM_TC".into(),
            translations: Vec::new(),
            component_type: Some("integer".into()),
            component_key: Some("int".into()),
            limits,
        }
    }

    #[test]
    fn test_component_kind_and_limit_lookup() {
        let f = make_feature(vec![LimitValue::new("STEP", "5")]);
        assert_eq!(f.component_kind(), Some(ComponentKind::Integer));
        assert_eq!(f.limit(LimitKind::Step), Some("5"));
        assert_eq!(f.limit(LimitKind::MaxValue), None);
    }

    #[test]
    fn test_find_feature_searches_children() {
        let mut nested = make_feature(Vec::new());
        nested.feature_id = 7;
        let layout = ServiceLayout {
            service_id: 1,
            service_key: "ROOT".into(),
            translations: Vec::new(),
            features: vec![make_feature(Vec::new())],
            children: vec![ServiceLayout {
                service_id: 2,
                service_key: "CHILD".into(),
                translations: Vec::new(),
                features: vec![nested],
                children: Vec::new(),
            }],
        };
        assert_eq!(layout.find_feature(7).map(|f| f.feature_id), Some(7));
        assert!(layout.find_feature(8).is_none());
    }
}
