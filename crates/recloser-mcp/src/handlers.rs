//! Synchronous tool bodies. Each takes the shared catalog and performs its
//! whole store traversal or write before returning, so no connection lock
//! outlives the call.

use crate::params::{
    AddServiceNodeParams, CompareServiceTreesParams, CreateFeatureParams, CreateFirmwareParams,
    CreateRecloserParams, ScreenLayoutParams, ServiceTreeParams, UpdateFeatureParams,
    UpdateFirmwareParams, UpdateRecloserParams, UpdateServiceNodeParams,
    ValidateFeatureValueParams,
};
use recloser_core::model::NewService;
use recloser_core::sqlite::SqliteCatalog;
use recloser_core::{CatalogError, Result};
use recloser_nav::diff::{self, TreeDiff};
use recloser_nav::inventory::{self, RecloserInventory};
use recloser_nav::layout::{self, ServiceLayout};
use recloser_nav::tree::{self, ServiceNode};
use recloser_nav::validate;
use serde::Serialize;
use serde_json::{Value, json};

/// Read-side settings the server resolves once from config.
#[derive(Debug, Clone)]
pub(crate) struct ReadOptions {
    pub(crate) snapshot_reads: bool,
    pub(crate) default_language: String,
}

/// Render an error as `CODE: message` for the tool response.
pub(crate) fn format_error(err: &CatalogError) -> String {
    format!("{}: {}", err.code(), err)
}

/// Turn a handler result into tool output: pretty JSON or a coded error.
pub(crate) fn respond<T: Serialize>(result: Result<T>) -> Result<String, String> {
    match result {
        Ok(value) => serde_json::to_string_pretty(&value)
            .map_err(|e| format!("INTERNAL: failed to serialize response: {e}")),
        Err(e) => {
            tracing::debug!(code = %e.code(), "tool call failed: {e}");
            Err(format_error(&e))
        }
    }
}

pub(crate) fn check_id(name: &str, id: i64) -> Result<()> {
    if id <= 0 {
        return Err(CatalogError::InvalidInput(format!(
            "{name} must be a positive id, got {id}"
        )));
    }
    Ok(())
}

fn require_text(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CatalogError::InvalidInput(format!("{name} must not be empty")));
    }
    Ok(())
}

pub(crate) fn service_tree(
    catalog: &SqliteCatalog,
    opts: &ReadOptions,
    params: &ServiceTreeParams,
) -> Result<Vec<ServiceNode>> {
    check_id("firmware_id", params.firmware_id)?;
    catalog.read_with(opts.snapshot_reads, |store| {
        if store.firmware(params.firmware_id)?.is_none() {
            return Err(CatalogError::not_found("firmware", params.firmware_id));
        }
        tree::build_tree(store, params.firmware_id)
    })
}

pub(crate) fn compare_service_trees(
    catalog: &SqliteCatalog,
    opts: &ReadOptions,
    params: &CompareServiceTreesParams,
) -> Result<TreeDiff> {
    check_id("firmware_a", params.firmware_a)?;
    check_id("firmware_b", params.firmware_b)?;
    let language = params
        .language_code
        .as_deref()
        .filter(|l| !l.is_empty())
        .unwrap_or(&opts.default_language);
    catalog.read_with(opts.snapshot_reads, |store| {
        for id in [params.firmware_a, params.firmware_b] {
            if store.firmware(id)?.is_none() {
                return Err(CatalogError::not_found("firmware", id));
            }
        }
        diff::diff_trees(store, params.firmware_a, params.firmware_b, language)
    })
}

pub(crate) fn screen_layout(
    catalog: &SqliteCatalog,
    opts: &ReadOptions,
    params: &ScreenLayoutParams,
) -> Result<ServiceLayout> {
    check_id("service_id", params.service_id)?;
    catalog
        .read_with(opts.snapshot_reads, |store| {
            layout::assemble_layout(store, params.service_id)
        })?
        .ok_or_else(|| CatalogError::not_found("service", params.service_id))
}

pub(crate) fn full_inventory(catalog: &SqliteCatalog, opts: &ReadOptions) -> Result<Vec<RecloserInventory>> {
    catalog.read_with(opts.snapshot_reads, |store| inventory::full_inventory(store))
}

#[derive(Debug, Serialize)]
pub(crate) struct ValidationReport {
    pub(crate) service_id: i64,
    pub(crate) feature_id: i64,
    pub(crate) value: String,
    pub(crate) valid: bool,
    pub(crate) message: String,
}

pub(crate) fn validate_feature_value(
    catalog: &SqliteCatalog,
    opts: &ReadOptions,
    params: &ValidateFeatureValueParams,
) -> Result<ValidationReport> {
    check_id("service_id", params.service_id)?;
    check_id("feature_id", params.feature_id)?;
    let layout = screen_layout(
        catalog,
        opts,
        &ScreenLayoutParams {
            service_id: params.service_id,
        },
    )?;
    let feature = layout
        .find_feature(params.feature_id)
        .ok_or_else(|| CatalogError::not_found("feature", params.feature_id))?;
    let message = validate::validation_message(feature, &params.value);
    Ok(ValidationReport {
        service_id: params.service_id,
        feature_id: params.feature_id,
        value: params.value.clone(),
        valid: message.is_empty(),
        message,
    })
}

// --- writes ---

pub(crate) fn create_recloser(catalog: &SqliteCatalog, params: &CreateRecloserParams) -> Result<Value> {
    require_text("description_key", &params.description_key)?;
    require_text("model", &params.model)?;
    let id = catalog.add_recloser(&params.description_key, &params.model)?;
    Ok(json!({ "recloser_id": id }))
}

pub(crate) fn update_recloser(catalog: &SqliteCatalog, params: &UpdateRecloserParams) -> Result<Value> {
    check_id("recloser_id", params.recloser_id)?;
    require_text("description_key", &params.description_key)?;
    require_text("model", &params.model)?;
    catalog.update_recloser(params.recloser_id, &params.description_key, &params.model)?;
    Ok(json!({ "updated": params.recloser_id }))
}

pub(crate) fn delete_recloser(catalog: &SqliteCatalog, recloser_id: i64) -> Result<Value> {
    check_id("recloser_id", recloser_id)?;
    catalog.delete_recloser(recloser_id)?;
    Ok(json!({ "deleted": recloser_id }))
}

pub(crate) fn create_firmware(catalog: &SqliteCatalog, params: &CreateFirmwareParams) -> Result<Value> {
    check_id("recloser_id", params.recloser_id)?;
    require_text("version", &params.version)?;
    let id = catalog.add_firmware(&params.version, params.recloser_id)?;
    Ok(json!({ "firmware_id": id }))
}

pub(crate) fn update_firmware(catalog: &SqliteCatalog, params: &UpdateFirmwareParams) -> Result<Value> {
    check_id("firmware_id", params.firmware_id)?;
    check_id("recloser_id", params.recloser_id)?;
    require_text("version", &params.version)?;
    catalog.update_firmware(params.firmware_id, &params.version, params.recloser_id)?;
    Ok(json!({ "updated": params.firmware_id }))
}

pub(crate) fn delete_firmware(catalog: &SqliteCatalog, firmware_id: i64) -> Result<Value> {
    check_id("firmware_id", firmware_id)?;
    catalog.delete_firmware(firmware_id)?;
    Ok(json!({ "deleted": firmware_id }))
}

fn new_service(
    firmware_id: i64,
    service_key: &str,
    description_key: Option<&str>,
    parent_id: Option<i64>,
) -> Result<NewService> {
    check_id("firmware_id", firmware_id)?;
    require_text("service_key", service_key)?;
    if let Some(parent) = parent_id {
        check_id("parent_id", parent)?;
    }
    Ok(NewService {
        service_key: service_key.to_string(),
        description_key: description_key
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(service_key)
            .to_string(),
        firmware_id,
        parent_id,
    })
}

pub(crate) fn add_service_node(catalog: &SqliteCatalog, params: &AddServiceNodeParams) -> Result<Value> {
    let new = new_service(
        params.firmware_id,
        &params.service_key,
        params.description_key.as_deref(),
        params.parent_id,
    )?;
    let id = catalog.add_service(&new)?;
    Ok(json!({ "service_id": id }))
}

pub(crate) fn update_service_node(catalog: &SqliteCatalog, params: &UpdateServiceNodeParams) -> Result<Value> {
    check_id("service_id", params.service_id)?;
    let new = new_service(
        params.firmware_id,
        &params.service_key,
        params.description_key.as_deref(),
        params.parent_id,
    )?;
    catalog.update_service(params.service_id, &new)?;
    Ok(json!({ "updated": params.service_id }))
}

pub(crate) fn delete_service_node(catalog: &SqliteCatalog, service_id: i64) -> Result<Value> {
    check_id("service_id", service_id)?;
    catalog.delete_service(service_id)?;
    Ok(json!({ "deleted": service_id }))
}

pub(crate) fn create_feature(catalog: &SqliteCatalog, params: &CreateFeatureParams) -> Result<Value> {
    check_id("service_id", params.service_id)?;
    require_text("description_key", &params.description_key)?;
    let id = catalog.add_feature(&params.description_key, params.service_id)?;
    Ok(json!({ "feature_id": id }))
}

pub(crate) fn update_feature(catalog: &SqliteCatalog, params: &UpdateFeatureParams) -> Result<Value> {
    check_id("feature_id", params.feature_id)?;
    check_id("service_id", params.service_id)?;
    require_text("description_key", &params.description_key)?;
    catalog.update_feature(params.feature_id, &params.description_key, params.service_id)?;
    Ok(json!({ "updated": params.feature_id }))
}

pub(crate) fn delete_feature(catalog: &SqliteCatalog, feature_id: i64) -> Result<Value> {
    check_id("feature_id", feature_id)?;
    catalog.delete_feature(feature_id)?;
    Ok(json!({ "deleted": feature_id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use recloser_core::ErrorCode;
    use recloser_core::schema::SchemaVariant;

    fn opts() -> ReadOptions {
        ReadOptions {
            snapshot_reads: true,
            default_language: "enUs".into(),
        }
    }

    fn make_catalog() -> SqliteCatalog {
        SqliteCatalog::open_in_memory(SchemaVariant::FirmwareScoped).unwrap()
    }

    fn add_node(cat: &SqliteCatalog, fw: i64, key: &str, parent: Option<i64>) -> i64 {
        add_service_node(
            cat,
            &AddServiceNodeParams {
                firmware_id: fw,
                service_key: key.into(),
                description_key: None,
                parent_id: parent,
            },
        )
        .unwrap()["service_id"]
            .as_i64()
            .unwrap()
    }

    #[test]
    fn test_respond_formats_code_and_message() {
        let err = respond::<Value>(Err(CatalogError::not_found("service", 77))).unwrap_err();
        assert_eq!(err, "NOT_FOUND: service 77 not found");
        let ok = respond(Ok(json!({ "deleted": 3 }))).unwrap();
        assert!(ok.contains("\"deleted\": 3"));
    }

    #[test]
    fn test_non_positive_ids_are_invalid_argument() {
        let cat = make_catalog();
        let err = service_tree(&cat, &opts(), &ServiceTreeParams { firmware_id: 0 }).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        let err = delete_feature(&cat, -3).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_unknown_ids_are_not_found() {
        let cat = make_catalog();
        let err = service_tree(&cat, &opts(), &ServiceTreeParams { firmware_id: 77 }).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
        let err = screen_layout(&cat, &opts(), &ScreenLayoutParams { service_id: 77 }).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_crud_then_tree_and_layout() {
        let cat = make_catalog();
        let r = create_recloser(
            &cat,
            &CreateRecloserParams {
                description_key: "ZEUS".into(),
                model: "3P4W".into(),
            },
        )
        .unwrap()["recloser_id"]
            .as_i64()
            .unwrap();
        let fw = create_firmware(
            &cat,
            &CreateFirmwareParams {
                recloser_id: r,
                version: "v1.0.0".into(),
            },
        )
        .unwrap()["firmware_id"]
            .as_i64()
            .unwrap();
        let prot = add_node(&cat, fw, "SEC_PROT", None);
        add_node(&cat, fw, "SEC_GROUND", Some(prot));
        create_feature(
            &cat,
            &CreateFeatureParams {
                service_id: prot,
                description_key: "FEAT_OVERCURRENT".into(),
            },
        )
        .unwrap();

        let nodes = service_tree(&cat, &opts(), &ServiceTreeParams { firmware_id: fw }).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].service_key, "SEC_PROT");
        assert_eq!(nodes[0].children[0].service_key, "SEC_GROUND");
        assert_eq!(nodes[0].features[0].key, "FEAT_OVERCURRENT");

        let result = screen_layout(&cat, &opts(), &ScreenLayoutParams { service_id: prot }).unwrap();
        assert_eq!(result.service_id, prot);
        assert_eq!(result.features.len(), 1);
        assert_eq!(result.children.len(), 1);

        let inv = full_inventory(&cat, &opts()).unwrap();
        assert_eq!(inv[0].firmwares[0].version, "v1.0.0");
    }

    #[test]
    fn test_service_key_defaults_description_key() {
        let new = new_service(1, "SEC_PROT", Some("  "), None).unwrap();
        assert_eq!(new.description_key, "SEC_PROT");
        let err = new_service(1, "SEC_PROT", None, Some(0)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_reparenting_under_descendant_is_failed_precondition() {
        let cat = make_catalog();
        let r = cat.add_recloser("ZEUS", "3P4W").unwrap();
        let fw = cat.add_firmware("v1", r).unwrap();
        let root = add_node(&cat, fw, "SEC_PROT", None);
        let child = add_node(&cat, fw, "SEC_GROUND", Some(root));
        let err = update_service_node(
            &cat,
            &UpdateServiceNodeParams {
                service_id: root,
                firmware_id: fw,
                service_key: "SEC_PROT".into(),
                description_key: None,
                parent_id: Some(child),
            },
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::FailedPrecondition);
    }

    #[test]
    fn test_compare_uses_default_language() {
        let cat = make_catalog();
        cat.add_language("enUs", "English").unwrap();
        cat.add_key_with_translations("SEC_PROT", &[("enUs", "Protection")])
            .unwrap();
        let r = cat.add_recloser("ZEUS", "3P4W").unwrap();
        let fw_a = cat.add_firmware("v1", r).unwrap();
        let fw_b = cat.add_firmware("v2", r).unwrap();
        add_node(&cat, fw_b, "SEC_PROT", None);

        let result = compare_service_trees(
            &cat,
            &opts(),
            &CompareServiceTreesParams {
                firmware_a: fw_a,
                firmware_b: fw_b,
                language_code: None,
            },
        )
        .unwrap();
        assert_eq!(result.language_code, "enUs");
        assert_eq!(result.summary.added, 1);
        assert_eq!(result.differences[0].display_name, "Protection");

        let json: Value = serde_json::from_str(&respond(Ok(result)).unwrap()).unwrap();
        assert_eq!(json["differences"][0]["kind"], "ADDED");
    }

    #[test]
    fn test_compare_with_unknown_firmware_is_not_found() {
        let cat = make_catalog();
        let r = cat.add_recloser("ZEUS", "3P4W").unwrap();
        let fw = cat.add_firmware("v1", r).unwrap();
        add_node(&cat, fw, "SEC_PROT", None);

        for (a, b) in [(fw, fw + 50), (fw + 50, fw)] {
            let err = compare_service_trees(
                &cat,
                &opts(),
                &CompareServiceTreesParams {
                    firmware_a: a,
                    firmware_b: b,
                    language_code: Some("enUs".into()),
                },
            )
            .unwrap_err();
            assert_eq!(err.code(), ErrorCode::NotFound);
        }
    }

    #[test]
    fn test_validate_feature_value_reports_message() {
        let cat = make_catalog();
        let r = cat.add_recloser("ZEUS", "3P4W").unwrap();
        let fw = cat.add_firmware("v1", r).unwrap();
        let s = add_node(&cat, fw, "SEC_PROT", None);
        let f = cat.add_feature("NUM_TC", s).unwrap();
        let b = cat.bind_component(f, "Integer").unwrap();
        cat.set_limit(b, "MAX_VALUE", "5000").unwrap();

        let call = |value: &str| {
            validate_feature_value(
                &cat,
                &opts(),
                &ValidateFeatureValueParams {
                    service_id: s,
                    feature_id: f,
                    value: value.into(),
                },
            )
        };
        assert!(call("4000").unwrap().valid);
        let rejected = call("6000").unwrap();
        assert!(!rejected.valid);
        assert!(rejected.message.contains("5000"));

        let err = validate_feature_value(
            &cat,
            &opts(),
            &ValidateFeatureValueParams {
                service_id: s,
                feature_id: f + 100,
                value: "1".into(),
            },
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_delete_recloser_then_update_is_not_found() {
        let cat = make_catalog();
        let r = cat.add_recloser("ZEUS", "3P4W").unwrap();
        assert_eq!(delete_recloser(&cat, r).unwrap()["deleted"], r);
        let err = update_recloser(
            &cat,
            &UpdateRecloserParams {
                recloser_id: r,
                description_key: "ZEUS".into(),
                model: "3P3W".into(),
            },
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
