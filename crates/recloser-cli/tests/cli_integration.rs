//! Integration tests for recloser-cli functionality.
//! Tests the configuration and library calls the CLI commands are built on.

use recloser_core::config::RecloserConfig;
use recloser_core::model::NewService;
use recloser_core::schema::SchemaVariant;
use recloser_core::sqlite::SqliteCatalog;
use recloser_nav::{diff, layout, render, tree};

fn make_catalog(root: &std::path::Path) -> (RecloserConfig, SqliteCatalog) {
    let config = RecloserConfig::load(root).unwrap();
    let catalog = SqliteCatalog::open_configured(&config, root).unwrap();
    (config, catalog)
}

fn add_service(cat: &SqliteCatalog, fw: i64, key: &str, parent: Option<i64>) -> i64 {
    cat.add_service(&NewService {
        service_key: key.to_string(),
        description_key: key.to_string(),
        firmware_id: fw,
        parent_id: parent,
    })
    .unwrap()
}

#[test]
fn test_default_config_creates_database_under_data() {
    let tmpdir = tempfile::tempdir().unwrap();
    let (config, catalog) = make_catalog(tmpdir.path());
    assert!(tmpdir.path().join("data").join("management.db").exists());
    assert_eq!(catalog.variant(), SchemaVariant::FirmwareScoped);
    assert_eq!(config.display.default_language, "enUs");
}

#[test]
fn test_config_file_selects_shared_schema() {
    let tmpdir = tempfile::tempdir().unwrap();
    let dir = tmpdir.path().join(".recloser");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        "[store]\npath = \"shared.db\"\nschema = \"shared_services\"\n",
    )
    .unwrap();

    let (_, catalog) = make_catalog(tmpdir.path());
    assert_eq!(catalog.variant(), SchemaVariant::SharedServices);
    assert!(tmpdir.path().join("shared.db").exists());
}

#[test]
fn test_tree_and_diff_rendering_on_disk() {
    let tmpdir = tempfile::tempdir().unwrap();
    let (config, cat) = make_catalog(tmpdir.path());
    cat.add_language("enUs", "English").unwrap();
    cat.add_key_with_translations("SEC_PROT", &[("enUs", "Protection")])
        .unwrap();

    let r = cat.add_recloser("ZEUS", "3P4W").unwrap();
    let fw_a = cat.add_firmware("v1.0.0", r).unwrap();
    let fw_b = cat.add_firmware("v1.1.0", r).unwrap();
    let prot_a = add_service(&cat, fw_a, "SEC_PROT", None);
    let prot_b = add_service(&cat, fw_b, "SEC_PROT", None);
    cat.add_feature("FEAT_OVERCURRENT", prot_a).unwrap();
    cat.add_feature("FEAT_OVERCURRENT", prot_b).unwrap();
    cat.add_feature("FEAT_OSCILLOGRAPHY", prot_b).unwrap();

    let snapshot_reads = config.store.snapshot_reads;
    let nodes = cat
        .read_with(snapshot_reads, |store| tree::build_tree(store, fw_b))
        .unwrap();
    let text = render::format_tree(&nodes, "enUs");
    assert!(text.contains("Protection [SEC_PROT]"));
    assert!(text.contains("FEAT_OSCILLOGRAPHY"));

    let result = cat
        .read_with(snapshot_reads, |store| {
            diff::diff_trees(store, fw_a, fw_b, "enUs")
        })
        .unwrap();
    let text = render::format_diff(&result);
    assert!(text.starts_with(&format!(
        "firmware {fw_a} -> {fw_b}: 0 service(s) added, 0 service(s) removed, 1 service(s) modified"
    )));
    assert!(text.contains("+ FEAT_OSCILLOGRAPHY"));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["summary"]["modified"], 1);
}

#[test]
fn test_layout_rendering_shows_component_and_limits() {
    let tmpdir = tempfile::tempdir().unwrap();
    let (_, cat) = make_catalog(tmpdir.path());
    let r = cat.add_recloser("ZEUS", "3P4W").unwrap();
    let fw = cat.add_firmware("v1", r).unwrap();
    let s = add_service(&cat, fw, "SEC_PROT", None);
    let f = cat.add_feature("NUM_TC", s).unwrap();
    let b = cat.bind_component(f, "Integer").unwrap();
    cat.set_limit(b, "MIN_VALUE", "0").unwrap();
    cat.set_limit(b, "MAX_VALUE", "5000").unwrap();

    let result = layout::assemble_layout(&cat, s).unwrap().unwrap();
    let text = render::format_layout(&result, "enUs");
    assert!(text.contains("NUM_TC"));
    assert!(text.contains("<Integer>"));
    assert!(text.contains("{MIN_VALUE=0, MAX_VALUE=5000}"));
}
