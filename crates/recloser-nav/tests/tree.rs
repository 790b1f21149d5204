mod common;

use common::{MemoryStore, make_scenario, make_service};
use recloser_core::error::CatalogError;
use recloser_core::schema::SchemaVariant;
use recloser_core::sqlite::SqliteCatalog;
use recloser_nav::inventory::full_inventory;
use recloser_nav::tree::build_tree;

#[test]
fn test_empty_firmware_yields_empty_tree() {
    let cat = SqliteCatalog::open_in_memory(SchemaVariant::FirmwareScoped).unwrap();
    let r = cat.add_recloser("ZEUS", "3P4W").unwrap();
    let fw = cat.add_firmware("v0", r).unwrap();
    assert!(build_tree(&cat, fw).unwrap().is_empty());
    // Unknown firmware behaves the same.
    assert!(build_tree(&cat, 999).unwrap().is_empty());
}

#[test]
fn test_tree_resolves_translations_and_features() {
    let s = make_scenario();
    let tree = build_tree(&s.catalog, s.fw_a).unwrap();
    assert_eq!(tree.len(), 1);
    let root = &tree[0];
    assert_eq!(root.id, s.prot_a);
    assert_eq!(root.service_key, "SEC_PROT");
    assert_eq!(root.translations.len(), 2);
    assert_eq!(root.features.len(), 1);
    assert_eq!(root.features[0].id, s.overcurrent_a);
    assert_eq!(root.features[0].key, "FEAT_OVERCURRENT");
    assert_eq!(root.features[0].translations[0].value, "Overcurrent");
}

#[test]
fn test_siblings_keep_store_order() {
    let cat = SqliteCatalog::open_in_memory(SchemaVariant::FirmwareScoped).unwrap();
    let r = cat.add_recloser("ZEUS", "3P4W").unwrap();
    let fw = cat.add_firmware("v1", r).unwrap();
    let root = make_service(&cat, "ROOT", fw, None);
    make_service(&cat, "ZETA", fw, Some(root));
    make_service(&cat, "ALPHA", fw, Some(root));
    make_service(&cat, "MID", fw, Some(root));

    let tree = build_tree(&cat, fw).unwrap();
    let keys: Vec<&str> = tree[0]
        .children
        .iter()
        .map(|c| c.service_key.as_str())
        .collect();
    assert_eq!(keys, vec!["ZETA", "ALPHA", "MID"]);
}

#[test]
fn test_tree_never_crosses_firmware() {
    let s = make_scenario();
    make_service(&s.catalog, "SEC_EXTRA", s.fw_b, Some(s.prot_b));
    let tree_a = build_tree(&s.catalog, s.fw_a).unwrap();
    assert!(tree_a[0].children.is_empty());
    let tree_b = build_tree(&s.catalog, s.fw_b).unwrap();
    assert_eq!(tree_b[0].children.len(), 1);
}

#[test]
fn test_cycle_below_root_is_detected() {
    // ROOT -> A -> B -> A: the store reports A as a child of B.
    let mut store = MemoryStore::default();
    store.push_service(1, "ROOT", None, 1);
    store.push_service(2, "A", Some(1), 1);
    store.push_service(3, "B", Some(2), 1);
    store.push_service(2, "A", Some(3), 1);

    let err = build_tree(&store, 1).unwrap_err();
    assert!(matches!(err, CatalogError::CycleDetected { service_id: 2 }));
}

#[test]
fn test_store_failure_aborts_without_partial_result() {
    let mut store = MemoryStore::default();
    store.push_service(1, "ROOT", None, 1);
    store.push_service(2, "CHILD", Some(1), 1);
    store.push_feature(10, "FEAT", 2);
    store.fail_after = Some(3);

    let err = build_tree(&store, 1).unwrap_err();
    assert!(matches!(err, CatalogError::StoreUnavailable(_)));
}

#[test]
fn test_shared_variant_builds_same_shape() {
    let cat = SqliteCatalog::open_in_memory(SchemaVariant::SharedServices).unwrap();
    let r = cat.add_recloser("ZEUS", "3P4W").unwrap();
    let fw = cat.add_firmware("v1", r).unwrap();
    let prot = cat.add_shared_service("SEC_PROT", "SEC_PROT", None).unwrap();
    let ground = cat
        .add_shared_service("SEC_GROUND", "SEC_GROUND", Some(prot))
        .unwrap();
    let prot_link = cat.link_service(prot, fw).unwrap();
    let ground_link = cat.link_service(ground, fw).unwrap();
    cat.add_feature("FEAT_OVERCURRENT", prot_link).unwrap();
    cat.add_feature("FEAT_GROUND", ground_link).unwrap();

    let tree = build_tree(&cat, fw).unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].id, prot_link);
    assert_eq!(tree[0].features[0].key, "FEAT_OVERCURRENT");
    assert_eq!(tree[0].children[0].id, ground_link);
    assert_eq!(tree[0].children[0].features[0].key, "FEAT_GROUND");
}

#[test]
fn test_inventory_walks_every_firmware() {
    let s = make_scenario();
    let inventory = full_inventory(&s.catalog).unwrap();
    assert_eq!(inventory.len(), 1);
    let zeus = &inventory[0];
    assert_eq!(zeus.id, s.recloser);
    assert_eq!(zeus.model, "3P4W");
    let versions: Vec<&str> = zeus.firmwares.iter().map(|f| f.version.as_str()).collect();
    assert_eq!(versions, vec!["v1.0.0", "v1.1.0"]);
    assert_eq!(zeus.firmwares[1].services[0].features.len(), 2);
}

#[test]
fn test_snapshot_store_gives_same_tree() {
    let s = make_scenario();
    let direct = build_tree(&s.catalog, s.fw_b).unwrap();
    let snapshot = s.catalog.snapshot().unwrap();
    assert_eq!(build_tree(&snapshot, s.fw_b).unwrap(), direct);
}
