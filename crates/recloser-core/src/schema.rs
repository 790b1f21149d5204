//! Versioned schema scripts for the SQLite catalog and the logic that applies
//! each script set exactly once.

use crate::error::{CatalogError, Result};
use crate::model::{ComponentKind, LimitKind};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage shape of the service tree.
///
/// `FirmwareScoped` duplicates each service per firmware (`firmware_id` on the
/// service row). `SharedServices` keeps one service definition and links it to
/// firmwares through `ServiceFirmware`; features hang off the link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVariant {
    #[default]
    FirmwareScoped,
    SharedServices,
}

impl SchemaVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaVariant::FirmwareScoped => "firmware_scoped",
            SchemaVariant::SharedServices => "shared_services",
        }
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaVariant {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "firmware_scoped" | "scoped" => Ok(SchemaVariant::FirmwareScoped),
            "shared_services" | "shared" => Ok(SchemaVariant::SharedServices),
            other => Err(CatalogError::Config(format!(
                "unknown schema variant '{other}' (expected firmware_scoped or shared_services)"
            ))),
        }
    }
}

/// One versioned script set.
pub struct Migration {
    pub version: u32,
    pub statements: &'static [&'static str],
    /// Data population run inside the same transaction, after `statements`.
    pub seed: Option<fn(&Connection) -> rusqlite::Result<()>>,
}

const BOOTSTRAP_SQL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS Migrations (id INTEGER PRIMARY KEY, \
     version INTEGER UNIQUE NOT NULL, applied_at TEXT NOT NULL);",
    "CREATE TABLE IF NOT EXISTS CatalogMeta (key TEXT PRIMARY KEY NOT NULL, \
     value TEXT NOT NULL);",
];

const COMMON_HEAD_SQL: [&str; 7] = [
    "CREATE TABLE IF NOT EXISTS Languages (code TEXT PRIMARY KEY NOT NULL, name TEXT NOT NULL);",
    "CREATE TABLE IF NOT EXISTS Descriptions (key TEXT PRIMARY KEY NOT NULL);",
    "CREATE TABLE IF NOT EXISTS Translations (id INTEGER PRIMARY KEY AUTOINCREMENT, \
     description_key TEXT NOT NULL, language_code TEXT NOT NULL, value TEXT NOT NULL, \
     UNIQUE(description_key, language_code), \
     FOREIGN KEY (description_key) REFERENCES Descriptions(key) ON DELETE CASCADE, \
     FOREIGN KEY (language_code) REFERENCES Languages(code) ON DELETE CASCADE);",
    "CREATE TABLE IF NOT EXISTS Reclosers (id INTEGER PRIMARY KEY AUTOINCREMENT, \
     description_key TEXT UNIQUE NOT NULL, model TEXT NOT NULL DEFAULT '', \
     FOREIGN KEY (description_key) REFERENCES Descriptions(key));",
    "CREATE TABLE IF NOT EXISTS FirmwareVersions (id INTEGER PRIMARY KEY AUTOINCREMENT, \
     version TEXT NOT NULL, recloser_id INTEGER NOT NULL, \
     FOREIGN KEY (recloser_id) REFERENCES Reclosers(id) ON DELETE CASCADE);",
    "CREATE TABLE IF NOT EXISTS Component (id INTEGER PRIMARY KEY AUTOINCREMENT, \
     type TEXT UNIQUE NOT NULL, key TEXT UNIQUE NOT NULL);",
    "CREATE TABLE IF NOT EXISTS Limits (id INTEGER PRIMARY KEY AUTOINCREMENT, \
     key TEXT UNIQUE NOT NULL);",
];

const COMMON_TAIL_SQL: [&str; 2] = [
    "CREATE TABLE IF NOT EXISTS FeatureComponent (id INTEGER PRIMARY KEY AUTOINCREMENT, \
     feature_id INTEGER NOT NULL, component_id INTEGER NOT NULL, \
     FOREIGN KEY (feature_id) REFERENCES Features(id) ON DELETE CASCADE, \
     FOREIGN KEY (component_id) REFERENCES Component(id) ON DELETE CASCADE);",
    "CREATE TABLE IF NOT EXISTS FeatureComponentLimits (id INTEGER PRIMARY KEY AUTOINCREMENT, \
     feature_component_id INTEGER NOT NULL, limit_id INTEGER NOT NULL, value TEXT NOT NULL, \
     UNIQUE(feature_component_id, limit_id), \
     FOREIGN KEY (feature_component_id) REFERENCES FeatureComponent(id) ON DELETE CASCADE, \
     FOREIGN KEY (limit_id) REFERENCES Limits(id) ON DELETE CASCADE);",
];

const SCOPED_V1_SQL: &[&str] = &[
    COMMON_HEAD_SQL[0],
    COMMON_HEAD_SQL[1],
    COMMON_HEAD_SQL[2],
    COMMON_HEAD_SQL[3],
    COMMON_HEAD_SQL[4],
    COMMON_HEAD_SQL[5],
    COMMON_HEAD_SQL[6],
    "CREATE TABLE IF NOT EXISTS Services (id INTEGER PRIMARY KEY AUTOINCREMENT, \
     service_key TEXT NOT NULL, description_key TEXT NOT NULL, parent_id INTEGER, \
     firmware_id INTEGER NOT NULL, UNIQUE(firmware_id, service_key), \
     FOREIGN KEY (description_key) REFERENCES Descriptions(key), \
     FOREIGN KEY (parent_id) REFERENCES Services(id) ON DELETE CASCADE, \
     FOREIGN KEY (firmware_id) REFERENCES FirmwareVersions(id) ON DELETE CASCADE);",
    "CREATE TABLE IF NOT EXISTS Features (id INTEGER PRIMARY KEY AUTOINCREMENT, \
     description_key TEXT NOT NULL, service_id INTEGER NOT NULL, \
     FOREIGN KEY (description_key) REFERENCES Descriptions(key), \
     FOREIGN KEY (service_id) REFERENCES Services(id) ON DELETE CASCADE);",
    COMMON_TAIL_SQL[0],
    COMMON_TAIL_SQL[1],
];

const SHARED_V1_SQL: &[&str] = &[
    COMMON_HEAD_SQL[0],
    COMMON_HEAD_SQL[1],
    COMMON_HEAD_SQL[2],
    COMMON_HEAD_SQL[3],
    COMMON_HEAD_SQL[4],
    COMMON_HEAD_SQL[5],
    COMMON_HEAD_SQL[6],
    "CREATE TABLE IF NOT EXISTS Services (id INTEGER PRIMARY KEY AUTOINCREMENT, \
     service_key TEXT UNIQUE NOT NULL, description_key TEXT NOT NULL, parent_id INTEGER, \
     FOREIGN KEY (description_key) REFERENCES Descriptions(key), \
     FOREIGN KEY (parent_id) REFERENCES Services(id) ON DELETE CASCADE);",
    "CREATE TABLE IF NOT EXISTS ServiceFirmware (id INTEGER PRIMARY KEY AUTOINCREMENT, \
     service_id INTEGER NOT NULL, firmware_id INTEGER NOT NULL, \
     UNIQUE(service_id, firmware_id), \
     FOREIGN KEY (service_id) REFERENCES Services(id) ON DELETE CASCADE, \
     FOREIGN KEY (firmware_id) REFERENCES FirmwareVersions(id) ON DELETE CASCADE);",
    "CREATE TABLE IF NOT EXISTS Features (id INTEGER PRIMARY KEY AUTOINCREMENT, \
     description_key TEXT NOT NULL, service_firmware_id INTEGER NOT NULL, \
     FOREIGN KEY (description_key) REFERENCES Descriptions(key), \
     FOREIGN KEY (service_firmware_id) REFERENCES ServiceFirmware(id) ON DELETE CASCADE);",
    COMMON_TAIL_SQL[0],
    COMMON_TAIL_SQL[1],
];

const SCOPED_V2_SQL: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_services_parent_firmware ON Services(parent_id, firmware_id);",
    "CREATE INDEX IF NOT EXISTS idx_features_service ON Features(service_id);",
    "CREATE INDEX IF NOT EXISTS idx_feature_component_feature ON FeatureComponent(feature_id);",
];

const SHARED_V2_SQL: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_services_parent ON Services(parent_id);",
    "CREATE INDEX IF NOT EXISTS idx_service_firmware_firmware ON ServiceFirmware(firmware_id);",
    "CREATE INDEX IF NOT EXISTS idx_features_link ON Features(service_firmware_id);",
    "CREATE INDEX IF NOT EXISTS idx_feature_component_feature ON FeatureComponent(feature_id);",
];

const SCOPED_MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        statements: SCOPED_V1_SQL,
        seed: Some(seed_reference_data),
    },
    Migration {
        version: 2,
        statements: SCOPED_V2_SQL,
        seed: None,
    },
];

const SHARED_MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        statements: SHARED_V1_SQL,
        seed: Some(seed_reference_data),
    },
    Migration {
        version: 2,
        statements: SHARED_V2_SQL,
        seed: None,
    },
];

/// Ordered script sets for a variant.
pub fn migrations(variant: SchemaVariant) -> &'static [Migration] {
    match variant {
        SchemaVariant::FirmwareScoped => SCOPED_MIGRATIONS,
        SchemaVariant::SharedServices => SHARED_MIGRATIONS,
    }
}

/// Highest version this build knows how to apply.
pub fn latest_version(variant: SchemaVariant) -> u32 {
    migrations(variant)
        .iter()
        .map(|m| m.version)
        .max()
        .unwrap_or(0)
}

/// Highest applied version, 0 for a fresh database.
pub fn current_version(conn: &Connection) -> Result<u32> {
    let version: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM Migrations;", [], |row| row.get(0))?;
    Ok(version.unwrap_or(0) as u32)
}

/// Seed the static component and limit catalogs.
fn seed_reference_data(conn: &Connection) -> rusqlite::Result<()> {
    for kind in ComponentKind::ALL {
        conn.execute(
            "INSERT OR IGNORE INTO Component (type, key) VALUES (?1, ?2);",
            params![kind.as_str(), kind.key()],
        )?;
    }
    for kind in LimitKind::ALL {
        conn.execute(
            "INSERT OR IGNORE INTO Limits (key) VALUES (?1);",
            params![kind.as_str()],
        )?;
    }
    Ok(())
}

/// Check (or record, on first open) which variant the database was created with.
fn check_variant(conn: &Connection, variant: SchemaVariant) -> Result<()> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM CatalogMeta WHERE key = 'schema_variant';",
            [],
            |row| row.get(0),
        )
        .optional()?;
    match stored {
        Some(s) => {
            let existing: SchemaVariant = s.parse()?;
            if existing != variant {
                return Err(CatalogError::Config(format!(
                    "database was created with the {existing} schema, opened as {variant}"
                )));
            }
        }
        None => {
            conn.execute(
                "INSERT INTO CatalogMeta (key, value) VALUES ('schema_variant', ?1);",
                params![variant.as_str()],
            )?;
        }
    }
    Ok(())
}

/// Create bookkeeping tables and apply every script set newer than the
/// recorded version. Returns the number of script sets applied.
pub fn migrate(conn: &Connection, variant: SchemaVariant) -> Result<usize> {
    for sql in BOOTSTRAP_SQL {
        conn.execute_batch(sql)?;
    }
    check_variant(conn, variant)?;

    let current = current_version(conn)?;
    tracing::debug!("catalog schema at version {}", current);

    let mut applied = 0;
    for migration in migrations(variant) {
        if migration.version <= current {
            continue;
        }
        tracing::info!(
            "applying {} schema version {}",
            variant,
            migration.version
        );
        let tx = conn.unchecked_transaction()?;
        for sql in migration.statements {
            tx.execute_batch(sql)?;
        }
        if let Some(seed) = migration.seed {
            seed(&tx)?;
        }
        tx.execute(
            "INSERT INTO Migrations (version, applied_at) VALUES (?1, ?2);",
            params![migration.version, chrono::Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        applied += 1;
    }
    Ok(applied)
}
