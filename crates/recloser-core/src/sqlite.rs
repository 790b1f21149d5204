//! SQLite-backed catalog store.
//!
//! One `Mutex<Connection>` is shared by every caller, so writes serialize on it.
//! Reads through [`SqliteCatalog`] lock per query; reads through a
//! [`SqliteSnapshot`] hold the lock and one read transaction for the snapshot's
//! whole lifetime.

use crate::config::RecloserConfig;
use crate::error::{CatalogError, Result};
use crate::model::{
    BindingId, ComponentBinding, ComponentType, Feature, FeatureId, FirmwareId, FirmwareVersion,
    Language, LimitType, LimitValue, NewService, Recloser, RecloserId, Service, ServiceId,
    Translation,
};
use crate::schema::{self, SchemaVariant};
use crate::store::CatalogStore;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Service/feature statements that differ between storage shapes.
struct ServiceQueries {
    roots: &'static str,
    children: &'static str,
    by_id: &'static str,
    features: &'static str,
    feature_insert: &'static str,
    feature_update: &'static str,
}

const SCOPED_QUERIES: ServiceQueries = ServiceQueries {
    roots: "SELECT id, service_key, description_key, parent_id, firmware_id FROM Services \
            WHERE parent_id IS NULL AND firmware_id = ?1 ORDER BY id;",
    children: "SELECT id, service_key, description_key, parent_id, firmware_id FROM Services \
               WHERE parent_id = ?1 AND firmware_id = ?2 ORDER BY id;",
    by_id: "SELECT id, service_key, description_key, parent_id, firmware_id FROM Services \
            WHERE id = ?1;",
    features: "SELECT id, description_key, service_id FROM Features \
               WHERE service_id = ?1 ORDER BY id;",
    feature_insert: "INSERT INTO Features (description_key, service_id) VALUES (?1, ?2);",
    feature_update: "UPDATE Features SET description_key = ?1, service_id = ?2 WHERE id = ?3;",
};

// The ServiceId handed out in this shape is the ServiceFirmware link id.
const SHARED_QUERIES: ServiceQueries = ServiceQueries {
    roots: "SELECT sf.id, s.service_key, s.description_key, NULL, sf.firmware_id \
            FROM ServiceFirmware sf JOIN Services s ON s.id = sf.service_id \
            WHERE s.parent_id IS NULL AND sf.firmware_id = ?1 ORDER BY sf.id;",
    children: "SELECT sf.id, s.service_key, s.description_key, psf.id, sf.firmware_id \
               FROM ServiceFirmware sf JOIN Services s ON s.id = sf.service_id \
               JOIN ServiceFirmware psf ON psf.service_id = s.parent_id \
               AND psf.firmware_id = sf.firmware_id \
               WHERE psf.id = ?1 AND sf.firmware_id = ?2 ORDER BY sf.id;",
    by_id: "SELECT sf.id, s.service_key, s.description_key, psf.id, sf.firmware_id \
            FROM ServiceFirmware sf JOIN Services s ON s.id = sf.service_id \
            LEFT JOIN ServiceFirmware psf ON psf.service_id = s.parent_id \
            AND psf.firmware_id = sf.firmware_id \
            WHERE sf.id = ?1;",
    features: "SELECT id, description_key, service_firmware_id FROM Features \
               WHERE service_firmware_id = ?1 ORDER BY id;",
    feature_insert: "INSERT INTO Features (description_key, service_firmware_id) VALUES (?1, ?2);",
    feature_update: "UPDATE Features SET description_key = ?1, service_firmware_id = ?2 \
                     WHERE id = ?3;",
};

fn queries(variant: SchemaVariant) -> &'static ServiceQueries {
    match variant {
        SchemaVariant::FirmwareScoped => &SCOPED_QUERIES,
        SchemaVariant::SharedServices => &SHARED_QUERIES,
    }
}

fn service_from_row(row: &Row<'_>) -> rusqlite::Result<Service> {
    Ok(Service {
        id: row.get(0)?,
        service_key: row.get(1)?,
        description_key: row.get(2)?,
        parent_id: row.get(3)?,
        firmware_id: row.get(4)?,
    })
}

fn feature_from_row(row: &Row<'_>) -> rusqlite::Result<Feature> {
    Ok(Feature {
        id: row.get(0)?,
        description_key: row.get(1)?,
        service_id: row.get(2)?,
    })
}

fn firmware_from_row(row: &Row<'_>) -> rusqlite::Result<FirmwareVersion> {
    Ok(FirmwareVersion {
        id: row.get(0)?,
        version: row.get(1)?,
        recloser_id: row.get(2)?,
    })
}

/// Borrowed connection plus storage shape; the one place read SQL lives.
struct Reader<'c> {
    conn: &'c Connection,
    variant: SchemaVariant,
}

impl Reader<'_> {
    fn list<T>(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
        map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params, map)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn exists(&self, sql: &str, id: i64) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(sql, params![id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }
}

impl CatalogStore for Reader<'_> {
    fn translations_for(&self, key: &str) -> Result<Vec<Translation>> {
        self.list(
            "SELECT language_code, value FROM Translations \
             WHERE description_key = ?1 ORDER BY id;",
            params![key],
            |row| {
                Ok(Translation {
                    language_code: row.get(0)?,
                    value: row.get(1)?,
                })
            },
        )
    }

    fn translation_for(&self, key: &str, language_code: &str) -> Result<String> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM Translations \
                 WHERE description_key = ?1 AND language_code = ?2;",
                params![key, language_code],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.unwrap_or_default())
    }

    fn services_by(
        &self,
        parent: Option<ServiceId>,
        firmware: FirmwareId,
    ) -> Result<Vec<Service>> {
        let q = queries(self.variant);
        match parent {
            None => self.list(q.roots, params![firmware], service_from_row),
            Some(parent) => self.list(q.children, params![parent, firmware], service_from_row),
        }
    }

    fn service(&self, id: ServiceId) -> Result<Option<Service>> {
        Ok(self
            .conn
            .query_row(queries(self.variant).by_id, params![id], service_from_row)
            .optional()?)
    }

    fn features_by(&self, service: ServiceId) -> Result<Vec<Feature>> {
        self.list(
            queries(self.variant).features,
            params![service],
            feature_from_row,
        )
    }

    fn bindings_for(&self, feature: FeatureId) -> Result<Vec<ComponentBinding>> {
        self.list(
            "SELECT fc.id, c.id, c.type, c.key FROM FeatureComponent fc \
             JOIN Component c ON c.id = fc.component_id \
             WHERE fc.feature_id = ?1 ORDER BY fc.id;",
            params![feature],
            |row| {
                Ok(ComponentBinding {
                    binding_id: row.get(0)?,
                    component: ComponentType {
                        id: row.get(1)?,
                        type_name: row.get(2)?,
                        key: row.get(3)?,
                    },
                })
            },
        )
    }

    fn limits_for(&self, binding: BindingId) -> Result<Vec<LimitValue>> {
        self.list(
            "SELECT l.key, fcl.value FROM FeatureComponentLimits fcl \
             JOIN Limits l ON l.id = fcl.limit_id \
             WHERE fcl.feature_component_id = ?1 ORDER BY fcl.id;",
            params![binding],
            |row| {
                Ok(LimitValue {
                    key: row.get(0)?,
                    value: row.get(1)?,
                })
            },
        )
    }

    fn reclosers(&self) -> Result<Vec<Recloser>> {
        self.list(
            "SELECT id, description_key, model FROM Reclosers ORDER BY id;",
            [],
            |row| {
                Ok(Recloser {
                    id: row.get(0)?,
                    description_key: row.get(1)?,
                    model: row.get(2)?,
                })
            },
        )
    }

    fn firmware_versions_for(&self, recloser: RecloserId) -> Result<Vec<FirmwareVersion>> {
        self.list(
            "SELECT id, version, recloser_id FROM FirmwareVersions \
             WHERE recloser_id = ?1 ORDER BY id;",
            params![recloser],
            firmware_from_row,
        )
    }

    fn firmware(&self, id: FirmwareId) -> Result<Option<FirmwareVersion>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, version, recloser_id FROM FirmwareVersions WHERE id = ?1;",
                params![id],
                firmware_from_row,
            )
            .optional()?)
    }

    fn languages(&self) -> Result<Vec<Language>> {
        self.list(
            "SELECT code, name FROM Languages ORDER BY rowid;",
            [],
            |row| {
                Ok(Language {
                    code: row.get(0)?,
                    display_name: row.get(1)?,
                })
            },
        )
    }

    fn component_types(&self) -> Result<Vec<ComponentType>> {
        self.list(
            "SELECT id, type, key FROM Component ORDER BY id;",
            [],
            |row| {
                Ok(ComponentType {
                    id: row.get(0)?,
                    type_name: row.get(1)?,
                    key: row.get(2)?,
                })
            },
        )
    }

    fn limit_types(&self) -> Result<Vec<LimitType>> {
        self.list("SELECT id, key FROM Limits ORDER BY id;", [], |row| {
            Ok(LimitType {
                id: row.get(0)?,
                key: row.get(1)?,
            })
        })
    }
}

/// The catalog store backed by one SQLite database.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
    variant: SchemaVariant,
}

impl std::fmt::Debug for SqliteCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCatalog")
            .field("variant", &self.variant)
            .finish()
    }
}

impl SqliteCatalog {
    /// Open or create a catalog at `path`, applying pending schema versions.
    pub fn open(path: &Path, variant: SchemaVariant) -> Result<Self> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir).map_err(|e| {
                CatalogError::StoreUnavailable(format!(
                    "failed to create {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        tracing::debug!("opened catalog {}", path.display());
        Self::init(conn, variant)
    }

    /// Open the catalog a project's configuration points at.
    pub fn open_configured(config: &RecloserConfig, project_root: &Path) -> Result<Self> {
        Self::open(&config.database_path(project_root), config.store.schema)
    }

    /// Create an in-memory catalog (useful for tests).
    pub fn open_in_memory(variant: SchemaVariant) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, variant)
    }

    fn init(conn: Connection, variant: SchemaVariant) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        schema::migrate(&conn, variant)?;
        Ok(Self {
            conn: Mutex::new(conn),
            variant,
        })
    }

    pub fn variant(&self) -> SchemaVariant {
        self.variant
    }

    /// Applied schema version.
    pub fn schema_version(&self) -> Result<u32> {
        schema::current_version(&*self.lock()?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CatalogError::StoreUnavailable(e.to_string()))
    }

    fn read<T>(&self, f: impl FnOnce(&Reader<'_>) -> Result<T>) -> Result<T> {
        let conn = self.lock()?;
        f(&Reader {
            conn: &conn,
            variant: self.variant,
        })
    }

    /// Run `f` inside one write transaction.
    fn write<T>(&self, f: impl FnOnce(&Reader<'_>) -> Result<T>) -> Result<T> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let out = f(&Reader {
            conn: &tx,
            variant: self.variant,
        })?;
        tx.commit()?;
        Ok(out)
    }

    fn require(&self, required: SchemaVariant) -> Result<()> {
        if self.variant == required {
            Ok(())
        } else {
            Err(CatalogError::UnsupportedSchema {
                required,
                actual: self.variant,
            })
        }
    }

    /// Hold the connection and one read transaction until the snapshot drops.
    pub fn snapshot(&self) -> Result<SqliteSnapshot<'_>> {
        let conn = self.lock()?;
        conn.execute_batch("BEGIN DEFERRED;")?;
        Ok(SqliteSnapshot {
            conn,
            variant: self.variant,
        })
    }

    /// Run one derived read, inside a snapshot when `snapshot` is set.
    pub fn read_with<T>(
        &self,
        snapshot: bool,
        f: impl FnOnce(&dyn CatalogStore) -> Result<T>,
    ) -> Result<T> {
        if snapshot {
            let snap = self.snapshot()?;
            f(&snap)
        } else {
            f(self)
        }
    }

    // ---------------------------------------------------------------------
    // Languages and translations
    // ---------------------------------------------------------------------

    pub fn add_language(&self, code: &str, display_name: &str) -> Result<()> {
        if code.trim().is_empty() {
            return Err(CatalogError::InvalidInput(
                "language code must not be empty".into(),
            ));
        }
        self.write(|r| {
            r.conn.execute(
                "INSERT INTO Languages (code, name) VALUES (?1, ?2) \
                 ON CONFLICT(code) DO UPDATE SET name = excluded.name;",
                params![code, display_name],
            )?;
            Ok(())
        })
    }

    pub fn add_description_key(&self, key: &str) -> Result<()> {
        self.write(|r| ensure_description_key(r.conn, key))
    }

    /// Insert or replace the translation of `key` in `language_code`.
    pub fn add_translation(&self, key: &str, language_code: &str, value: &str) -> Result<()> {
        self.write(|r| put_translation(r, key, language_code, value))
    }

    /// Register a description key together with its translations, atomically.
    pub fn add_key_with_translations(&self, key: &str, translations: &[(&str, &str)]) -> Result<()> {
        self.write(|r| {
            ensure_description_key(r.conn, key)?;
            for (language_code, value) in translations {
                put_translation(r, key, language_code, value)?;
            }
            Ok(())
        })
    }

    // ---------------------------------------------------------------------
    // Reclosers and firmware
    // ---------------------------------------------------------------------

    pub fn add_recloser(&self, description_key: &str, model: &str) -> Result<RecloserId> {
        self.write(|r| {
            ensure_description_key(r.conn, description_key)?;
            r.conn.execute(
                "INSERT INTO Reclosers (description_key, model) VALUES (?1, ?2);",
                params![description_key, model],
            )?;
            Ok(r.conn.last_insert_rowid())
        })
    }

    pub fn update_recloser(&self, id: RecloserId, description_key: &str, model: &str) -> Result<()> {
        self.write(|r| {
            ensure_description_key(r.conn, description_key)?;
            let n = r.conn.execute(
                "UPDATE Reclosers SET description_key = ?1, model = ?2 WHERE id = ?3;",
                params![description_key, model, id],
            )?;
            expect_row(n, "recloser", id)
        })
    }

    /// Delete a recloser; its firmware versions (and their services) cascade.
    pub fn delete_recloser(&self, id: RecloserId) -> Result<()> {
        self.write(|r| {
            let n = r
                .conn
                .execute("DELETE FROM Reclosers WHERE id = ?1;", params![id])?;
            expect_row(n, "recloser", id)
        })
    }

    pub fn add_firmware(&self, version: &str, recloser_id: RecloserId) -> Result<FirmwareId> {
        self.write(|r| {
            require_recloser(r, recloser_id)?;
            r.conn.execute(
                "INSERT INTO FirmwareVersions (version, recloser_id) VALUES (?1, ?2);",
                params![version, recloser_id],
            )?;
            Ok(r.conn.last_insert_rowid())
        })
    }

    pub fn update_firmware(&self, id: FirmwareId, version: &str, recloser_id: RecloserId) -> Result<()> {
        self.write(|r| {
            require_recloser(r, recloser_id)?;
            let n = r.conn.execute(
                "UPDATE FirmwareVersions SET version = ?1, recloser_id = ?2 WHERE id = ?3;",
                params![version, recloser_id, id],
            )?;
            expect_row(n, "firmware", id)
        })
    }

    pub fn delete_firmware(&self, id: FirmwareId) -> Result<()> {
        self.write(|r| {
            let n = r
                .conn
                .execute("DELETE FROM FirmwareVersions WHERE id = ?1;", params![id])?;
            expect_row(n, "firmware", id)
        })
    }

    // ---------------------------------------------------------------------
    // Services (firmware-scoped shape)
    // ---------------------------------------------------------------------

    /// Insert a service into a firmware tree. The parent, if any, must live in
    /// the same firmware.
    pub fn add_service(&self, new: &NewService) -> Result<ServiceId> {
        self.require(SchemaVariant::FirmwareScoped)?;
        self.write(|r| {
            if r.firmware(new.firmware_id)?.is_none() {
                return Err(CatalogError::not_found("firmware", new.firmware_id));
            }
            if let Some(parent_id) = new.parent_id {
                check_parent_firmware(r, parent_id, new.firmware_id)?;
            }
            ensure_description_key(r.conn, &new.description_key)?;
            r.conn.execute(
                "INSERT INTO Services (service_key, description_key, parent_id, firmware_id) \
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    new.service_key,
                    new.description_key,
                    new.parent_id,
                    new.firmware_id
                ],
            )?;
            Ok(r.conn.last_insert_rowid())
        })
    }

    /// Rewrite a service. Rejects parents in another firmware and parents that
    /// would close a cycle.
    pub fn update_service(&self, id: ServiceId, new: &NewService) -> Result<()> {
        self.require(SchemaVariant::FirmwareScoped)?;
        self.write(|r| {
            let current = r
                .service(id)?
                .ok_or_else(|| CatalogError::not_found("service", id))?;
            if r.firmware(new.firmware_id)?.is_none() {
                return Err(CatalogError::not_found("firmware", new.firmware_id));
            }
            if current.firmware_id != new.firmware_id
                && !r.services_by(Some(id), current.firmware_id)?.is_empty()
            {
                return Err(CatalogError::InvalidInput(format!(
                    "service {id} has children in firmware {}; move them first",
                    current.firmware_id
                )));
            }
            if let Some(parent_id) = new.parent_id {
                check_parent_firmware(r, parent_id, new.firmware_id)?;
                check_no_cycle(r, id, parent_id)?;
            }
            ensure_description_key(r.conn, &new.description_key)?;
            r.conn.execute(
                "UPDATE Services SET service_key = ?1, description_key = ?2, parent_id = ?3, \
                 firmware_id = ?4 WHERE id = ?5;",
                params![
                    new.service_key,
                    new.description_key,
                    new.parent_id,
                    new.firmware_id,
                    id
                ],
            )?;
            Ok(())
        })
    }

    /// Delete a service with its subtree. Firmware-scoped: the row (children
    /// cascade). Shared: the service's link and the links of its descendants in
    /// the same firmware, with the features hanging off them.
    pub fn delete_service(&self, id: ServiceId) -> Result<()> {
        self.write(|r| match r.variant {
            SchemaVariant::FirmwareScoped => {
                let n = r
                    .conn
                    .execute("DELETE FROM Services WHERE id = ?1;", params![id])?;
                expect_row(n, "service", id)
            }
            SchemaVariant::SharedServices => {
                let root = r
                    .service(id)?
                    .ok_or_else(|| CatalogError::not_found("service", id))?;
                let mut links = vec![id];
                let mut seen = HashSet::from([id]);
                let mut next = 0;
                while next < links.len() {
                    for child in r.services_by(Some(links[next]), root.firmware_id)? {
                        if seen.insert(child.id) {
                            links.push(child.id);
                        }
                    }
                    next += 1;
                }
                for link in links.iter().rev() {
                    r.conn
                        .execute("DELETE FROM ServiceFirmware WHERE id = ?1;", params![link])?;
                }
                tracing::debug!("deleted {} service link(s) under {}", links.len(), id);
                Ok(())
            }
        })
    }

    // ---------------------------------------------------------------------
    // Services (shared shape)
    // ---------------------------------------------------------------------

    /// Create a shared service definition. Returns the definition id, which is
    /// not a [`ServiceId`]; link it to a firmware to obtain one.
    pub fn add_shared_service(
        &self,
        service_key: &str,
        description_key: &str,
        parent: Option<i64>,
    ) -> Result<i64> {
        self.require(SchemaVariant::SharedServices)?;
        self.write(|r| {
            if let Some(parent) = parent
                && !r.exists("SELECT id FROM Services WHERE id = ?1;", parent)?
            {
                return Err(CatalogError::not_found("shared service", parent));
            }
            ensure_description_key(r.conn, description_key)?;
            r.conn.execute(
                "INSERT INTO Services (service_key, description_key, parent_id) \
                 VALUES (?1, ?2, ?3);",
                params![service_key, description_key, parent],
            )?;
            Ok(r.conn.last_insert_rowid())
        })
    }

    /// Link a shared definition to a firmware; idempotent. Returns the link id.
    pub fn link_service(&self, shared_service: i64, firmware: FirmwareId) -> Result<ServiceId> {
        self.require(SchemaVariant::SharedServices)?;
        self.write(|r| {
            if !r.exists("SELECT id FROM Services WHERE id = ?1;", shared_service)? {
                return Err(CatalogError::not_found("shared service", shared_service));
            }
            if r.firmware(firmware)?.is_none() {
                return Err(CatalogError::not_found("firmware", firmware));
            }
            r.conn.execute(
                "INSERT OR IGNORE INTO ServiceFirmware (service_id, firmware_id) VALUES (?1, ?2);",
                params![shared_service, firmware],
            )?;
            let id = r.conn.query_row(
                "SELECT id FROM ServiceFirmware WHERE service_id = ?1 AND firmware_id = ?2;",
                params![shared_service, firmware],
                |row| row.get(0),
            )?;
            Ok(id)
        })
    }

    pub fn unlink_service(&self, shared_service: i64, firmware: FirmwareId) -> Result<()> {
        self.require(SchemaVariant::SharedServices)?;
        self.write(|r| {
            let n = r.conn.execute(
                "DELETE FROM ServiceFirmware WHERE service_id = ?1 AND firmware_id = ?2;",
                params![shared_service, firmware],
            )?;
            expect_row(n, "service link", format!("{shared_service}@{firmware}"))
        })
    }

    // ---------------------------------------------------------------------
    // Features, components and limits
    // ---------------------------------------------------------------------

    pub fn add_feature(&self, description_key: &str, service: ServiceId) -> Result<FeatureId> {
        self.write(|r| {
            if r.service(service)?.is_none() {
                return Err(CatalogError::not_found("service", service));
            }
            ensure_description_key(r.conn, description_key)?;
            r.conn.execute(
                queries(r.variant).feature_insert,
                params![description_key, service],
            )?;
            Ok(r.conn.last_insert_rowid())
        })
    }

    pub fn update_feature(&self, id: FeatureId, description_key: &str, service: ServiceId) -> Result<()> {
        self.write(|r| {
            if r.service(service)?.is_none() {
                return Err(CatalogError::not_found("service", service));
            }
            ensure_description_key(r.conn, description_key)?;
            let n = r.conn.execute(
                queries(r.variant).feature_update,
                params![description_key, service, id],
            )?;
            expect_row(n, "feature", id)
        })
    }

    pub fn delete_feature(&self, id: FeatureId) -> Result<()> {
        self.write(|r| {
            let n = r
                .conn
                .execute("DELETE FROM Features WHERE id = ?1;", params![id])?;
            expect_row(n, "feature", id)
        })
    }

    /// Bind a component type (matched by name, ignoring case) to a feature.
    pub fn bind_component(&self, feature: FeatureId, component_type: &str) -> Result<BindingId> {
        self.write(|r| {
            if !r.exists("SELECT id FROM Features WHERE id = ?1;", feature)? {
                return Err(CatalogError::not_found("feature", feature));
            }
            let component: Option<i64> = r
                .conn
                .query_row(
                    "SELECT id FROM Component WHERE type = ?1 COLLATE NOCASE;",
                    params![component_type],
                    |row| row.get(0),
                )
                .optional()?;
            let component =
                component.ok_or_else(|| CatalogError::not_found("component type", component_type))?;
            r.conn.execute(
                "INSERT INTO FeatureComponent (feature_id, component_id) VALUES (?1, ?2);",
                params![feature, component],
            )?;
            Ok(r.conn.last_insert_rowid())
        })
    }

    /// Set (or replace) one limit value on a binding.
    pub fn set_limit(&self, binding: BindingId, limit_key: &str, value: &str) -> Result<()> {
        self.write(|r| {
            if !r.exists("SELECT id FROM FeatureComponent WHERE id = ?1;", binding)? {
                return Err(CatalogError::not_found("component binding", binding));
            }
            let limit: Option<i64> = r
                .conn
                .query_row(
                    "SELECT id FROM Limits WHERE key = ?1;",
                    params![limit_key],
                    |row| row.get(0),
                )
                .optional()?;
            let limit = limit.ok_or_else(|| CatalogError::not_found("limit type", limit_key))?;
            r.conn.execute(
                "INSERT INTO FeatureComponentLimits (feature_component_id, limit_id, value) \
                 VALUES (?1, ?2, ?3) \
                 ON CONFLICT(feature_component_id, limit_id) DO UPDATE SET value = excluded.value;",
                params![binding, limit, value],
            )?;
            Ok(())
        })
    }

    /// Remove a component binding; its limit values go with it.
    pub fn unbind_component(&self, binding: BindingId) -> Result<()> {
        self.write(|r| {
            let n = r
                .conn
                .execute("DELETE FROM FeatureComponent WHERE id = ?1;", params![binding])?;
            expect_row(n, "component binding", binding)
        })
    }

    /// Remove one limit value from a binding.
    pub fn remove_limit(&self, binding: BindingId, limit_key: &str) -> Result<()> {
        self.write(|r| {
            let n = r.conn.execute(
                "DELETE FROM FeatureComponentLimits WHERE feature_component_id = ?1 \
                 AND limit_id = (SELECT id FROM Limits WHERE key = ?2);",
                params![binding, limit_key],
            )?;
            expect_row(n, "limit", format!("{limit_key}@{binding}"))
        })
    }
}

fn ensure_description_key(conn: &Connection, key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(CatalogError::InvalidInput(
            "description key must not be empty".into(),
        ));
    }
    conn.execute(
        "INSERT OR IGNORE INTO Descriptions (key) VALUES (?1);",
        params![key],
    )?;
    Ok(())
}

fn put_translation(r: &Reader<'_>, key: &str, language_code: &str, value: &str) -> Result<()> {
    let known: Option<String> = r
        .conn
        .query_row(
            "SELECT code FROM Languages WHERE code = ?1;",
            params![language_code],
            |row| row.get(0),
        )
        .optional()?;
    if known.is_none() {
        return Err(CatalogError::not_found("language", language_code));
    }
    ensure_description_key(r.conn, key)?;
    r.conn.execute(
        "INSERT INTO Translations (description_key, language_code, value) VALUES (?1, ?2, ?3) \
         ON CONFLICT(description_key, language_code) DO UPDATE SET value = excluded.value;",
        params![key, language_code, value],
    )?;
    Ok(())
}

fn require_recloser(r: &Reader<'_>, id: RecloserId) -> Result<()> {
    if r.exists("SELECT id FROM Reclosers WHERE id = ?1;", id)? {
        Ok(())
    } else {
        Err(CatalogError::not_found("recloser", id))
    }
}

fn expect_row(affected: usize, entity: &'static str, id: impl ToString) -> Result<()> {
    if affected == 0 {
        Err(CatalogError::not_found(entity, id))
    } else {
        Ok(())
    }
}

fn check_parent_firmware(r: &Reader<'_>, parent_id: ServiceId, firmware: FirmwareId) -> Result<()> {
    let parent = r
        .service(parent_id)?
        .ok_or_else(|| CatalogError::not_found("parent service", parent_id))?;
    if parent.firmware_id != firmware {
        return Err(CatalogError::InvalidInput(format!(
            "parent service {} belongs to firmware {}, not {}",
            parent_id, parent.firmware_id, firmware
        )));
    }
    Ok(())
}

/// Walk up from `new_parent`; reaching `id` means the update would close a loop.
fn check_no_cycle(r: &Reader<'_>, id: ServiceId, new_parent: ServiceId) -> Result<()> {
    let mut seen = HashSet::new();
    let mut cursor = Some(new_parent);
    while let Some(current) = cursor {
        if current == id {
            return Err(CatalogError::CycleDetected { service_id: id });
        }
        if !seen.insert(current) {
            // Pre-existing loop above the new parent.
            return Err(CatalogError::CycleDetected {
                service_id: current,
            });
        }
        cursor = r.service(current)?.and_then(|s| s.parent_id);
    }
    Ok(())
}

impl CatalogStore for SqliteCatalog {
    fn translations_for(&self, key: &str) -> Result<Vec<Translation>> {
        self.read(|r| r.translations_for(key))
    }

    fn translation_for(&self, key: &str, language_code: &str) -> Result<String> {
        self.read(|r| r.translation_for(key, language_code))
    }

    fn services_by(
        &self,
        parent: Option<ServiceId>,
        firmware: FirmwareId,
    ) -> Result<Vec<Service>> {
        self.read(|r| r.services_by(parent, firmware))
    }

    fn service(&self, id: ServiceId) -> Result<Option<Service>> {
        self.read(|r| r.service(id))
    }

    fn features_by(&self, service: ServiceId) -> Result<Vec<Feature>> {
        self.read(|r| r.features_by(service))
    }

    fn bindings_for(&self, feature: FeatureId) -> Result<Vec<ComponentBinding>> {
        self.read(|r| r.bindings_for(feature))
    }

    fn limits_for(&self, binding: BindingId) -> Result<Vec<LimitValue>> {
        self.read(|r| r.limits_for(binding))
    }

    fn reclosers(&self) -> Result<Vec<Recloser>> {
        self.read(|r| r.reclosers())
    }

    fn firmware_versions_for(&self, recloser: RecloserId) -> Result<Vec<FirmwareVersion>> {
        self.read(|r| r.firmware_versions_for(recloser))
    }

    fn firmware(&self, id: FirmwareId) -> Result<Option<FirmwareVersion>> {
        self.read(|r| r.firmware(id))
    }

    fn languages(&self) -> Result<Vec<Language>> {
        self.read(|r| r.languages())
    }

    fn component_types(&self) -> Result<Vec<ComponentType>> {
        self.read(|r| r.component_types())
    }

    fn limit_types(&self) -> Result<Vec<LimitType>> {
        self.read(|r| r.limit_types())
    }
}

/// A consistent read view: the connection lock and one read transaction, held
/// until drop.
pub struct SqliteSnapshot<'a> {
    conn: MutexGuard<'a, Connection>,
    variant: SchemaVariant,
}

impl SqliteSnapshot<'_> {
    fn reader(&self) -> Reader<'_> {
        Reader {
            conn: &self.conn,
            variant: self.variant,
        }
    }
}

impl Drop for SqliteSnapshot<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.conn.execute_batch("COMMIT;") {
            tracing::warn!("failed to close read snapshot: {}", e);
        }
    }
}

impl CatalogStore for SqliteSnapshot<'_> {
    fn translations_for(&self, key: &str) -> Result<Vec<Translation>> {
        self.reader().translations_for(key)
    }

    fn translation_for(&self, key: &str, language_code: &str) -> Result<String> {
        self.reader().translation_for(key, language_code)
    }

    fn services_by(
        &self,
        parent: Option<ServiceId>,
        firmware: FirmwareId,
    ) -> Result<Vec<Service>> {
        self.reader().services_by(parent, firmware)
    }

    fn service(&self, id: ServiceId) -> Result<Option<Service>> {
        self.reader().service(id)
    }

    fn features_by(&self, service: ServiceId) -> Result<Vec<Feature>> {
        self.reader().features_by(service)
    }

    fn bindings_for(&self, feature: FeatureId) -> Result<Vec<ComponentBinding>> {
        self.reader().bindings_for(feature)
    }

    fn limits_for(&self, binding: BindingId) -> Result<Vec<LimitValue>> {
        self.reader().limits_for(binding)
    }

    fn reclosers(&self) -> Result<Vec<Recloser>> {
        self.reader().reclosers()
    }

    fn firmware_versions_for(&self, recloser: RecloserId) -> Result<Vec<FirmwareVersion>> {
        self.reader().firmware_versions_for(recloser)
    }

    fn firmware(&self, id: FirmwareId) -> Result<Option<FirmwareVersion>> {
        self.reader().firmware(id)
    }

    fn languages(&self) -> Result<Vec<Language>> {
        self.reader().languages()
    }

    fn component_types(&self) -> Result<Vec<ComponentType>> {
        self.reader().component_types()
    }

    fn limit_types(&self) -> Result<Vec<LimitType>> {
        self.reader().limit_types()
    }
}
