use super::{Catalog, Element, ElementKind, Scope};
use crate::config::AppConfig;
use crate::error::Error;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Params};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const FEATURES: &str = "features";
const ATTRIBUTES: &str = "attributes";
const RTREE_EXTENSION: &str = "gpkg_rtree_index";

/// Optional tables keyed by `table_name` that describe a single content table.
/// `gpkg_ogr_contents` is written by GDAL.
const PER_TABLE_METADATA: [&str; 3] = [
    "gpkg_ogr_contents",
    "gpkg_data_columns",
    "gpkg_metadata_reference",
];

/// "GPKG" in ASCII.
const GPKG_APPLICATION_ID: i64 = 0x4750_4B47;
const GPKG_USER_VERSION: i64 = 10300;

/// OGC GeoPackage backed geodatabase.
///
/// Feature classes are `features` entries of `gpkg_contents`, plain tables are
/// `attributes` entries. Feature datasets come from the `gdb_feature_datasets`
/// extension; a GeoPackage without it has no datasets.
pub struct GeoPackage {
    conn: Connection,
    location: String,
}

impl GeoPackage {
    /// Open an existing GeoPackage for sweeping. Never creates the file.
    pub fn open(path: impl AsRef<Path>, config: &AppConfig) -> Result<Self, Error> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::Inaccessible(path.display().to_string()));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let gpkg = GeoPackage {
            conn,
            location: path.display().to_string(),
        };
        gpkg.configure_pragmas(config.busy_timeout_ms)?;
        Ok(gpkg)
    }

    /// Create (or upgrade) a GeoPackage file with the core tables in place.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        let gpkg = GeoPackage {
            conn,
            location: path.display().to_string(),
        };
        gpkg.configure_pragmas(AppConfig::default().busy_timeout_ms)?;
        gpkg.bootstrap()?;
        Ok(gpkg)
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()?;
        let gpkg = GeoPackage {
            conn,
            location: ":memory:".to_string(),
        };
        gpkg.configure_pragmas(AppConfig::default().busy_timeout_ms)?;
        gpkg.bootstrap()?;
        Ok(gpkg)
    }

    fn configure_pragmas(&self, busy_timeout_ms: u64) -> Result<(), Error> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn
            .busy_timeout(Duration::from_millis(busy_timeout_ms))?;
        debug!(
            "SQLite pragmas configured (foreign keys on, busy timeout {}ms)",
            busy_timeout_ms
        );
        Ok(())
    }

    fn bootstrap(&self) -> Result<(), Error> {
        self.conn.execute_batch(&format!(
            "PRAGMA application_id = {};
             PRAGMA user_version = {};",
            GPKG_APPLICATION_ID, GPKG_USER_VERSION
        ))?;
        self.conn.execute_batch(include_str!("schema.sql"))?;
        debug!("GeoPackage core tables initialized");
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // ── Authoring ────────────────────────────────────────────────

    pub fn create_dataset(&self, name: &str) -> Result<(), Error> {
        self.ensure_dataset_extension()?;
        self.conn.execute(
            "INSERT INTO gdb_feature_datasets (name) VALUES (?1)",
            params![name],
        )?;
        Ok(())
    }

    /// Create an empty feature class with an `fid` key, a `geom` blob and a
    /// `label` text column, optionally placed inside a feature dataset.
    pub fn create_feature_class(&self, dataset: Option<&str>, name: &str) -> Result<(), Error> {
        if let Some(ds) = dataset {
            if !self.dataset_exists(ds)? {
                return Err(Error::NotFound(format!("dataset {}", ds)));
            }
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(&format!(
            "CREATE TABLE {} (fid INTEGER PRIMARY KEY AUTOINCREMENT, geom BLOB, label TEXT)",
            quote_ident(name)
        ))?;
        tx.execute(
            "INSERT INTO gpkg_contents (table_name, data_type, identifier, srs_id) \
             VALUES (?1, ?2, ?1, 4326)",
            params![name, FEATURES],
        )?;
        tx.execute(
            "INSERT INTO gpkg_geometry_columns \
             (table_name, column_name, geometry_type_name, srs_id, z, m) \
             VALUES (?1, 'geom', 'GEOMETRY', 4326, 0, 0)",
            params![name],
        )?;
        if let Some(ds) = dataset {
            tx.execute(
                "INSERT INTO gdb_feature_dataset_members (table_name, dataset_name) \
                 VALUES (?1, ?2)",
                params![name, ds],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn create_table(&self, name: &str) -> Result<(), Error> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(&format!(
            "CREATE TABLE {} (fid INTEGER PRIMARY KEY AUTOINCREMENT, label TEXT)",
            quote_ident(name)
        ))?;
        tx.execute(
            "INSERT INTO gpkg_contents (table_name, data_type, identifier) VALUES (?1, ?2, ?1)",
            params![name, ATTRIBUTES],
        )?;
        tx.commit()?;
        Ok(())
    }

    // ── Catalog queries ──────────────────────────────────────────

    fn table_exists(&self, name: &str) -> Result<bool, Error> {
        let found = self
            .conn
            .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?
            .exists(params![name])?;
        Ok(found)
    }

    fn has_dataset_extension(&self) -> Result<bool, Error> {
        Ok(self.table_exists("gdb_feature_datasets")?
            && self.table_exists("gdb_feature_dataset_members")?)
    }

    fn ensure_dataset_extension(&self) -> Result<(), Error> {
        if !self.has_dataset_extension()? {
            self.conn.execute_batch(include_str!("datasets.sql"))?;
            debug!("Registered gdb_feature_datasets extension");
        }
        Ok(())
    }

    fn dataset_exists(&self, name: &str) -> Result<bool, Error> {
        if !self.has_dataset_extension()? {
            return Ok(false);
        }
        let found = self
            .conn
            .prepare("SELECT 1 FROM gdb_feature_datasets WHERE name = ?1")?
            .exists(params![name])?;
        Ok(found)
    }

    fn query_names<P: Params>(&self, sql: &str, params: P) -> Result<Vec<String>, Error> {
        let mut stmt = self.conn.prepare(sql)?;
        let names = stmt
            .query_map(params, |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Fails with `NotFound` unless the element is registered with the right
    /// data type (and, for nested feature classes, in the right dataset).
    fn ensure_registered(&self, element: &Element) -> Result<(), Error> {
        let data_type: Option<String> = self
            .conn
            .query_row(
                "SELECT data_type FROM gpkg_contents WHERE table_name = ?1",
                params![element.name],
                |row| row.get(0),
            )
            .optional()?;

        let expected = match element.kind {
            ElementKind::FeatureClass => FEATURES,
            ElementKind::Table => ATTRIBUTES,
        };
        if data_type.as_deref() != Some(expected) {
            return Err(Error::NotFound(element.path()));
        }

        if let Some(ds) = &element.dataset {
            let member = self.has_dataset_extension()?
                && self
                    .conn
                    .prepare(
                        "SELECT 1 FROM gdb_feature_dataset_members \
                         WHERE table_name = ?1 AND dataset_name = ?2",
                    )?
                    .exists(params![element.name, ds])?;
            if !member {
                return Err(Error::NotFound(element.path()));
            }
        }
        Ok(())
    }
}

impl Catalog for GeoPackage {
    fn location(&self) -> String {
        self.location.clone()
    }

    fn exists(&self) -> bool {
        self.table_exists("gpkg_contents").unwrap_or(false)
    }

    fn list_datasets(&self) -> Result<Vec<String>, Error> {
        if !self.has_dataset_extension()? {
            return Ok(Vec::new());
        }
        self.query_names("SELECT name FROM gdb_feature_datasets", params![])
    }

    fn list_feature_classes(&self, scope: Scope<'_>) -> Result<Vec<String>, Error> {
        let extension = self.has_dataset_extension()?;
        match scope {
            Scope::Root if extension => self.query_names(
                "SELECT table_name FROM gpkg_contents \
                 WHERE data_type = ?1 \
                 AND table_name NOT IN (SELECT table_name FROM gdb_feature_dataset_members)",
                params![FEATURES],
            ),
            Scope::Root => self.query_names(
                "SELECT table_name FROM gpkg_contents WHERE data_type = ?1",
                params![FEATURES],
            ),
            Scope::Dataset(ds) => {
                if !self.dataset_exists(ds)? {
                    return Err(Error::NotFound(format!("dataset {}", ds)));
                }
                self.query_names(
                    "SELECT c.table_name FROM gpkg_contents c \
                     JOIN gdb_feature_dataset_members m ON m.table_name = c.table_name \
                     WHERE c.data_type = ?1 AND m.dataset_name = ?2",
                    params![FEATURES, ds],
                )
            }
        }
    }

    fn list_tables(&self) -> Result<Vec<String>, Error> {
        self.query_names(
            "SELECT table_name FROM gpkg_contents WHERE data_type = ?1",
            params![ATTRIBUTES],
        )
    }

    fn has_rows(&self, element: &Element) -> Result<bool, Error> {
        self.ensure_registered(element)?;
        let found = self
            .conn
            .prepare(&format!("SELECT 1 FROM {} LIMIT 1", quote_ident(&element.name)))?
            .exists([])?;
        Ok(found)
    }

    fn delete_element(&mut self, element: &Element) -> Result<(), Error> {
        self.ensure_registered(element)?;
        let extension = self.has_dataset_extension()?;
        let extensions_table = self.table_exists("gpkg_extensions")?;
        let geometry_columns = self.table_exists("gpkg_geometry_columns")?;
        let mut metadata_tables = Vec::new();
        for table in PER_TABLE_METADATA {
            if self.table_exists(table)? {
                metadata_tables.push(table);
            }
        }
        let name = element.name.as_str();

        let tx = self.conn.transaction()?;
        if extensions_table {
            let rtree_columns = {
                let mut stmt = tx.prepare(
                    "SELECT column_name FROM gpkg_extensions \
                     WHERE table_name = ?1 AND extension_name = ?2 AND column_name IS NOT NULL",
                )?;
                let columns = stmt
                    .query_map(params![name, RTREE_EXTENSION], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                columns
            };
            for column in &rtree_columns {
                let index = format!("rtree_{}_{}", name, column);
                tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(&index)))?;
                debug!("Dropped spatial index {}", index);
            }
            tx.execute(
                "DELETE FROM gpkg_extensions WHERE table_name = ?1",
                params![name],
            )?;
        }
        for table in &metadata_tables {
            tx.execute(
                &format!("DELETE FROM {} WHERE table_name = ?1", table),
                params![name],
            )?;
        }
        if extension {
            tx.execute(
                "DELETE FROM gdb_feature_dataset_members WHERE table_name = ?1",
                params![name],
            )?;
        }
        if geometry_columns {
            tx.execute(
                "DELETE FROM gpkg_geometry_columns WHERE table_name = ?1",
                params![name],
            )?;
        }
        tx.execute(
            "DELETE FROM gpkg_contents WHERE table_name = ?1",
            params![name],
        )?;
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)))?;
        tx.commit()?;

        debug!("Dropped {}", element.path());
        Ok(())
    }

    fn delete_dataset(&mut self, name: &str) -> Result<(), Error> {
        if !self.dataset_exists(name)? {
            return Err(Error::NotFound(format!("dataset {}", name)));
        }

        let members: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM gdb_feature_dataset_members WHERE dataset_name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        if members > 0 {
            return Err(Error::NotEmpty(format!("{} ({} members)", name, members)));
        }

        self.conn.execute(
            "DELETE FROM gdb_feature_datasets WHERE name = ?1",
            params![name],
        )?;
        debug!("Dropped dataset {}", name);
        Ok(())
    }

    fn compact(&mut self) -> Result<(), Error> {
        self.conn.execute_batch("VACUUM;")?;
        debug!("Vacuumed {}", self.location);
        Ok(())
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("roads"), "\"roads\"");
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn test_bootstrap_is_idempotent() {
        let gpkg = GeoPackage::open_in_memory().unwrap();
        gpkg.bootstrap().unwrap();
        let srs: i64 = gpkg
            .connection()
            .query_row("SELECT COUNT(*) FROM gpkg_spatial_ref_sys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(srs, 3);
    }

    #[test]
    fn test_plain_geopackage_has_no_datasets() {
        let gpkg = GeoPackage::open_in_memory().unwrap();
        gpkg.create_feature_class(None, "roads").unwrap();
        assert!(gpkg.list_datasets().unwrap().is_empty());
        assert_eq!(gpkg.list_feature_classes(Scope::Root).unwrap(), vec!["roads"]);
        assert!(gpkg.list_feature_classes(Scope::Dataset("nope")).is_err());
    }

    #[test]
    fn test_has_rows_rejects_wrong_kind() {
        let gpkg = GeoPackage::open_in_memory().unwrap();
        gpkg.create_table("lookup").unwrap();
        let as_feature_class = Element::feature_class(Scope::Root, "lookup");
        assert!(matches!(
            gpkg.has_rows(&as_feature_class),
            Err(Error::NotFound(_))
        ));
        assert!(!gpkg.has_rows(&Element::table("lookup")).unwrap());
    }
}
