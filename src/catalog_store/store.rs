//! SQLite-backed catalog store implementation.

use super::models::*;
use super::schema::CATALOG_VERSIONED_SCHEMAS;
use super::trait_def::CatalogStore;
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

const SELECT_COLUMNS: &str =
    "id, title, alt_titles, cover_path, tags, links, music, description";

/// SQLite-backed catalog store.
#[derive(Clone)]
pub struct SqliteCatalogStore {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

fn migrate_if_needed(conn: &mut Connection) -> Result<()> {
    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;

    let latest_version = CATALOG_VERSIONED_SCHEMAS.len() - 1;
    let latest_schema = &CATALOG_VERSIONED_SCHEMAS[latest_version];

    let table_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
            [],
            |r| r.get(0),
        )
        .unwrap_or(0);

    if table_count == 0 {
        info!("Creating catalog db schema at version {}", latest_version);
        latest_schema.create(conn)?;
        return Ok(());
    }

    if db_version < BASE_DB_VERSION as i64 {
        bail!(
            "Catalog database has unknown schema version {}, refusing to open it",
            db_version
        );
    }
    let mut current_version = (db_version - BASE_DB_VERSION as i64) as usize;

    if current_version < latest_version {
        let tx = conn.transaction()?;
        for schema in CATALOG_VERSIONED_SCHEMAS.iter().skip(current_version + 1) {
            if let Some(migration_fn) = schema.migration {
                info!(
                    "Migrating catalog db from version {} to {}",
                    current_version, schema.version
                );
                migration_fn(&tx)?;
            }
            current_version = schema.version;
        }
        tx.pragma_update(None, "user_version", BASE_DB_VERSION + current_version)?;
        tx.commit()?;
    }

    latest_schema
        .validate(conn)
        .context("Catalog database schema validation failed")
}

/// Remove a record's cover file, logging instead of failing.
pub(super) fn remove_cover_best_effort(cover_path: &Option<PathBuf>) {
    if let Some(path) = cover_path {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to delete cover file {:?}: {}", path, e);
            }
        }
    }
}

impl SqliteCatalogStore {
    /// Open (or create) the catalog database at `db_path`.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory {:?}", parent))?;
        }

        let mut conn = Connection::open(&db_path).context("Failed to open catalog database")?;
        migrate_if_needed(&mut conn)?;

        let entry_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM anime_entries", [], |r| r.get(0))
            .unwrap_or(0);
        info!("Opened catalog {:?}: {} entries", db_path, entry_count);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn parse_record_row(row: &rusqlite::Row) -> rusqlite::Result<CatalogRecord> {
        let alt_titles: Option<String> = row.get(2)?;
        let tags: Option<String> = row.get(4)?;
        let links: Option<String> = row.get(5)?;

        Ok(CatalogRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            alt_titles: decode_json_array(alt_titles.as_deref(), "alt_titles"),
            cover_path: path_from_column(row.get(3)?),
            tags: decode_json_array(tags.as_deref(), "tags"),
            links: decode_json_array(links.as_deref(), "links"),
            music: path_from_column(row.get(6)?),
            description: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        })
    }

    fn get_inner(conn: &Connection, id: i64) -> Result<Option<CatalogRecord>> {
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM anime_entries WHERE id = ?1",
            SELECT_COLUMNS
        ))?;
        match stmt.query_row(params![id], Self::parse_record_row) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn backing_store_exists(&self) -> bool {
        self.db_path.is_file()
    }

    fn source_label(&self) -> String {
        self.db_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.db_path.to_string_lossy().into_owned())
    }

    fn list_all(&self) -> Result<Vec<CatalogRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM anime_entries ORDER BY id DESC",
            SELECT_COLUMNS
        ))?;
        let records = stmt
            .query_map([], Self::parse_record_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn get(&self, id: i64) -> Result<Option<CatalogRecord>> {
        let conn = self.conn.lock().unwrap();
        Self::get_inner(&conn, id)
    }

    fn find_titles(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached("SELECT title FROM anime_entries")?;
        let titles = stmt
            .query_map([], |r| r.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(titles)
    }

    fn insert(&self, record: &NewCatalogRecord) -> Result<CatalogRecord> {
        if record.title.trim().is_empty() {
            bail!("Cannot insert a catalog entry with an empty title");
        }
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO anime_entries (title, alt_titles, cover_path, tags, links, music, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.title,
                encode_json_array(&record.alt_titles),
                path_to_column(&record.cover_path),
                encode_json_array(&record.tags),
                encode_json_array(&record.links),
                path_to_column(&record.music),
                record.description,
            ],
        )?;
        let id = conn.last_insert_rowid();
        Ok(record.clone().into_record(id))
    }

    fn update(&self, record: &CatalogRecord) -> Result<CatalogRecord> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE anime_entries
             SET title = ?2, alt_titles = ?3, cover_path = ?4, tags = ?5,
                 links = ?6, music = ?7, description = ?8
             WHERE id = ?1",
            params![
                record.id,
                record.title,
                encode_json_array(&record.alt_titles),
                path_to_column(&record.cover_path),
                encode_json_array(&record.tags),
                encode_json_array(&record.links),
                path_to_column(&record.music),
                record.description,
            ],
        )?;
        if changed == 0 {
            bail!("Catalog entry {} not found", record.id);
        }
        Self::get_inner(&conn, record.id)?
            .with_context(|| format!("Catalog entry {} vanished after update", record.id))
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let existing = match Self::get_inner(&conn, id)? {
            Some(record) => record,
            None => return Ok(false),
        };
        remove_cover_best_effort(&existing.cover_path);
        conn.execute("DELETE FROM anime_entries WHERE id = ?1", params![id])?;
        info!("Deleted catalog entry {}", id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, SqliteCatalogStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteCatalogStore::new(dir.path().join("db.sqlite")).unwrap();
        (dir, store)
    }

    fn sample(title: &str) -> NewCatalogRecord {
        NewCatalogRecord {
            title: title.to_string(),
            alt_titles: vec![format!("{} (alt)", title)],
            tags: vec!["sci-fi".to_string(), "mecha".to_string()],
            links: vec![Link {
                name: "home".to_string(),
                url: "https://example.org".to_string(),
            }],
            description: "desc".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_and_get() {
        let (_dir, store) = open_store();
        let inserted = store.insert(&sample("Show A")).unwrap();
        assert!(inserted.id > 0);

        let fetched = store.get(inserted.id).unwrap().unwrap();
        assert_eq!(fetched, inserted);
        assert_eq!(fetched.tags, vec!["sci-fi".to_string(), "mecha".to_string()]);
        assert_eq!(fetched.links[0].url, "https://example.org");
        assert!(store.get(inserted.id + 100).unwrap().is_none());
    }

    #[test]
    fn test_insert_rejects_empty_title() {
        let (_dir, store) = open_store();
        assert!(store.insert(&NewCatalogRecord::with_title("  ")).is_err());
    }

    #[test]
    fn test_list_all_newest_first() {
        let (_dir, store) = open_store();
        let a = store.insert(&sample("A")).unwrap();
        let b = store.insert(&sample("B")).unwrap();

        let ids: Vec<i64> = store.list_all().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[test]
    fn test_malformed_json_columns_degrade_to_empty() {
        let (_dir, store) = open_store();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO anime_entries (title, alt_titles, tags, links) VALUES ('Broken', '[oops', 'nope', '{}')",
                [],
            )
            .unwrap();
        }

        let records = store.list_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Broken");
        assert!(records[0].alt_titles.is_empty());
        assert!(records[0].tags.is_empty());
        assert!(records[0].links.is_empty());
        assert_eq!(records[0].description, "");
    }

    #[test]
    fn test_update() {
        let (_dir, store) = open_store();
        let mut record = store.insert(&sample("Before")).unwrap();
        record.title = "After".to_string();
        record.tags = vec!["drama".to_string()];

        let updated = store.update(&record).unwrap();
        assert_eq!(updated.title, "After");
        assert_eq!(updated.tags, vec!["drama".to_string()]);

        record.id += 1000;
        assert!(store.update(&record).is_err());
    }

    #[test]
    fn test_delete_removes_cover_file() {
        let (dir, store) = open_store();
        let cover = dir.path().join("cover.png");
        std::fs::write(&cover, b"png").unwrap();

        let mut new_record = sample("With cover");
        new_record.cover_path = Some(cover.clone());
        let record = store.insert(&new_record).unwrap();

        assert!(store.delete(record.id).unwrap());
        assert!(!cover.exists());
        assert!(store.get(record.id).unwrap().is_none());
        assert!(!store.delete(record.id).unwrap());
    }

    #[test]
    fn test_delete_tolerates_missing_cover_file() {
        let (dir, store) = open_store();
        let mut new_record = sample("Stale cover");
        new_record.cover_path = Some(dir.path().join("gone.png"));
        let record = store.insert(&new_record).unwrap();

        assert!(store.delete(record.id).unwrap());
    }

    #[test]
    fn test_find_titles_and_tags() {
        let (_dir, store) = open_store();
        store.insert(&sample("A")).unwrap();
        let mut other = sample("B");
        other.tags = vec!["comedy".to_string(), "sci-fi".to_string()];
        store.insert(&other).unwrap();

        let mut titles = store.find_titles().unwrap();
        titles.sort();
        assert_eq!(titles, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(
            store.all_tags().unwrap(),
            vec![
                "comedy".to_string(),
                "mecha".to_string(),
                "sci-fi".to_string()
            ]
        );
    }

    #[test]
    fn test_reopen_existing_database() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.sqlite");
        {
            let store = SqliteCatalogStore::new(&path).unwrap();
            store.insert(&sample("Persisted")).unwrap();
        }
        let store = SqliteCatalogStore::new(&path).unwrap();
        assert!(store.backing_store_exists());
        assert_eq!(store.source_label(), "db.sqlite");
        assert_eq!(store.find_titles().unwrap(), vec!["Persisted".to_string()]);
    }

    #[test]
    fn test_refuses_unversioned_database() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("foreign.sqlite");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute("CREATE TABLE something (id INTEGER)", []).unwrap();
        }
        let err = SqliteCatalogStore::new(&path).err().unwrap();
        assert!(err.to_string().contains("unknown schema version"));
    }
}
