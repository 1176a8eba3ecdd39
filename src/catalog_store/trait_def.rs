//! CatalogStore trait definition.
//!
//! The archive subsystem only ever talks to the record store through this
//! trait, so exporters and importers can run against the SQLite store or an
//! in-memory one.

use super::models::{CatalogRecord, NewCatalogRecord};
use anyhow::Result;
use std::collections::BTreeSet;

/// Trait for catalog record storage backends.
pub trait CatalogStore: Send + Sync {
    // =========================================================================
    // Backing Store
    // =========================================================================

    /// Whether the persistent backing store (e.g. the database file) exists.
    fn backing_store_exists(&self) -> bool;

    /// Human-readable label of the backing store, recorded in archive manifests.
    fn source_label(&self) -> String;

    // =========================================================================
    // Read Operations
    // =========================================================================

    /// All records, newest first.
    fn list_all(&self) -> Result<Vec<CatalogRecord>>;

    /// Get a record by id.
    fn get(&self, id: i64) -> Result<Option<CatalogRecord>>;

    /// Titles of every record currently in the catalog.
    fn find_titles(&self) -> Result<Vec<String>>;

    /// Distinct tags across the catalog, sorted ascending.
    fn all_tags(&self) -> Result<Vec<String>> {
        let tags: BTreeSet<String> = self
            .list_all()?
            .into_iter()
            .flat_map(|record| record.tags)
            .collect();
        Ok(tags.into_iter().collect())
    }

    // =========================================================================
    // Write Operations
    // =========================================================================

    /// Insert a record, returning it with its newly assigned id.
    fn insert(&self, record: &NewCatalogRecord) -> Result<CatalogRecord>;

    /// Replace every field of an existing record.
    fn update(&self, record: &CatalogRecord) -> Result<CatalogRecord>;

    /// Delete a record. Returns false if no record had that id.
    ///
    /// The record's cover file is removed on a best-effort basis.
    fn delete(&self, id: i64) -> Result<bool>;
}
