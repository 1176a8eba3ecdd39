//! SQLite schema definitions for the catalog database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

/// Catalog entries. List columns hold JSON-encoded arrays.
const ENTRIES_TABLE: Table = Table {
    name: "anime_entries",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("alt_titles", &SqlType::Text), // JSON ["..."]
        sqlite_column!("cover_path", &SqlType::Text),
        sqlite_column!("tags", &SqlType::Text), // JSON ["..."]
        sqlite_column!("links", &SqlType::Text), // JSON [{"name","url"}]
        sqlite_column!("music", &SqlType::Text),
        sqlite_column!("description", &SqlType::Text),
    ],
    indices: &[("idx_anime_entries_title", "title")],
};

pub const CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[ENTRIES_TABLE],
    migration: None,
}];
