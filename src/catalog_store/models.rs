//! Catalog record models.
//!
//! The record store keeps `alt_titles`, `tags` and `links` as JSON-encoded text
//! columns. Everything outside the store works with the typed sequences below;
//! encoding and decoding happen only at the store boundary.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// A named external link attached to a record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub url: String,
}

/// A catalog record as stored locally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: i64,
    pub title: String,
    pub alt_titles: Vec<String>,
    /// Absolute path of the cover image owned by this installation.
    pub cover_path: Option<PathBuf>,
    pub tags: Vec<String>,
    pub links: Vec<Link>,
    /// Absolute path of the background music owned by this installation.
    pub music: Option<PathBuf>,
    pub description: String,
}

/// Field set for a record that has not been assigned an id yet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewCatalogRecord {
    pub title: String,
    pub alt_titles: Vec<String>,
    pub cover_path: Option<PathBuf>,
    pub tags: Vec<String>,
    pub links: Vec<Link>,
    pub music: Option<PathBuf>,
    pub description: String,
}

impl NewCatalogRecord {
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn into_record(self, id: i64) -> CatalogRecord {
        CatalogRecord {
            id,
            title: self.title,
            alt_titles: self.alt_titles,
            cover_path: self.cover_path,
            tags: self.tags,
            links: self.links,
            music: self.music,
            description: self.description,
        }
    }
}

/// Decode a JSON array column.
///
/// Missing, empty or malformed text yields an empty sequence; a broken column
/// never makes the whole record unreadable.
pub fn decode_json_array<T: DeserializeOwned>(raw: Option<&str>, field: &str) -> Vec<T> {
    let raw = match raw.map(str::trim) {
        Some(s) if !s.is_empty() && s != "null" => s,
        _ => return Vec::new(),
    };
    match serde_json::from_str::<Vec<T>>(raw) {
        Ok(values) => values,
        Err(e) => {
            warn!("Discarding undecodable {} column {:?}: {}", field, raw, e);
            Vec::new()
        }
    }
}

/// Encode a sequence into the JSON text stored in a column.
pub fn encode_json_array<T: Serialize>(values: &[T]) -> String {
    // Serializing strings and string pairs cannot fail.
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

/// Map an optional path column, treating empty text as absent.
pub fn path_from_column(raw: Option<String>) -> Option<PathBuf> {
    raw.filter(|s| !s.trim().is_empty()).map(PathBuf::from)
}

pub fn path_to_column(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(|p| p.to_string_lossy().into_owned())
}
