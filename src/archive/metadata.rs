//! Documents stored at the root of an archive.

use crate::catalog_store::{CatalogRecord, Link};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Component, Path};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const ENTRIES_FILE: &str = "entries.json";
pub const README_FILE: &str = "README";
pub const MEDIA_DIR: &str = "media";

/// Kind of media referenced by an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Cover,
    Music,
}

impl MediaKind {
    /// Directory name under `media/`.
    pub fn dir_name(&self) -> &'static str {
        match self {
            MediaKind::Cover => "covers",
            MediaKind::Music => "music",
        }
    }

    /// Archive-relative path of a stored media file, always `/`-separated.
    pub fn relative_path(&self, file_name: &str) -> String {
        format!("{}/{}/{}", MEDIA_DIR, self.dir_name(), file_name)
    }

    /// Directory holding this kind of media inside an archive root.
    pub fn archive_dir(&self, root: &Path) -> std::path::PathBuf {
        root.join(MEDIA_DIR).join(self.dir_name())
    }
}

/// One exported record, as written to `entries.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMetadata {
    /// Record id at export time. Only used for the id-remap report.
    pub old_id: i64,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub alt_titles: Vec<String>,
    pub cover_relative_path: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: Vec<Link>,
    pub music_relative_path: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

impl EntryMetadata {
    pub fn from_record(
        record: &CatalogRecord,
        cover_relative_path: Option<String>,
        music_relative_path: Option<String>,
    ) -> Self {
        Self {
            old_id: record.id,
            title: record.title.clone(),
            alt_titles: record.alt_titles.clone(),
            cover_relative_path,
            tags: record.tags.clone(),
            links: record.links.clone(),
            music_relative_path,
            description: record.description.clone(),
        }
    }
}

/// Treats an explicit `null` the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Archive-level diagnostics. Import does not depend on any of these fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub export_time: String,
    pub app_version: String,
    pub source_database: String,
    pub total_entries: usize,
    pub total_cover_files: usize,
    pub total_music_files: usize,
    pub hash_algorithm: String,
    #[serde(default)]
    pub notes: String,
}

/// Whether an archive-relative path stays inside the archive root.
///
/// Rejects absolute paths, drive prefixes and `..` components.
pub fn is_contained_relative_path(relative: &str) -> bool {
    let path = Path::new(relative);
    !relative.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

pub const README_TEXT: &str = "\
Spacerval catalog archive
=========================

This file is a zip container produced by `spacerval export`.

Layout
------
  manifest.json     export time, application version, source database,
                    entry and media counts, hash algorithm, notes
  entries.json      one object per catalog entry: oldId, title, altTitles,
                    coverRelativePath, tags, links, musicRelativePath,
                    description
  media/covers/     cover images named <digest><ext> (only if images were
                    exported)
  media/music/      background music named <digest><ext> (only if music was
                    exported)

Media files are named after the first 16 hex characters of the SHA-256 of
their content, so identical files shared by several entries are stored once.
Relative paths in entries.json always point inside this archive.

Importing
---------
Run `spacerval import <archive>`. Entries whose title already exists in the
target catalog are skipped and reported; everything else is added as new
entries and their media is copied into the local covers/ and music/
directories.
";
