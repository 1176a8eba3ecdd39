//! Merges an archive into the local catalog.
//!
//! Entries are only ever added. An incoming entry whose title already exists
//! locally is skipped and reported, never merged.

use super::error::{ArchiveError, ArchiveResult};
use super::metadata::{is_contained_relative_path, EntryMetadata};
use super::reader::ArchiveReader;
use crate::catalog_store::{CatalogStore, NewCatalogRecord};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

/// Old id to new id pairs, in the order entries were inserted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdRemapTable {
    pairs: Vec<(i64, i64)>,
}

impl IdRemapTable {
    pub fn record(&mut self, old_id: i64, new_id: i64) {
        self.pairs.push((old_id, new_id));
    }

    pub fn new_id(&self, old_id: i64) -> Option<i64> {
        self.pairs
            .iter()
            .find(|(old, _)| *old == old_id)
            .map(|(_, new)| *new)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(i64, i64)> {
        self.pairs.iter()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

fn count_noun(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

#[derive(Clone, Debug)]
pub struct ImportSummary {
    pub imported_count: usize,
    pub conflict_titles: Vec<String>,
    pub id_remap: IdRemapTable,
    pub message: String,
}

impl ImportSummary {
    fn new(imported_count: usize, conflict_titles: Vec<String>, id_remap: IdRemapTable) -> Self {
        let message = if conflict_titles.is_empty() {
            format!("Imported {}.", count_noun(imported_count, "entry", "entries"))
        } else {
            format!(
                "Partial import: {} imported, {} skipped ({}).",
                count_noun(imported_count, "entry", "entries"),
                count_noun(conflict_titles.len(), "conflicting title", "conflicting titles"),
                conflict_titles.join(", ")
            )
        };
        Self {
            imported_count,
            conflict_titles,
            id_remap,
            message,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.conflict_titles.is_empty()
    }
}

pub struct CatalogImporter {
    store: Arc<dyn CatalogStore>,
    covers_dir: PathBuf,
    music_dir: PathBuf,
    reader: ArchiveReader,
}

impl CatalogImporter {
    /// `covers_dir` and `music_dir` are the installation's persistent media
    /// directories; imported media is copied there.
    pub fn new(store: Arc<dyn CatalogStore>, covers_dir: PathBuf, music_dir: PathBuf) -> Self {
        Self {
            store,
            covers_dir,
            music_dir,
            reader: ArchiveReader::default(),
        }
    }

    pub fn with_reader(mut self, reader: ArchiveReader) -> Self {
        self.reader = reader;
        self
    }

    pub async fn import(&self, archive: &Path) -> ArchiveResult<ImportSummary> {
        let scratch = self.reader.unpack(archive).await?;
        // `scratch` is removed when it goes out of scope, on every path below.
        self.reader.validate_structure(scratch.path()).await?;
        if let Some(manifest) = self.reader.read_manifest(scratch.path()).await {
            info!(
                "Archive exported {} by version {} from {} ({} entries)",
                manifest.export_time,
                manifest.app_version,
                manifest.source_database,
                manifest.total_entries
            );
        }
        let entries = self.reader.read_entries(scratch.path()).await?;
        let summary = self.ingest(scratch.path(), entries).await?;

        info!("{}", summary.message);
        Ok(summary)
    }

    async fn ingest(
        &self,
        root: &Path,
        entries: Vec<EntryMetadata>,
    ) -> ArchiveResult<ImportSummary> {
        let existing: HashSet<String> = self.store.find_titles()?.into_iter().collect();
        let mut conflict_titles = Vec::new();
        let mut id_remap = IdRemapTable::default();

        for entry in entries {
            if existing.contains(&entry.title) {
                info!("\"{}\" already exists, skipping it", entry.title);
                conflict_titles.push(entry.title);
                continue;
            }
            if entry.title.trim().is_empty() {
                warn!("Skipping archive entry {} with an empty title", entry.old_id);
                continue;
            }

            let cover_path =
                import_media(root, entry.cover_relative_path.as_deref(), &self.covers_dir).await;
            let music =
                import_media(root, entry.music_relative_path.as_deref(), &self.music_dir).await;

            let created = self.store.insert(&NewCatalogRecord {
                title: entry.title,
                alt_titles: entry.alt_titles,
                cover_path,
                tags: entry.tags,
                links: entry.links,
                music,
                description: entry.description,
            })?;
            debug!("Entry {} imported as {}", entry.old_id, created.id);
            id_remap.record(entry.old_id, created.id);
        }

        Ok(ImportSummary::new(id_remap.len(), conflict_titles, id_remap))
    }
}

/// Copy an archive media file into `dest_dir`, keeping its digest name.
///
/// Returns the local path, or `None` when there is nothing usable to copy.
async fn import_media(root: &Path, relative: Option<&str>, dest_dir: &Path) -> Option<PathBuf> {
    let relative = relative.filter(|r| !r.is_empty())?;
    if !is_contained_relative_path(relative) {
        warn!("Ignoring media path {:?} pointing outside the archive", relative);
        return None;
    }
    let source = root.join(relative);
    let file_name = source.file_name()?.to_owned();
    let destination = dest_dir.join(file_name);

    match copy_if_absent(root, &source, dest_dir, &destination).await {
        Ok(()) => Some(destination),
        Err(e) => {
            warn!("Could not import media {:?}: {}", relative, e);
            None
        }
    }
}

/// Fails unless `source` is a regular file that really lives under `root`.
///
/// Extraction recreates symlink entries, so the path string alone does not
/// prove containment.
async fn ensure_regular_file_inside(root: &Path, source: &Path) -> ArchiveResult<()> {
    let metadata = match fs::symlink_metadata(source).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ArchiveError::Format(format!("{:?} is not in the archive", source)));
        }
        Err(e) => return Err(ArchiveError::io(source, e)),
    };
    if !metadata.file_type().is_file() {
        return Err(ArchiveError::Format(format!(
            "{:?} is not a regular file",
            source
        )));
    }

    let root = fs::canonicalize(root)
        .await
        .map_err(|e| ArchiveError::io(root, e))?;
    let resolved = fs::canonicalize(source)
        .await
        .map_err(|e| ArchiveError::io(source, e))?;
    if !resolved.starts_with(&root) {
        return Err(ArchiveError::Format(format!(
            "{:?} resolves outside the archive",
            source
        )));
    }
    Ok(())
}

async fn copy_if_absent(
    root: &Path,
    source: &Path,
    dest_dir: &Path,
    destination: &Path,
) -> ArchiveResult<()> {
    ensure_regular_file_inside(root, source).await?;
    if fs::try_exists(destination).await.unwrap_or(false) {
        debug!("{:?} already present locally", destination);
        return Ok(());
    }
    fs::create_dir_all(dest_dir)
        .await
        .map_err(|e| ArchiveError::io(dest_dir, e))?;
    fs::copy(source, destination)
        .await
        .map_err(|e| ArchiveError::io(source, e))?;
    Ok(())
}
