//! Catalog snapshot into a single archive file.

use super::error::{ArchiveError, ArchiveResult};
use super::hasher::HASH_ALGORITHM;
use super::media_store::store_media;
use super::metadata::{
    EntryMetadata, Manifest, MediaKind, ENTRIES_FILE, MANIFEST_FILE, README_FILE, README_TEXT,
};
use super::writer::ArchiveWriter;
use crate::catalog_store::CatalogStore;
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

pub const ARCHIVE_EXTENSION: &str = "spacerval";

/// Staging directory removed on drop, whatever happened in between.
struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    async fn create(path: PathBuf) -> ArchiveResult<Self> {
        fs::create_dir(&path)
            .await
            .map_err(|e| ArchiveError::io(&path, e))?;
        Ok(Self { path })
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("Removed staging directory {:?}", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove staging directory {:?}: {}", self.path, e),
        }
    }
}

/// Sortable UTC timestamp with no characters that are awkward in file names.
fn export_stamp() -> String {
    Utc::now().format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}

/// Picks a stamp such that neither the staging directory nor the archive
/// exist yet under `target_dir`. Waits out clashes instead of adding suffixes
/// so names keep sorting by export time.
async fn unique_stamp(target_dir: &Path) -> String {
    loop {
        let stamp = export_stamp();
        let taken = fs::try_exists(target_dir.join(&stamp)).await.unwrap_or(false)
            || fs::try_exists(archive_path(target_dir, &stamp))
                .await
                .unwrap_or(false);
        if !taken {
            return stamp;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

fn archive_path(target_dir: &Path, stamp: &str) -> PathBuf {
    target_dir.join(format!("{}.{}", stamp, ARCHIVE_EXTENSION))
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> ArchiveResult<()> {
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| ArchiveError::Format(format!("Failed to serialize {:?}: {}", path, e)))?;
    fs::write(path, json)
        .await
        .map_err(|e| ArchiveError::io(path, e))
}

pub struct CatalogExporter {
    store: Arc<dyn CatalogStore>,
    writer: ArchiveWriter,
    notes: String,
}

impl CatalogExporter {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            store,
            writer: ArchiveWriter::new(),
            notes: String::new(),
        }
    }

    /// Free text written into the manifest `notes` field.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_writer(mut self, writer: ArchiveWriter) -> Self {
        self.writer = writer;
        self
    }

    /// Copy one media reference into the staging tree.
    ///
    /// Any failure is logged and turned into "no media" for this entry.
    async fn stage_media(
        &self,
        kind: MediaKind,
        source: Option<&Path>,
        staging: &Path,
        title: &str,
    ) -> Option<String> {
        match store_media(source, &kind.archive_dir(staging)).await {
            Ok(name) => name.map(|name| kind.relative_path(&name)),
            Err(e) => {
                warn!("Skipping {:?} media of \"{}\": {}", kind, title, e);
                None
            }
        }
    }

    /// Export the whole catalog to `<target_dir>/<timestamp>.spacerval`.
    ///
    /// Nothing outside `target_dir` is created or modified.
    pub async fn export(
        &self,
        target_dir: &Path,
        include_images: bool,
        include_music: bool,
    ) -> ArchiveResult<PathBuf> {
        if !self.store.backing_store_exists() {
            return Err(ArchiveError::Precondition(format!(
                "catalog database {} does not exist",
                self.store.source_label()
            )));
        }

        fs::create_dir_all(target_dir)
            .await
            .map_err(|e| ArchiveError::io(target_dir, e))?;
        let stamp = unique_stamp(target_dir).await;
        let staging = StagingDir::create(target_dir.join(&stamp)).await?;

        let mut media_kinds = Vec::new();
        if include_images {
            media_kinds.push(MediaKind::Cover);
        }
        if include_music {
            media_kinds.push(MediaKind::Music);
        }
        for kind in &media_kinds {
            let dir = kind.archive_dir(&staging.path);
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| ArchiveError::io(&dir, e))?;
        }

        let mut records = self.store.list_all()?;
        records.sort_by_key(|r| r.id);
        info!("Exporting {} catalog entries", records.len());

        let mut entries = Vec::with_capacity(records.len());
        for record in &records {
            let cover = if include_images {
                self.stage_media(
                    MediaKind::Cover,
                    record.cover_path.as_deref(),
                    &staging.path,
                    &record.title,
                )
                .await
            } else {
                None
            };
            let music = if include_music {
                self.stage_media(
                    MediaKind::Music,
                    record.music.as_deref(),
                    &staging.path,
                    &record.title,
                )
                .await
            } else {
                None
            };
            entries.push(EntryMetadata::from_record(record, cover, music));
        }

        let manifest = Manifest {
            export_time: Utc::now().to_rfc3339(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            source_database: self.store.source_label(),
            total_entries: entries.len(),
            total_cover_files: count_files(&MediaKind::Cover.archive_dir(&staging.path)).await,
            total_music_files: count_files(&MediaKind::Music.archive_dir(&staging.path)).await,
            hash_algorithm: HASH_ALGORITHM.to_string(),
            notes: self.notes.clone(),
        };

        write_json(&staging.path.join(ENTRIES_FILE), &entries).await?;
        write_json(&staging.path.join(MANIFEST_FILE), &manifest).await?;
        let readme = staging.path.join(README_FILE);
        fs::write(&readme, README_TEXT)
            .await
            .map_err(|e| ArchiveError::io(&readme, e))?;

        let archive = self
            .writer
            .pack(&staging.path, &archive_path(target_dir, &stamp))
            .await?;
        drop(staging);

        info!(
            "Exported {} entries ({} covers, {} music files) to {:?}",
            manifest.total_entries, manifest.total_cover_files, manifest.total_music_files, archive
        );
        Ok(archive)
    }
}

/// Number of files directly inside `dir`, 0 if it does not exist.
async fn count_files(dir: &Path) -> usize {
    let mut read_dir = match fs::read_dir(dir).await {
        Ok(read_dir) => read_dir,
        Err(_) => return 0,
    };
    let mut count = 0;
    while let Ok(Some(entry)) = read_dir.next_entry().await {
        if entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
            count += 1;
        }
    }
    count
}
