//! Test fixtures: a throwaway library with its own database and media.

#![allow(dead_code)]

use spacerval::archive::{CatalogExporter, CatalogImporter};
use spacerval::catalog_store::{CatalogRecord, CatalogStore, Link, NewCatalogRecord, SqliteCatalogStore};
use spacerval::config::LibraryPaths;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// A catalog installation living in a temporary directory.
///
/// Source media written with [`TestLibrary::write_source_media`] sits outside
/// the library's own covers/ and music/ directories, the way user-picked files do.
pub struct TestLibrary {
    pub dir: TempDir,
    pub paths: LibraryPaths,
    pub store: Arc<SqliteCatalogStore>,
}

impl TestLibrary {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let paths = LibraryPaths::new(dir.path().join("library"));
        let store = Arc::new(SqliteCatalogStore::new(paths.db_path()).unwrap());
        Self { dir, paths, store }
    }

    pub fn source_dir(&self) -> PathBuf {
        self.dir.path().join("sources")
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.dir.path().join("exports")
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.dir.path().join("scratch")
    }

    pub fn write_source_media(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let dir = self.source_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    pub fn add_entry(
        &self,
        title: &str,
        cover: Option<PathBuf>,
        music: Option<PathBuf>,
        tags: &[&str],
    ) -> CatalogRecord {
        let mut record = NewCatalogRecord::with_title(title);
        record.cover_path = cover;
        record.music = music;
        record.tags = tags.iter().map(|t| t.to_string()).collect();
        self.store.insert(&record).unwrap()
    }

    pub fn add_full_entry(&self, title: &str) -> CatalogRecord {
        let record = NewCatalogRecord {
            title: title.to_string(),
            alt_titles: vec![format!("{} (JP)", title), format!("{} (alt)", title)],
            cover_path: None,
            tags: vec!["drama".to_string(), "mecha".to_string(), "classic".to_string()],
            links: vec![
                Link {
                    name: "wiki".to_string(),
                    url: format!("https://example.org/{}", title.replace(' ', "_")),
                },
                Link {
                    name: "tracker".to_string(),
                    url: "https://tracker.example.org/1".to_string(),
                },
            ],
            music: None,
            description: format!("Notes about {}", title),
        };
        self.store.insert(&record).unwrap()
    }

    pub fn exporter(&self) -> CatalogExporter {
        CatalogExporter::new(self.store.clone())
    }

    pub fn importer(&self) -> CatalogImporter {
        CatalogImporter::new(
            self.store.clone(),
            self.paths.covers_dir(),
            self.paths.music_dir(),
        )
        .with_reader(spacerval::archive::ArchiveReader::new(Some(self.scratch_dir())))
    }

    pub async fn export(&self, include_images: bool, include_music: bool) -> PathBuf {
        self.exporter()
            .export(&self.exports_dir(), include_images, include_music)
            .await
            .unwrap()
    }

    pub fn titles(&self) -> Vec<String> {
        let mut titles = self.store.find_titles().unwrap();
        titles.sort();
        titles
    }

    pub fn find(&self, title: &str) -> CatalogRecord {
        self.store
            .list_all()
            .unwrap()
            .into_iter()
            .find(|r| r.title == title)
            .unwrap_or_else(|| panic!("no entry titled {:?}", title))
    }

    /// Number of leftover scratch directories from imports.
    pub fn scratch_dir_count(&self) -> usize {
        match std::fs::read_dir(self.scratch_dir()) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}

/// Sorted entry names of a zip archive.
pub fn archive_names(archive: &Path) -> Vec<String> {
    let zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    let mut names: Vec<String> = zip.file_names().map(|n| n.to_string()).collect();
    names.sort();
    names
}

/// Parsed JSON document stored at `name` inside a zip archive.
pub fn archive_json(archive: &Path, name: &str) -> serde_json::Value {
    let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    let mut content = String::new();
    zip.by_name(name)
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    serde_json::from_str(&content).unwrap()
}

/// Writes a zip container holding exactly `files`.
pub fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, content) in files {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content).unwrap();
    }
    zip.finish().unwrap();
}
