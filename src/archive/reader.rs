//! Unpacks archives into scratch directories and checks their layout.

use super::error::{ArchiveError, ArchiveResult};
use super::metadata::{EntryMetadata, Manifest, ENTRIES_FILE, MANIFEST_FILE};
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs;
use tracing::{debug, info, warn};

const SCRATCH_PREFIX: &str = "spacerval-import-";

#[derive(Clone, Debug, Default)]
pub struct ArchiveReader {
    /// Parent for scratch directories. The system temp dir when unset.
    scratch_root: Option<PathBuf>,
}

impl ArchiveReader {
    pub fn new(scratch_root: Option<PathBuf>) -> Self {
        Self { scratch_root }
    }

    fn allocate_scratch(&self) -> ArchiveResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        match &self.scratch_root {
            Some(root) => {
                std::fs::create_dir_all(root).map_err(|e| ArchiveError::io(root, e))?;
                builder.tempdir_in(root).map_err(|e| ArchiveError::io(root, e))
            }
            None => builder
                .tempdir()
                .map_err(|e| ArchiveError::io(std::env::temp_dir(), e)),
        }
    }

    /// Extract `archive` into a fresh scratch directory.
    ///
    /// The directory is removed when the returned [`TempDir`] is dropped, and
    /// immediately if extraction fails.
    pub async fn unpack(&self, archive: &Path) -> ArchiveResult<TempDir> {
        let scratch = self.allocate_scratch()?;
        let target = scratch.path().to_path_buf();
        let source = archive.to_path_buf();

        tokio::task::spawn_blocking(move || -> ArchiveResult<()> {
            let file = File::open(&source).map_err(|e| ArchiveError::io(&source, e))?;
            let mut zip = zip::ZipArchive::new(file)?;
            debug!("Extracting {} entries from {:?}", zip.len(), source);
            zip.extract(&target)?;
            Ok(())
        })
        .await??;

        info!("Unpacked {:?} into {:?}", archive, scratch.path());
        Ok(scratch)
    }

    /// Fails unless both `manifest.json` and `entries.json` sit at the root.
    pub async fn validate_structure(&self, root: &Path) -> ArchiveResult<()> {
        for required in [MANIFEST_FILE, ENTRIES_FILE] {
            let path = root.join(required);
            if !fs::try_exists(&path).await.unwrap_or(false) {
                return Err(ArchiveError::Format(format!(
                    "archive is missing {}",
                    required
                )));
            }
        }
        Ok(())
    }

    pub async fn read_entries(&self, root: &Path) -> ArchiveResult<Vec<EntryMetadata>> {
        let path = root.join(ENTRIES_FILE);
        let raw = fs::read(&path)
            .await
            .map_err(|e| ArchiveError::io(&path, e))?;
        serde_json::from_slice(&raw)
            .map_err(|e| ArchiveError::Format(format!("{} could not be parsed: {}", ENTRIES_FILE, e)))
    }

    /// Best-effort manifest read. Nothing about import depends on it.
    pub async fn read_manifest(&self, root: &Path) -> Option<Manifest> {
        let path = root.join(MANIFEST_FILE);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Could not read {:?}: {}", path, e);
                return None;
            }
        };
        match serde_json::from_slice::<Manifest>(&raw) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                warn!("Ignoring unreadable manifest: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, content) in files {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap();
    }

    #[tokio::test]
    async fn test_unpack_and_validate() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("good.spacerval");
        write_zip(
            &archive,
            &[
                ("manifest.json", b"{}"),
                ("entries.json", b"[]"),
                ("media/covers/ab.png", b"png"),
            ],
        );

        let reader = ArchiveReader::new(Some(dir.path().join("scratch")));
        let scratch = reader.unpack(&archive).await.unwrap();
        assert!(scratch.path().join("media/covers/ab.png").exists());
        reader.validate_structure(scratch.path()).await.unwrap();
        assert!(reader.read_entries(scratch.path()).await.unwrap().is_empty());
        // "{}" is not a complete manifest, which is fine.
        assert!(reader.read_manifest(scratch.path()).await.is_none());

        let scratch_path = scratch.path().to_path_buf();
        drop(scratch);
        assert!(!scratch_path.exists());
    }

    #[tokio::test]
    async fn test_missing_entries_is_format_error() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("partial.spacerval");
        write_zip(&archive, &[("manifest.json", b"{}")]);

        let reader = ArchiveReader::default();
        let scratch = reader.unpack(&archive).await.unwrap();
        let err = reader.validate_structure(scratch.path()).await.unwrap_err();
        match err {
            ArchiveError::Format(message) => assert!(message.contains("entries.json")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_not_a_zip_leaves_no_scratch() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("garbage.spacerval");
        std::fs::write(&archive, b"definitely not a zip").unwrap();
        let scratch_root = dir.path().join("scratch");

        let result = ArchiveReader::new(Some(scratch_root.clone()))
            .unpack(&archive)
            .await;
        assert!(matches!(result, Err(ArchiveError::Archive(_))));
        assert_eq!(std::fs::read_dir(&scratch_root).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_entries_is_format_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("entries.json"), b"{ not json").unwrap();

        let result = ArchiveReader::default().read_entries(dir.path()).await;
        assert!(matches!(result, Err(ArchiveError::Format(_))));
    }
}
