//! Packs a staging directory into a single zip container.

use super::error::{ArchiveError, ArchiveResult};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Highest deflate level.
pub const MAX_COMPRESSION_LEVEL: i64 = 9;

const PARTIAL_PREFIX: &str = ".spacerval-partial-";

#[derive(Clone, Debug)]
pub struct ArchiveWriter {
    compression_level: i64,
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self {
            compression_level: MAX_COMPRESSION_LEVEL,
        }
    }
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compression_level(compression_level: i64) -> Self {
        Self { compression_level }
    }

    /// Recursively add everything under `staging_dir` to a new archive at
    /// `destination`, keeping paths relative to the staging root.
    ///
    /// The staging directory is left in place; removing it is up to the caller.
    pub async fn pack(&self, staging_dir: &Path, destination: &Path) -> ArchiveResult<PathBuf> {
        let staging_dir = staging_dir.to_path_buf();
        let destination = destination.to_path_buf();
        let level = self.compression_level;

        let (archive, count) = tokio::task::spawn_blocking(move || {
            pack_blocking(&staging_dir, &destination, level).map(|count| (destination, count))
        })
        .await??;

        info!("Packed {} entries into {:?}", count, archive);
        Ok(archive)
    }
}

/// Packs into a temporary file next to `destination` and renames it into
/// place only once the container is complete. On failure the temporary file
/// is dropped, so no truncated archive is left behind.
fn pack_blocking(staging_dir: &Path, destination: &Path, level: i64) -> ArchiveResult<usize> {
    let parent = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let partial = tempfile::Builder::new()
        .prefix(PARTIAL_PREFIX)
        .tempfile_in(parent)
        .map_err(|e| ArchiveError::io(parent, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(partial));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(level));

    let mut count = 0;
    for entry in WalkDir::new(staging_dir)
        .min_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            ArchiveError::Archive(format!("Failed to walk {:?}: {}", staging_dir, e))
        })?;
        let name = archive_name(staging_dir, entry.path())?;

        if entry.file_type().is_dir() {
            zip.add_directory(name.as_str(), options)?;
        } else {
            zip.start_file(name.as_str(), options)?;
            let mut source =
                File::open(entry.path()).map_err(|e| ArchiveError::io(entry.path(), e))?;
            std::io::copy(&mut source, &mut zip).map_err(|e| ArchiveError::io(entry.path(), e))?;
        }
        debug!("Added {}", name);
        count += 1;
    }

    let partial = zip
        .finish()?
        .into_inner()
        .map_err(|e| ArchiveError::io(destination, e.into_error()))?;
    partial
        .persist(destination)
        .map_err(|e| ArchiveError::io(destination, e.error))?;
    Ok(count)
}

/// Path of `path` relative to `root`, joined with `/` as zip expects.
fn archive_name(root: &Path, path: &Path) -> ArchiveResult<String> {
    let relative = path.strip_prefix(root).map_err(|_| {
        ArchiveError::Archive(format!("{:?} is outside of {:?}", path, root))
    })?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}
