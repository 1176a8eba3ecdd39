//! Content-addressed media copies.
//!
//! Media files are stored as `<digest><ext>` inside a destination directory.
//! Two files with the same bytes map to the same name, so a second copy is
//! skipped.

use super::error::{ArchiveError, ArchiveResult};
use super::hasher::{digest_bytes, digest_file};
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

/// Lowercased extension of `path` including the leading dot, or "" if none.
pub fn normalized_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

/// Copy `source` into `dest_dir` under its digest-derived name.
///
/// Returns `Ok(None)` if there is no source or it no longer exists on disk,
/// otherwise the stored file name (not a path).
pub async fn store_media(source: Option<&Path>, dest_dir: &Path) -> ArchiveResult<Option<String>> {
    let source = match source {
        Some(path) if !path.as_os_str().is_empty() => path,
        _ => return Ok(None),
    };

    if !fs::try_exists(source).await.unwrap_or(false) {
        warn!("Media file {:?} does not exist, skipping it", source);
        return Ok(None);
    }

    fs::create_dir_all(dest_dir)
        .await
        .map_err(|e| ArchiveError::io(dest_dir, e))?;

    let digest = digest_file(source).await?;
    let file_name = format!("{}{}", digest, normalized_extension(source));
    let destination = dest_dir.join(&file_name);

    if fs::try_exists(&destination).await.unwrap_or(false) {
        debug!("{} already stored, skipping copy of {:?}", file_name, source);
        return Ok(Some(file_name));
    }

    fs::copy(source, &destination)
        .await
        .map_err(|e| ArchiveError::io(source, e))?;
    Ok(Some(file_name))
}

/// Store an in-memory buffer the same way [`store_media`] stores a file.
pub async fn store_media_bytes(
    bytes: &[u8],
    extension: &str,
    dest_dir: &Path,
) -> ArchiveResult<String> {
    fs::create_dir_all(dest_dir)
        .await
        .map_err(|e| ArchiveError::io(dest_dir, e))?;

    let file_name = format!("{}{}", digest_bytes(bytes), extension.to_lowercase());
    let destination = dest_dir.join(&file_name);
    if !fs::try_exists(&destination).await.unwrap_or(false) {
        fs::write(&destination, bytes)
            .await
            .map_err(|e| ArchiveError::io(&destination, e))?;
    }
    Ok(file_name)
}
