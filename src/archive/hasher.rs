//! Content digests for media files.

use super::error::{ArchiveError, ArchiveResult};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Number of hex characters kept from the full SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 16;

/// Identifier written into archive manifests.
pub const HASH_ALGORITHM: &str = "sha256-16";

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Hash a file's full content, reading it in fixed-size chunks.
///
/// Returns the first [`DIGEST_HEX_LEN`] lowercase hex characters of the
/// SHA-256 digest. Identical bytes always produce the same digest.
pub async fn digest_file(path: &Path) -> ArchiveResult<String> {
    let mut file = File::open(path)
        .await
        .map_err(|e| ArchiveError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_CHUNK_SIZE];

    loop {
        let read = file
            .read(&mut buffer)
            .await
            .map_err(|e| ArchiveError::io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(truncate_digest(hasher))
}

/// Digest of an in-memory buffer, identical to [`digest_file`] on the same bytes.
pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    truncate_digest(hasher)
}

fn truncate_digest(hasher: Sha256) -> String {
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(DIGEST_HEX_LEN);
    hex
}
