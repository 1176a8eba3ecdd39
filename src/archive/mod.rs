//! Export and import of the catalog as a portable archive.

mod error;
mod exporter;
mod hasher;
mod importer;
mod media_store;
mod metadata;
mod reader;
mod writer;

pub use error::{ArchiveError, ArchiveResult};
pub use exporter::{CatalogExporter, ARCHIVE_EXTENSION};
pub use hasher::{digest_bytes, digest_file, DIGEST_HEX_LEN, HASH_ALGORITHM};
pub use importer::{CatalogImporter, IdRemapTable, ImportSummary};
pub use media_store::{normalized_extension, store_media, store_media_bytes};
pub use metadata::{
    is_contained_relative_path, EntryMetadata, Manifest, MediaKind, ENTRIES_FILE, MANIFEST_FILE,
    README_FILE,
};
pub use reader::ArchiveReader;
pub use writer::{ArchiveWriter, MAX_COMPRESSION_LEVEL};
