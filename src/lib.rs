//! Spacerval catalog library
//!
//! Personal media catalog storage plus export/import of the whole catalog as
//! a single portable archive.

pub mod archive;
pub mod catalog_store;
pub mod config;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use archive::{ArchiveError, CatalogExporter, CatalogImporter, ImportSummary};
pub use catalog_store::{CatalogStore, InMemoryCatalogStore, SqliteCatalogStore};
pub use config::{AppConfig, LibraryPaths};
