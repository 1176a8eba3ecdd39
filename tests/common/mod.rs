//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestLibrary, COVER_BYTES};
//!
//! #[tokio::test]
//! async fn test_export() {
//!     let library = TestLibrary::new();
//!     let cover = library.write_source_media("a.png", COVER_BYTES);
//!     library.add_entry("Show A", Some(cover), None, &["sci-fi"]);
//!
//!     let archive = library.export(true, true).await;
//!     assert!(archive.exists());
//! }
//! ```

mod constants;
mod fixtures;

pub use constants::*;
pub use fixtures::*;
