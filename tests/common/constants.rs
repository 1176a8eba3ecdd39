//! Shared constants for end-to-end tests

/// Bytes of a fake PNG cover image.
pub const COVER_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake cover image for tests";

/// Bytes of a second, different cover image.
pub const OTHER_COVER_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nanother cover image";

/// Bytes of a fake mp3 background track.
pub const MUSIC_BYTES: &[u8] = b"ID3\x04\x00fake background music for tests";

pub const SHOW_A_TITLE: &str = "Show A";
pub const SHOW_B_TITLE: &str = "Show B";
