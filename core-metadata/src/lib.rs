//! # Metadata Module
//!
//! Normalizes a merged catalog descriptor into the canonical tag record the
//! muxers write: artist-credit splitting, contributor role mapping, combined
//! track/disc strings, compilation detection and lyrics flattening.

pub mod lyrics;
pub mod record;

pub use lyrics::{synced_lyrics_text, unsynced_lyrics_text};
pub use record::{TagRecord, VARIOUS_ARTISTS};
