//! # Catalog Module
//!
//! Track, album, lyrics and search lookups against the gateway, plus the
//! quality-tier fallback tables and the CDN URL builders the downloader
//! feeds from.

pub mod client;
pub mod error;
pub mod quality;
pub mod types;
pub mod urls;

pub use client::CatalogClient;
pub use error::{CatalogError, Result};
pub use quality::{select_quality, Quality};
pub use types::{AlbumSummary, Lyrics, SyncedLine, TrackDescriptor};
pub use urls::{artwork_url, track_download_url};
