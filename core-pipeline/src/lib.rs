//! # Pipeline Module
//!
//! Everything between "download this track" and a tagged file on disk:
//! FIFO admission with a concurrency cap, idempotent skip via the match
//! store, payload fetch and decryption, artwork and lyrics enrichment,
//! tagging, and bounded fallback when a track is unavailable.

pub mod artwork;
pub mod config;
pub mod downloader;
pub mod error;
pub mod paths;
pub mod scheduler;
pub mod store;

pub use config::PipelineConfig;
pub use downloader::{DownloadOutcome, Downloader, OutcomeStatus};
pub use error::{PipelineError, Result};
pub use scheduler::{RunGuard, Scheduler};
pub use store::{InMemoryTrackMatchStore, TrackMatchStore};
