//! Match store for idempotent downloads.
//!
//! Consulted before any network traffic: a track already recorded at the
//! requested tier is skipped outright when its file is still on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use core_catalog::Quality;

/// Durable mapping from downloaded tracks to their files.
#[async_trait]
pub trait TrackMatchStore: Send + Sync {
    /// Path a previous run stored this track at, if any.
    async fn existing_path(&self, track_id: &str, quality: Quality) -> Option<PathBuf>;

    /// Record a finished download.
    async fn record(&self, track_id: &str, quality: Quality, path: &Path);
}

/// Process-lifetime store; a host wanting persistence brings its own
/// implementation.
#[derive(Default)]
pub struct InMemoryTrackMatchStore {
    entries: Mutex<HashMap<(String, u32), PathBuf>>,
}

impl InMemoryTrackMatchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrackMatchStore for InMemoryTrackMatchStore {
    async fn existing_path(&self, track_id: &str, quality: Quality) -> Option<PathBuf> {
        self.entries
            .lock()
            .expect("match store poisoned")
            .get(&(track_id.to_string(), quality.id()))
            .cloned()
    }

    async fn record(&self, track_id: &str, quality: Quality, path: &Path) {
        self.entries
            .lock()
            .expect("match store poisoned")
            .insert((track_id.to_string(), quality.id()), path.to_path_buf());
    }
}
