//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use core_catalog::Quality;

use crate::error::{PipelineError, Result};

/// Controls where downloads land, how many run at once and how the retry
/// delays are paced.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory downloads are written into.
    pub download_dir: PathBuf,
    /// `artist/album/` subdirectories instead of a flat directory.
    pub organized_layout: bool,
    /// Concurrent download limit enforced by the scheduler.
    pub concurrent_downloads: usize,
    /// Tier requested before the fallback chains kick in.
    pub preferred_quality: Quality,
    /// Pause before re-fetching a forbidden track payload.
    pub track_retry_delay: Duration,
    /// Pause before re-fetching forbidden artwork.
    pub artwork_retry_delay: Duration,
    /// Pause between tag-write attempts.
    pub mux_retry_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("downloads"),
            organized_layout: false,
            concurrent_downloads: 4,
            preferred_quality: Quality::Mp3_320,
            track_retry_delay: Duration::from_secs(1),
            artwork_retry_delay: Duration::from_millis(500),
            mux_retry_delay: Duration::from_millis(500),
        }
    }
}

impl PipelineConfig {
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    pub fn with_organized_layout(mut self, organized: bool) -> Self {
        self.organized_layout = organized;
        self
    }

    pub fn with_concurrent_downloads(mut self, limit: usize) -> Self {
        self.concurrent_downloads = limit;
        self
    }

    pub fn with_preferred_quality(mut self, quality: Quality) -> Self {
        self.preferred_quality = quality;
        self
    }

    /// Validate before wiring the pipeline together.
    pub fn validate(&self) -> Result<()> {
        if self.concurrent_downloads == 0 {
            return Err(PipelineError::Config(
                "concurrent_downloads must be at least 1".to_string(),
            ));
        }
        if self.download_dir.as_os_str().is_empty() {
            return Err(PipelineError::Config(
                "download_dir must not be empty".to_string(),
            ));
        }
        if self.preferred_quality == Quality::UserUploaded {
            return Err(PipelineError::Config(
                "preferred_quality cannot be the user-uploaded tier".to_string(),
            ));
        }
        Ok(())
    }
}
