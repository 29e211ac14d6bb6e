//! The download pipeline: descriptor fetch, quality selection, payload
//! fetch and decryption, artwork and lyrics enrichment, tagging, and the
//! one-hop fallback to a replacement upload when a track is unavailable.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use core_catalog::{
    select_quality, track_download_url, CatalogClient, CatalogError, Quality, TrackDescriptor,
};
use core_crypto::decrypt_track;
use core_metadata::TagRecord;
use core_mux::{write_flac, write_id3};
use core_session::SessionManager;
use core_transport::{HttpClient, HttpRequest};

use crate::artwork::{fetch_artwork, remove_artwork};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::paths::resolve_track_path;
use crate::store::TrackMatchStore;

/// Tag-write attempts before the payload is stored untagged: the first try
/// plus three retries.
const MUX_ATTEMPTS: u32 = 4;

/// How a download concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Downloaded,
    /// The file was already on disk; nothing was fetched.
    AlreadyExists,
    /// Tagging kept failing, the bare audio was stored instead.
    StoredWithoutTags,
}

#[derive(Debug)]
pub struct DownloadOutcome {
    pub track_id: String,
    pub path: PathBuf,
    pub status: OutcomeStatus,
    /// Human-readable remark when an alternative upload or a degraded
    /// quality tier was used.
    pub note: Option<String>,
    pub finished_at: DateTime<Utc>,
}

/// Orchestrates one credential's downloads end to end.
pub struct Downloader {
    http: Arc<dyn HttpClient>,
    catalog: CatalogClient,
    store: Arc<dyn TrackMatchStore>,
    config: PipelineConfig,
}

impl Downloader {
    pub fn new(
        http: Arc<dyn HttpClient>,
        sessions: Arc<SessionManager>,
        store: Arc<dyn TrackMatchStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            http,
            catalog: CatalogClient::new(sessions),
            store,
            config,
        }
    }

    /// Download one track for one registered credential.
    ///
    /// Skips without touching the network when the match store still points
    /// at an existing file. An unavailable track is retried once through its
    /// catalog fallback or, failing that, an alternative upload found by
    /// search; the hop target never hops again.
    #[instrument(skip(self, credential), fields(track_id))]
    pub async fn download(&self, credential: &str, track_id: &str) -> Result<DownloadOutcome> {
        if let Some(path) = self
            .store
            .existing_path(track_id, self.config.preferred_quality)
            .await
        {
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                debug!(path = %path.display(), "match store hit, skipping download");
                return Ok(DownloadOutcome {
                    track_id: track_id.to_string(),
                    path,
                    status: OutcomeStatus::AlreadyExists,
                    note: None,
                    finished_at: Utc::now(),
                });
            }
        }

        let descriptor = self.catalog.track(credential, track_id).await?;

        let outcome = match self.process(credential, descriptor.clone(), None).await {
            Err(PipelineError::TrackUnavailable(_)) => {
                self.hop_to_replacement(credential, &descriptor)
                    .await
                    .map_err(|err| match err {
                        // The original id is what the caller asked about.
                        PipelineError::TrackUnavailable(_) => {
                            PipelineError::TrackUnavailable(track_id.to_string())
                        }
                        other => other,
                    })?
            }
            other => other?,
        };

        self.store
            .record(track_id, self.config.preferred_quality, &outcome.path)
            .await;
        Ok(outcome)
    }

    /// One fallback hop: the catalog's own fallback pointer first, an
    /// alternative-upload search second.
    async fn hop_to_replacement(
        &self,
        credential: &str,
        original: &TrackDescriptor,
    ) -> Result<DownloadOutcome> {
        let replacement_id = original
            .fallback_id
            .clone()
            .filter(|id| *id != original.track_id);

        let replacement = match replacement_id {
            Some(id) => {
                info!(fallback = %id, "trying catalog fallback track");
                self.catalog.track(credential, &id).await?
            }
            None => {
                info!("searching for an alternative upload");
                let hit = self
                    .catalog
                    .find_alternative(credential, original)
                    .await
                    .map_err(|err| match err {
                        CatalogError::NoAlternative => {
                            PipelineError::TrackUnavailable(original.track_id.clone())
                        }
                        other => other.into(),
                    })?;
                self.catalog.track(credential, &hit.track_id).await?
            }
        };

        self.process(credential, replacement, Some(original)).await
    }

    async fn process(
        &self,
        credential: &str,
        mut track: TrackDescriptor,
        original: Option<&TrackDescriptor>,
    ) -> Result<DownloadOutcome> {
        let quality = select_quality(self.config.preferred_quality, &track).ok_or_else(|| {
            PipelineError::QualityUnavailable {
                track_id: track.track_id.clone(),
            }
        })?;

        if track.has_album() {
            let album = self.catalog.album(credential, &track.album_id).await?;
            track.merge_album(&album);
        }

        let path = resolve_track_path(&self.config, &track, quality);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!(path = %path.display(), "file already on disk");
            return Ok(DownloadOutcome {
                track_id: track.track_id,
                path,
                status: OutcomeStatus::AlreadyExists,
                note: None,
                finished_at: Utc::now(),
            });
        }

        let payload = self.fetch_payload(credential, &track, quality).await?;
        let decrypted = decrypt_track(&payload, &track.track_id)?;

        let note = self.build_note(&track, original, quality);

        let cover_path = fetch_artwork(
            self.http.as_ref(),
            &track,
            &path,
            self.config.artwork_retry_delay,
        )
        .await;
        let cover = match &cover_path {
            Some(cover_path) => tokio::fs::read(cover_path).await.ok(),
            None => None,
        };

        // The inline lyrics preview is replaced by the full transcript when
        // the lyrics endpoint has one.
        if let Some(better) = self.catalog.lyrics(credential, &track.track_id).await {
            track.lyrics = Some(better);
        }

        let record = TagRecord::from_descriptor(&track);
        let (bytes, status) = mux_with_retries(self.config.mux_retry_delay, &decrypted, || {
            match quality.extension() {
                "flac" => write_flac(&decrypted, &record, cover.as_deref()),
                _ => Ok(write_id3(&decrypted, &record, cover.as_deref())),
            }
        })
        .await;

        write_file(&path, &bytes).await?;
        if let Some(cover_path) = &cover_path {
            remove_artwork(cover_path).await;
        }

        info!(path = %path.display(), ?status, "track stored");
        Ok(DownloadOutcome {
            track_id: track.track_id,
            path,
            status,
            note,
            finished_at: Utc::now(),
        })
    }

    /// Fetch the encrypted payload, retrying forbidden responses.
    ///
    /// One retry by default; two when the gateway advertised streaming
    /// rights, since a forbidden response is then likely transient. Anything
    /// else marks the track unavailable.
    async fn fetch_payload(
        &self,
        credential: &str,
        track: &TrackDescriptor,
        quality: Quality,
    ) -> Result<Vec<u8>> {
        let url = track_download_url(track, quality);
        let retry_budget = if track.has_rights { 2 } else { 1 };
        let mut retries = 0;

        loop {
            let request = HttpRequest::get(&url)
                .header("Cookie", format!("arl={credential}"))
                .header("Content-Type", "audio/mpeg");
            match self.http.execute(request).await {
                Ok(response) if response.is_success() => return Ok(response.body.to_vec()),
                Ok(response) if response.is_forbidden() && retries < retry_budget => {
                    retries += 1;
                    debug!(attempt = retries, "payload fetch forbidden, retrying");
                    sleep(self.config.track_retry_delay).await;
                }
                Ok(response) => {
                    warn!(status = response.status, "payload fetch failed");
                    return Err(PipelineError::TrackUnavailable(track.track_id.clone()));
                }
                Err(err) => {
                    warn!(error = %err, "payload fetch failed");
                    return Err(PipelineError::TrackUnavailable(track.track_id.clone()));
                }
            }
        }
    }

    fn build_note(
        &self,
        track: &TrackDescriptor,
        original: Option<&TrackDescriptor>,
        quality: Quality,
    ) -> Option<String> {
        let mut note = String::new();

        if let Some(original) = original {
            let changed = !original
                .title_version
                .trim()
                .eq_ignore_ascii_case(track.title_version.trim());
            if changed {
                note.push_str(&format!(
                    " › Used \"{} - {}\" as alternative",
                    original.display_album_artist(),
                    original.title_version
                ));
            }
        }

        if quality != self.config.preferred_quality {
            note.push_str(&format!(
                " › Used \"{}\" because \"{}\" wasn't available",
                quality.name(),
                self.config.preferred_quality.name()
            ));
        }

        (!note.is_empty()).then_some(note)
    }

}

/// Run the tag writer with a bounded retry; a stream the muxer keeps
/// rejecting is stored untagged rather than lost.
async fn mux_with_retries<F>(
    delay: Duration,
    audio: &[u8],
    mut write: F,
) -> (Vec<u8>, OutcomeStatus)
where
    F: FnMut() -> core_mux::Result<Vec<u8>>,
{
    for attempt in 1..=MUX_ATTEMPTS {
        match write() {
            Ok(tagged) => return (tagged, OutcomeStatus::Downloaded),
            Err(err) => {
                warn!(attempt, error = %err, "tag write failed");
                if attempt < MUX_ATTEMPTS {
                    sleep(delay).await;
                }
            }
        }
    }
    (audio.to_vec(), OutcomeStatus::StoredWithoutTags)
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let at_path = |source| PipelineError::Filesystem {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(at_path)?;
    }
    tokio::fs::write(path, bytes).await.map_err(at_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryTrackMatchStore;
    use async_trait::async_trait;
    use bytes::Bytes;
    use core_transport::{HttpResponse, TransportError};
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedClient {
        responses: Mutex<VecDeque<(u16, Vec<u8>)>>,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<(u16, Vec<u8>)>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedClient {
        async fn execute(
            &self,
            request: HttpRequest,
        ) -> core_transport::Result<HttpResponse> {
            self.requests.lock().unwrap().push(request.url.clone());
            let (status, body) = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| TransportError::Request("script exhausted".to_string()))?;
            Ok(HttpResponse {
                status,
                headers: HashMap::new(),
                body: Bytes::from(body),
            })
        }
    }

    const AUTH_OK: &str =
        r#"{"error": [], "results": {"USER": {"USER_ID": 42}, "checkForm": "tok"}}"#;
    const LYRICS_MISSING: &str = r#"{"error": {"DATA_ERROR": "no lyrics"}, "results": {}}"#;
    // Short enough to pass through decryption untouched.
    const AUDIO: &[u8] = b"AUDIO!";

    fn json(status: u16, body: &str) -> (u16, Vec<u8>) {
        (status, body.as_bytes().to_vec())
    }

    fn track_page(id: &str, title: &str, extra: serde_json::Value) -> String {
        let mut data = serde_json::json!({
            "SNG_ID": id,
            "SNG_TITLE": title,
            "ART_NAME": "Daft Punk",
            "ALB_ID": "0",
            "MD5_ORIGIN": "51afcde9",
            "MEDIA_VERSION": "8",
            "FILESIZE_MP3_128": 1,
            "FILESIZE_MP3_320": 1,
            "FILESIZE_FLAC": 0
        });
        for (key, value) in extra.as_object().unwrap() {
            data[key] = value.clone();
        }
        serde_json::json!({"error": [], "results": {"DATA": data}}).to_string()
    }

    async fn downloader_with(
        dir: &Path,
        script: Vec<(u16, Vec<u8>)>,
    ) -> (Downloader, Arc<ScriptedClient>) {
        let mut full = vec![json(200, AUTH_OK)];
        full.extend(script);
        let client = Arc::new(ScriptedClient::new(full));
        let sessions = Arc::new(SessionManager::new(client.clone()));
        sessions.register("arl").await.unwrap();

        let config = PipelineConfig {
            download_dir: dir.to_path_buf(),
            track_retry_delay: Duration::ZERO,
            artwork_retry_delay: Duration::ZERO,
            mux_retry_delay: Duration::ZERO,
            ..PipelineConfig::default()
        };
        let downloader = Downloader::new(
            client.clone(),
            sessions,
            Arc::new(InMemoryTrackMatchStore::new()),
            config,
        );
        (downloader, client)
    }

    #[tokio::test]
    async fn happy_path_downloads_and_tags() {
        let dir = tempfile::tempdir().unwrap();
        let (downloader, _client) = downloader_with(
            dir.path(),
            vec![
                json(200, &track_page("1", "One More Time", serde_json::json!({}))),
                (200, AUDIO.to_vec()),
                json(200, LYRICS_MISSING),
            ],
        )
        .await;

        let outcome = downloader.download("arl", "1").await.unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Downloaded);
        assert_eq!(
            outcome.path,
            dir.path().join("Daft Punk - One More Time.mp3")
        );
        assert!(outcome.note.is_none());

        let written = std::fs::read(&outcome.path).unwrap();
        assert_eq!(&written[..3], b"ID3");
        assert!(written.ends_with(AUDIO));
    }

    #[tokio::test]
    async fn second_request_skips_via_match_store() {
        let dir = tempfile::tempdir().unwrap();
        let (downloader, client) = downloader_with(
            dir.path(),
            vec![
                json(200, &track_page("1", "One More Time", serde_json::json!({}))),
                (200, AUDIO.to_vec()),
                json(200, LYRICS_MISSING),
            ],
        )
        .await;

        downloader.download("arl", "1").await.unwrap();
        let after_first = client.request_count();

        let outcome = downloader.download("arl", "1").await.unwrap();
        assert_eq!(outcome.status, OutcomeStatus::AlreadyExists);
        assert_eq!(client.request_count(), after_first);
    }

    #[tokio::test]
    async fn existing_file_on_disk_skips_the_fetch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Daft Punk - One More Time.mp3"), b"old").unwrap();

        let (downloader, client) = downloader_with(
            dir.path(),
            vec![json(200, &track_page("1", "One More Time", serde_json::json!({})))],
        )
        .await;

        let outcome = downloader.download("arl", "1").await.unwrap();
        assert_eq!(outcome.status, OutcomeStatus::AlreadyExists);
        // Auth plus the track page, nothing else.
        assert_eq!(client.request_count(), 2);
    }

    #[tokio::test]
    async fn no_downloadable_tier_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let (downloader, _client) = downloader_with(
            dir.path(),
            vec![json(
                200,
                &track_page(
                    "1",
                    "Gone",
                    serde_json::json!({"FILESIZE_MP3_128": 0, "FILESIZE_MP3_320": 0}),
                ),
            )],
        )
        .await;

        assert!(matches!(
            downloader.download("arl", "1").await,
            Err(PipelineError::QualityUnavailable { track_id }) if track_id == "1"
        ));
    }

    #[tokio::test]
    async fn degraded_quality_is_noted() {
        let dir = tempfile::tempdir().unwrap();
        let (downloader, _client) = downloader_with(
            dir.path(),
            vec![
                json(
                    200,
                    &track_page("1", "Low Fi", serde_json::json!({"FILESIZE_MP3_320": 0})),
                ),
                (200, AUDIO.to_vec()),
                json(200, LYRICS_MISSING),
            ],
        )
        .await;

        let outcome = downloader.download("arl", "1").await.unwrap();
        let note = outcome.note.unwrap();
        assert!(note.contains("MP3 - 128 kbps"));
        assert!(note.contains("\"MP3 - 320 kbps\" wasn't available"));
    }

    #[tokio::test]
    async fn forbidden_payload_exhausts_one_retry_without_rights() {
        let dir = tempfile::tempdir().unwrap();
        let (downloader, client) = downloader_with(
            dir.path(),
            vec![
                json(200, &track_page("1", "Blocked", serde_json::json!({}))),
                (403, vec![]),
                (403, vec![]),
            ],
        )
        .await;

        assert!(matches!(
            downloader.download("arl", "1").await,
            Err(PipelineError::TrackUnavailable(id)) if id == "1"
        ));
        // Auth, track page, two payload attempts.
        assert_eq!(client.request_count(), 4);
    }

    #[tokio::test]
    async fn catalog_fallback_is_tried_once() {
        let dir = tempfile::tempdir().unwrap();
        let (downloader, _client) = downloader_with(
            dir.path(),
            vec![
                json(
                    200,
                    &track_page(
                        "1",
                        "Original Mix",
                        serde_json::json!({"FALLBACK": {"SNG_ID": "2"}}),
                    ),
                ),
                (403, vec![]),
                (403, vec![]),
                json(200, &track_page("2", "Replacement Mix", serde_json::json!({}))),
                (200, AUDIO.to_vec()),
                json(200, LYRICS_MISSING),
            ],
        )
        .await;

        let outcome = downloader.download("arl", "1").await.unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Downloaded);
        assert_eq!(outcome.track_id, "2");
        assert!(outcome
            .note
            .unwrap()
            .contains("Used \"Daft Punk - Original Mix\" as alternative"));
    }

    #[tokio::test]
    async fn alternative_search_is_the_second_resort() {
        let dir = tempfile::tempdir().unwrap();
        let search = serde_json::json!({"error": [], "results": {"data": [{
            "SNG_ID": "9",
            "SNG_TITLE": "Aerodynamic",
            "ART_NAME": "Daft Punk",
            "MD5_ORIGIN": "51afcde9",
            "MEDIA_VERSION": "8",
            "DURATION": 0
        }]}})
        .to_string();

        let (downloader, _client) = downloader_with(
            dir.path(),
            vec![
                json(200, &track_page("1", "Aerodynamic", serde_json::json!({}))),
                (403, vec![]),
                (403, vec![]),
                json(200, &search),
                json(200, &track_page("9", "Aerodynamic", serde_json::json!({}))),
                (200, AUDIO.to_vec()),
                json(200, LYRICS_MISSING),
            ],
        )
        .await;

        let outcome = downloader.download("arl", "1").await.unwrap();
        assert_eq!(outcome.track_id, "9");
        // Same display title, so no alternative note.
        assert!(outcome.note.is_none());
    }

    #[tokio::test]
    async fn tag_writing_gets_three_retries_then_stores_untagged() {
        let mut calls = 0u32;
        let (bytes, status) = mux_with_retries(Duration::ZERO, b"raw audio", || {
            calls += 1;
            Err(core_mux::MuxError::NotFlac)
        })
        .await;

        assert_eq!(calls, 4);
        assert_eq!(status, OutcomeStatus::StoredWithoutTags);
        assert_eq!(bytes, b"raw audio");
    }

    #[tokio::test]
    async fn tag_writing_recovers_within_the_retry_budget() {
        let mut calls = 0u32;
        let (bytes, status) = mux_with_retries(Duration::ZERO, b"raw audio", || {
            calls += 1;
            if calls < 4 {
                Err(core_mux::MuxError::NotFlac)
            } else {
                Ok(b"tagged".to_vec())
            }
        })
        .await;

        assert_eq!(status, OutcomeStatus::Downloaded);
        assert_eq!(bytes, b"tagged");
    }

    #[tokio::test]
    async fn alternative_note_names_the_compilation_artist() {
        let dir = tempfile::tempdir().unwrap();
        let (downloader, _client) = downloader_with(
            dir.path(),
            vec![
                json(
                    200,
                    &track_page(
                        "1",
                        "Megamix",
                        serde_json::json!({"ART_NAME": "Various", "FALLBACK": {"SNG_ID": "2"}}),
                    ),
                ),
                (403, vec![]),
                (403, vec![]),
                json(200, &track_page("2", "Megamix Redux", serde_json::json!({}))),
                (200, AUDIO.to_vec()),
                json(200, LYRICS_MISSING),
            ],
        )
        .await;

        let outcome = downloader.download("arl", "1").await.unwrap();
        assert!(outcome
            .note
            .unwrap()
            .contains("Used \"Various Artists - Megamix\" as alternative"));
    }

    #[tokio::test]
    async fn replacement_failure_reports_the_requested_track() {
        let dir = tempfile::tempdir().unwrap();
        let (downloader, _client) = downloader_with(
            dir.path(),
            vec![
                json(200, &track_page("1", "Hopeless", serde_json::json!({}))),
                (403, vec![]),
                (403, vec![]),
                json(200, r#"{"error": {"DATA_ERROR": "nope"}, "results": {}}"#),
            ],
        )
        .await;

        assert!(matches!(
            downloader.download("arl", "1").await,
            Err(PipelineError::TrackUnavailable(id)) if id == "1"
        ));
    }
}
