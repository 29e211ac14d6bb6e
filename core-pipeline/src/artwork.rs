//! Album artwork fetching.
//!
//! Artwork is decorative: every failure degrades to `None` and the download
//! proceeds untagged-of-cover. The cover is cached next to the audio file
//! and removed again once the muxer has embedded it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use core_catalog::{artwork_url, TrackDescriptor};
use core_transport::{HttpClient, HttpRequest};

/// Forbidden fetches are retried this many times before degrading.
const MAX_FORBIDDEN_RETRIES: u32 = 3;

/// Fetch the track's cover next to its audio file.
///
/// Reuses a sibling `.jpg` left by an earlier track of the same album.
#[instrument(skip_all, fields(track_id = %track.track_id))]
pub async fn fetch_artwork(
    http: &dyn HttpClient,
    track: &TrackDescriptor,
    audio_path: &Path,
    retry_delay: Duration,
) -> Option<PathBuf> {
    let picture_id = track.album_picture.as_deref()?;
    let cover_path = audio_path.with_extension("jpg");

    if tokio::fs::try_exists(&cover_path).await.unwrap_or(false) {
        debug!(path = %cover_path.display(), "reusing cached artwork");
        return Some(cover_path);
    }

    let url = artwork_url(picture_id);
    let mut forbidden_retries = 0;
    loop {
        let request = HttpRequest::get(&url).header("Content-Type", "image/jpeg");
        match http.execute(request).await {
            Ok(response) if response.is_success() => {
                if let Some(parent) = cover_path.parent() {
                    if tokio::fs::create_dir_all(parent).await.is_err() {
                        return None;
                    }
                }
                return match tokio::fs::write(&cover_path, &response.body).await {
                    Ok(()) => Some(cover_path),
                    Err(err) => {
                        warn!(error = %err, "failed to store artwork");
                        None
                    }
                };
            }
            Ok(response) if response.is_forbidden() && forbidden_retries < MAX_FORBIDDEN_RETRIES => {
                forbidden_retries += 1;
                debug!(attempt = forbidden_retries, "artwork fetch forbidden, retrying");
                sleep(retry_delay).await;
            }
            Ok(_) | Err(_) => return None,
        }
    }
}

/// Best-effort removal of the cover cache once it has been embedded.
pub async fn remove_artwork(cover_path: &Path) {
    let _ = tokio::fs::remove_file(cover_path).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use core_catalog::types::TrackData;
    use core_transport::{HttpResponse, TransportError};
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    struct ScriptedClient {
        responses: Mutex<VecDeque<u16>>,
        calls: Mutex<usize>,
    }

    impl ScriptedClient {
        fn new(statuses: Vec<u16>) -> Self {
            Self {
                responses: Mutex::new(statuses.into_iter().collect()),
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedClient {
        async fn execute(
            &self,
            _request: HttpRequest,
        ) -> core_transport::Result<HttpResponse> {
            *self.calls.lock().unwrap() += 1;
            let status = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| TransportError::Request("script exhausted".to_string()))?;
            Ok(HttpResponse {
                status,
                headers: HashMap::new(),
                body: Bytes::from_static(&[0xFF, 0xD8, 0xFF]),
            })
        }
    }

    fn track(picture: Option<&str>) -> TrackDescriptor {
        let mut raw = serde_json::json!({
            "SNG_ID": "1",
            "SNG_TITLE": "t",
            "ART_NAME": "a",
            "MD5_ORIGIN": "ab",
            "MEDIA_VERSION": "1",
        });
        if let Some(picture) = picture {
            raw["ALB_PICTURE"] = picture.into();
        }
        let data: TrackData = serde_json::from_value(raw).unwrap();
        TrackDescriptor::from_wire(data, None)
    }

    #[tokio::test]
    async fn missing_picture_id_degrades_without_network() {
        let client = ScriptedClient::new(vec![200]);
        let dir = tempfile::tempdir().unwrap();
        let result = fetch_artwork(
            &client,
            &track(None),
            &dir.path().join("a.mp3"),
            Duration::ZERO,
        )
        .await;
        assert!(result.is_none());
        assert_eq!(*client.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn successful_fetch_writes_sibling_jpg() {
        let client = ScriptedClient::new(vec![200]);
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("a.flac");

        let cover = fetch_artwork(&client, &track(Some("pic")), &audio, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(cover, dir.path().join("a.jpg"));
        assert_eq!(std::fs::read(&cover).unwrap(), vec![0xFF, 0xD8, 0xFF]);

        remove_artwork(&cover).await;
        assert!(!cover.exists());
    }

    #[tokio::test]
    async fn cached_cover_short_circuits() {
        let client = ScriptedClient::new(vec![]);
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("a.mp3");
        std::fs::write(dir.path().join("a.jpg"), b"cached").unwrap();

        let cover = fetch_artwork(&client, &track(Some("pic")), &audio, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(std::fs::read(cover).unwrap(), b"cached");
        assert_eq!(*client.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn forbidden_fetch_retries_then_succeeds() {
        let client = ScriptedClient::new(vec![403, 403, 200]);
        let dir = tempfile::tempdir().unwrap();
        let cover = fetch_artwork(
            &client,
            &track(Some("pic")),
            &dir.path().join("a.mp3"),
            Duration::ZERO,
        )
        .await;
        assert!(cover.is_some());
        assert_eq!(*client.calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn forbidden_fetch_degrades_after_retry_budget() {
        let client = ScriptedClient::new(vec![403, 403, 403, 403, 403]);
        let dir = tempfile::tempdir().unwrap();
        let cover = fetch_artwork(
            &client,
            &track(Some("pic")),
            &dir.path().join("a.mp3"),
            Duration::ZERO,
        )
        .await;
        assert!(cover.is_none());
        // Initial attempt plus three retries.
        assert_eq!(*client.calls.lock().unwrap(), 4);
    }
}
