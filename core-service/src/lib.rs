//! Download service façade and bootstrap helpers.
//!
//! This crate wires the transport, session and pipeline layers into a single
//! handle a host application talks to. Hosts that only want the defaults call
//! [`DownloadService::new`]; embedders swap in their own HTTP client or match
//! store through [`ServiceDependencies`] (tests do exactly that with scripted
//! transports).

pub mod error;

pub use error::{Result, ServiceError};

// Hosts usually want the logging bootstrap alongside the facade.
pub use core_runtime::{init_logging, LogFormat, LogLevel, LoggingConfig};

use std::sync::Arc;

use tracing::{info, instrument};

use core_pipeline::{
    DownloadOutcome, Downloader, InMemoryTrackMatchStore, PipelineConfig, Scheduler,
    TrackMatchStore,
};
use core_session::SessionManager;
use core_transport::{HttpClient, ReqwestHttpClient};

/// Aggregated handle to the external dependencies the service requires.
pub struct ServiceDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub match_store: Arc<dyn TrackMatchStore>,
}

impl ServiceDependencies {
    /// Construct a dependency bundle from explicit handles.
    pub fn new(http_client: Arc<dyn HttpClient>, match_store: Arc<dyn TrackMatchStore>) -> Self {
        Self {
            http_client,
            match_store,
        }
    }
}

impl Default for ServiceDependencies {
    fn default() -> Self {
        Self {
            http_client: Arc::new(ReqwestHttpClient::new()),
            match_store: Arc::new(InMemoryTrackMatchStore::new()),
        }
    }
}

/// Primary façade exposed to host applications.
///
/// Cloning is cheap; all clones share the same sessions, scheduler and match
/// store, so the concurrency limit holds across the whole process.
#[derive(Clone)]
pub struct DownloadService {
    sessions: Arc<SessionManager>,
    scheduler: Arc<Scheduler>,
    downloader: Arc<Downloader>,
}

impl DownloadService {
    /// Create a service with the stock HTTP client and an in-memory match
    /// store.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_dependencies(config, ServiceDependencies::default())
    }

    /// Create a service from explicit dependencies.
    pub fn with_dependencies(config: PipelineConfig, deps: ServiceDependencies) -> Result<Self> {
        config.validate()?;

        let sessions = Arc::new(SessionManager::new(Arc::clone(&deps.http_client)));
        let scheduler = Arc::new(Scheduler::new(config.concurrent_downloads));
        let downloader = Arc::new(Downloader::new(
            deps.http_client,
            Arc::clone(&sessions),
            deps.match_store,
            config,
        ));

        Ok(Self {
            sessions,
            scheduler,
            downloader,
        })
    }

    /// Register a credential, verifying it against the service right away.
    pub async fn register_credential(&self, credential: &str) -> Result<()> {
        self.sessions.register(credential).await?;
        Ok(())
    }

    /// Whether a credential has been registered.
    pub async fn has_credential(&self, credential: &str) -> bool {
        self.sessions.has_credential(credential).await
    }

    /// Download one track, waiting for a scheduler slot first.
    ///
    /// Requests for the same track id are serialized: a second request queues
    /// behind the first and then usually resolves straight from the match
    /// store.
    #[instrument(skip(self, credential))]
    pub async fn download(&self, credential: &str, track_id: &str) -> Result<DownloadOutcome> {
        let _guard = self.scheduler.admit(track_id).await;
        let outcome = self.downloader.download(credential, track_id).await?;
        info!(
            track_id = %outcome.track_id,
            path = %outcome.path.display(),
            status = ?outcome.status,
            "download finished"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use core_pipeline::OutcomeStatus;
    use core_transport::{HttpRequest, HttpResponse, TransportError};
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedClient {
        responses: Mutex<VecDeque<(u16, Vec<u8>)>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<(u16, Vec<u8>)>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedClient {
        async fn execute(&self, _request: HttpRequest) -> core_transport::Result<HttpResponse> {
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

    fn json(status: u16, body: &str) -> (u16, Vec<u8>) {
        (status, body.as_bytes().to_vec())
    }

    fn track_page(id: &str, title: &str) -> String {
        serde_json::json!({
            "error": [],
            "results": {
                "DATA": {
                    "SNG_ID": id,
                    "SNG_TITLE": title,
                    "ART_NAME": "Daft Punk",
                    "ALB_ID": "0",
                    "MD5_ORIGIN": "51afcde9",
                    "MEDIA_VERSION": "8",
                    "FILESIZE_MP3_128": 1,
                    "FILESIZE_MP3_320": 1,
                    "FILESIZE_FLAC": 0
                }
            }
        })
        .to_string()
    }

    fn service_with(dir: &std::path::Path, script: Vec<(u16, Vec<u8>)>) -> DownloadService {
        let config = PipelineConfig {
            download_dir: dir.to_path_buf(),
            track_retry_delay: Duration::ZERO,
            artwork_retry_delay: Duration::ZERO,
            mux_retry_delay: Duration::ZERO,
            ..PipelineConfig::default()
        };
        let deps = ServiceDependencies {
            http_client: Arc::new(ScriptedClient::new(script)),
            match_store: Arc::new(InMemoryTrackMatchStore::new()),
        };
        DownloadService::with_dependencies(config, deps).unwrap()
    }

    #[tokio::test]
    async fn downloads_end_to_end_through_the_facade() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(
            dir.path(),
            vec![
                json(200, AUTH_OK),
                json(200, &track_page("1", "One More Time")),
                (200, b"AUDIO!".to_vec()),
                json(200, LYRICS_MISSING),
            ],
        );
        service.register_credential("arl").await.unwrap();

        let outcome = service.download("arl", "1").await.unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Downloaded);
        assert!(outcome.path.exists());
    }

    #[tokio::test]
    async fn rejects_invalid_configuration() {
        let config = PipelineConfig::default().with_concurrent_downloads(0);
        let err = DownloadService::with_dependencies(config, ServiceDependencies::default())
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::Pipeline(_)));
    }

    #[tokio::test]
    async fn duplicate_registration_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(dir.path(), vec![json(200, AUTH_OK)]);
        service.register_credential("arl").await.unwrap();
        let err = service.register_credential("arl").await.err().unwrap();
        assert!(matches!(err, ServiceError::Session(_)));
        assert!(service.has_credential("arl").await);
    }

    #[tokio::test]
    async fn clones_share_registered_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(dir.path(), vec![json(200, AUTH_OK)]);
        let clone = service.clone();
        service.register_credential("arl").await.unwrap();
        assert!(clone.has_credential("arl").await);
    }
}
