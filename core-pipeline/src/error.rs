use thiserror::Error;

use core_catalog::CatalogError;
use core_session::SessionError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Track {0} is not available")]
    TrackUnavailable(String),

    #[error("No quality tier of track {track_id} is downloadable")]
    QualityUnavailable { track_id: String },

    #[error("Catalog lookup failed: {0}")]
    Catalog(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Payload decryption failed: {0}")]
    Decrypt(#[from] core_crypto::CryptoError),

    #[error("Transport error: {0}")]
    Transport(#[from] core_transport::TransportError),

    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid pipeline configuration: {0}")]
    Config(String),
}

impl From<CatalogError> for PipelineError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::TrackUnavailable(id) => PipelineError::TrackUnavailable(id),
            CatalogError::NoAlternative => {
                PipelineError::Catalog("no alternative track matched".to_string())
            }
            CatalogError::AlbumUnavailable(_) => PipelineError::Catalog(err.to_string()),
            CatalogError::Session(err) => PipelineError::Session(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
