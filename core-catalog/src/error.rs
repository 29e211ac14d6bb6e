use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Track {0} is not available from the catalog")]
    TrackUnavailable(String),

    #[error("Album {0} is not available from the catalog")]
    AlbumUnavailable(String),

    #[error("No alternative track matched")]
    NoAlternative,

    #[error(transparent)]
    Session(#[from] core_session::SessionError),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
