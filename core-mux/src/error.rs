use thiserror::Error;

#[derive(Error, Debug)]
pub enum MuxError {
    #[error("Payload is not a FLAC stream")]
    NotFlac,

    #[error("FLAC stream truncated inside a metadata block")]
    Truncated,
}

pub type Result<T> = std::result::Result<T, MuxError>;
