use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("invalid cipher key length")]
    InvalidKeyLength,
}

pub type Result<T> = std::result::Result<T, CryptoError>;
