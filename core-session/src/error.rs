use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("A session already exists for this credential")]
    DuplicateCredential,

    #[error("No session registered for this credential")]
    UnknownCredential,

    #[error("Credential rejected: the service answered with an anonymous profile")]
    BadCredentials,

    #[error("Session token invalidated and re-authentication did not recover it")]
    TokenInvalidated,

    #[error("Protocol error in {method}: {reason}")]
    Protocol { method: String, reason: String },

    #[error("Gateway {method} failed: {message}")]
    Gateway { method: String, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] core_transport::TransportError),

    #[error("Malformed gateway payload: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
