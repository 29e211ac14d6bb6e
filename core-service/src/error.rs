use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Service initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Session error: {0}")]
    Session(#[from] core_session::SessionError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] core_pipeline::PipelineError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
