use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("operation failed: {0}")]
    OperationFailed(String),
    /// One source position could not be decoded; the source itself is fine.
    #[error("corrupt frame: {0}")]
    CorruptFrame(String),
    #[error("video source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("storage error: {0}")]
    Storage(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
