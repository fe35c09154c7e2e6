use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Invalid rate limit action: {0}")]
    InvalidAction(String),

    #[error("Invalid client identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid checksum: expected {expected}, got {actual}")]
    InvalidChecksum { expected: String, actual: String },
}
