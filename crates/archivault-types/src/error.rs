use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("invalid entity id: {0:?}")]
    InvalidId(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
