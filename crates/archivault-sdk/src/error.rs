use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("vault error: {0}")]
    Vault(#[from] archivault_vault::VaultError),

    #[error("store error: {0}")]
    Store(#[from] archivault_cache::StoreError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document has no root resource")]
    NoRoot,
}

pub type SdkResult<T> = Result<T, SdkError>;
