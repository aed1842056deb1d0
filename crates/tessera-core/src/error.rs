/// Core type errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid DID format: {0}")]
    InvalidDid(String),

    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
