/// Persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("migration {version} ({name}) failed: {reason}")]
    Migration {
        version: u32,
        name: &'static str,
        reason: String,
    },

    #[error("alias already exists: {0}")]
    AliasAlreadyExists(String),

    #[error("identifier already exists: {0}")]
    DuplicateDid(String),

    #[error("service already exists: {0}")]
    DuplicateService(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl From<rocksdb::Error> for StoreError {
    fn from(e: rocksdb::Error) -> Self {
        Self::Backend(e.into_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Corrupt(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
