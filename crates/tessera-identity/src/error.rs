use tessera_crypto::CryptoError;
use tessera_store::StoreError;

/// Identity-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("cannot decrypt private key {kid}: {reason}")]
    DecryptionFailed { kid: String, reason: String },

    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("alias already exists: {0}")]
    AliasAlreadyExists(String),

    #[error("identifier not found: {0}")]
    IdentifierNotFound(String),

    #[error("unknown DID provider: {0}")]
    UnknownProvider(String),

    #[error("unsupported DID method: {0}")]
    UnsupportedMethod(String),

    #[error("invalid DID: {0}")]
    InvalidDid(String),

    #[error("failed to resolve {did}: {reason}")]
    ResolutionFailed {
        did: String,
        reason: String,
        /// Network and timeout failures; worth retrying.
        transient: bool,
    },

    #[error("invalid DID document: {0}")]
    InvalidDocument(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl IdentityError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ResolutionFailed { transient: true, .. })
    }

    pub(crate) fn resolution(did: &str, reason: impl Into<String>, transient: bool) -> Self {
        Self::ResolutionFailed {
            did: did.to_string(),
            reason: reason.into(),
            transient,
        }
    }
}

impl From<tessera_core::CoreError> for IdentityError {
    fn from(e: tessera_core::CoreError) -> Self {
        match e {
            tessera_core::CoreError::UnsupportedKeyType(t) => Self::UnsupportedKeyType(t),
            other => Self::InvalidDid(other.to_string()),
        }
    }
}
