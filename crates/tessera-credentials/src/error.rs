use tessera_identity::IdentityError;

/// Credential issuance, status and verification errors.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("unsupported proof format: {0}")]
    UnsupportedFormat(String),

    #[error("proof suite already registered: {0}")]
    DuplicateProofSuite(String),

    #[error("status method already registered: {0}")]
    DuplicateStatusMethod(String),

    #[error("unknown credential status type: {0}")]
    UnknownStatusType(String),

    #[error("status lookup at {url} failed: {reason}")]
    StatusFetchError { url: String, reason: String },

    #[error("cannot encode credential for signing: {0}")]
    Encoding(String),

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("invalid credential: {0}")]
    InvalidCredential(#[from] tessera_core::CoreError),
}

impl CredentialError {
    /// Map identity errors that mean "wrong proof format" to `UnsupportedFormat`.
    pub(crate) fn from_signing(e: IdentityError) -> Self {
        match e {
            IdentityError::UnsupportedFormat(reason) => Self::UnsupportedFormat(reason),
            other => Self::Identity(other),
        }
    }
}
