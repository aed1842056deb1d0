use tessera_core::KeyType;

use crate::signing::SignatureAlgorithm;

/// Cryptographic operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid KMS secret: {0}")]
    InvalidSecret(String),

    #[error("{algorithm} signatures cannot be produced with a {key_type} key")]
    UnsupportedAlgorithm {
        algorithm: SignatureAlgorithm,
        key_type: KeyType,
    },

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("signing failed: {0}")]
    SigningError(String),

    #[error("encryption failed: {0}")]
    EncryptionError(String),

    #[error("decryption failed: {0}")]
    DecryptionError(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}
