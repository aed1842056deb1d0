use std::sync::Arc;

use tessera_core::{Key, KeyType};
use tessera_crypto::{CryptoError, KeyPair, SecretBox, SignatureAlgorithm};
use tessera_store::{KeyStore, PrivateKeyRecord, PrivateKeyStore};

use crate::error::IdentityError;

/// Label recorded on keys held by this process.
pub const LOCAL_KMS: &str = "local";

/// Key custody: generates key pairs, seals private halves with the KMS
/// secret and signs on behalf of stored keys.
///
/// Decrypted key material only exists for the duration of a `sign` call.
pub struct KeyManager {
    keys: Arc<dyn KeyStore>,
    private_keys: Arc<dyn PrivateKeyStore>,
    secret_box: SecretBox,
}

impl KeyManager {
    pub fn new(
        keys: Arc<dyn KeyStore>,
        private_keys: Arc<dyn PrivateKeyStore>,
        secret_box: SecretBox,
    ) -> Self {
        Self {
            keys,
            private_keys,
            secret_box,
        }
    }

    /// Generate and persist a new key. The key id is the hex public key.
    pub async fn create_key(&self, key_type: KeyType) -> Result<Key, IdentityError> {
        let pair = KeyPair::generate(key_type);
        let public_key = pair.public_key();
        let kid = public_key.to_hex();

        let sealed = self.secret_box.encrypt(&pair.secret_bytes())?;
        let record = PrivateKeyRecord {
            kid: kid.clone(),
            key_type,
            sealed_hex: hex::encode(sealed),
        };
        let key = Key {
            kid: kid.clone(),
            kms: LOCAL_KMS.to_string(),
            key_type,
            public_key_hex: kid.clone(),
        };

        self.private_keys.put_private_key(&record).await?;
        self.keys.put_key(&key).await?;

        tracing::info!(kid = %kid, %key_type, "key created");
        Ok(key)
    }

    /// Same as [`KeyManager::create_key`], taking the type by name.
    pub async fn create_key_named(&self, key_type: &str) -> Result<Key, IdentityError> {
        let key_type: KeyType = key_type.parse()?;
        self.create_key(key_type).await
    }

    /// Public handle of a stored key.
    pub async fn get(&self, kid: &str) -> Result<Key, IdentityError> {
        self.keys
            .get_key(kid)
            .await?
            .ok_or_else(|| IdentityError::KeyNotFound(kid.to_string()))
    }

    /// Sign `payload` with the key `kid`.
    ///
    /// `Es256KRecoverable` expects `payload` to be the 32-byte digest of
    /// the typed data; the other algorithms take the raw signing input.
    pub async fn sign(
        &self,
        kid: &str,
        payload: &[u8],
        algorithm: SignatureAlgorithm,
    ) -> Result<Vec<u8>, IdentityError> {
        let record = self
            .private_keys
            .get_private_key(kid)
            .await?
            .ok_or_else(|| IdentityError::KeyNotFound(kid.to_string()))?;

        let sealed = hex::decode(&record.sealed_hex).map_err(|e| IdentityError::DecryptionFailed {
            kid: kid.to_string(),
            reason: format!("sealed key is not hex: {}", e),
        })?;
        let secret = self
            .secret_box
            .decrypt(&sealed)
            .map_err(|e| IdentityError::DecryptionFailed {
                kid: kid.to_string(),
                reason: e.to_string(),
            })?;
        let pair = KeyPair::from_secret_bytes(record.key_type, &secret).map_err(|e| {
            IdentityError::DecryptionFailed {
                kid: kid.to_string(),
                reason: e.to_string(),
            }
        })?;

        tracing::debug!(kid = %kid, %algorithm, "signing");
        tessera_crypto::sign(&pair, payload, algorithm).map_err(|e| match e {
            CryptoError::UnsupportedAlgorithm { .. } => IdentityError::UnsupportedFormat(e.to_string()),
            other => IdentityError::Crypto(other),
        })
    }
}
