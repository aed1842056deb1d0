use std::fmt;

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::CryptoError;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KDF_CONTEXT: &str = "tessera-kms-secretbox-v1";

/// Symmetric box sealing private key material at rest.
///
/// The cipher key is derived with BLAKE3 from the process-wide KMS secret
/// (32 bytes, hex-encoded). Sealed blobs are `nonce (12) || ciphertext`,
/// where the ciphertext carries a 16-byte Poly1305 tag, so opening with any
/// other secret fails authentication instead of yielding garbled bytes.
pub struct SecretBox {
    key: Zeroizing<[u8; 32]>,
}

impl SecretBox {
    /// Create a box from a hex-encoded 32-byte secret.
    pub fn new(secret_hex: &str) -> Result<Self, CryptoError> {
        let secret = Zeroizing::new(
            hex::decode(secret_hex.trim())
                .map_err(|_| CryptoError::InvalidSecret("secret must be hex-encoded".into()))?,
        );
        if secret.len() != 32 {
            return Err(CryptoError::InvalidSecret(format!(
                "secret must be 32 bytes, got {}",
                secret.len()
            )));
        }
        let key = Zeroizing::new(blake3::derive_key(KDF_CONTEXT, &secret));
        Ok(Self { key })
    }

    /// Generate a fresh random secret suitable for [`SecretBox::new`].
    pub fn generate_secret() -> String {
        let mut secret = Zeroizing::new([0u8; 32]);
        rand::rngs::OsRng.fill_bytes(&mut *secret);
        hex::encode(&*secret)
    }

    /// Seal `plaintext` under a random nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);

        let cipher = ChaCha20Poly1305::new_from_slice(&*self.key)
            .map_err(|e| CryptoError::EncryptionError(format!("cipher init failed: {}", e)))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| CryptoError::EncryptionError(format!("encryption failed: {}", e)))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Open a sealed blob. The returned plaintext is wiped on drop.
    pub fn decrypt(&self, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::DecryptionError("sealed blob too short".into()));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);

        let cipher = ChaCha20Poly1305::new_from_slice(&*self.key)
            .map_err(|e| CryptoError::DecryptionError(format!("cipher init failed: {}", e)))?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::DecryptionError("authentication failed".into()))?;
        Ok(Zeroizing::new(plaintext))
    }
}

impl fmt::Debug for SecretBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretBox").field("key", &"<redacted>").finish()
    }
}
