use ed25519_dalek::{SigningKey as Ed25519SigningKey, VerifyingKey as Ed25519VerifyingKey};
use k256::ecdsa::{SigningKey as Secp256k1SigningKey, VerifyingKey as Secp256k1VerifyingKey};
use rand::rngs::OsRng;
use tessera_core::KeyType;
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::hashing::keccak256;

/// Multicodec prefix of an Ed25519 public key (`0xed01`).
const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];

/// Private key material for one of the supported curves.
/// Both inner signing keys zeroize themselves on drop.
pub enum KeyPair {
    Ed25519(Ed25519SigningKey),
    Secp256k1(Secp256k1SigningKey),
}

impl KeyPair {
    /// Generate a new random key pair using OS-provided entropy.
    pub fn generate(key_type: KeyType) -> Self {
        tracing::debug!(%key_type, "generating key pair");
        match key_type {
            KeyType::Ed25519 => Self::Ed25519(Ed25519SigningKey::generate(&mut OsRng)),
            KeyType::Secp256k1 => Self::Secp256k1(Secp256k1SigningKey::random(&mut OsRng)),
        }
    }

    /// Rebuild a key pair from its 32-byte secret scalar / seed.
    pub fn from_secret_bytes(key_type: KeyType, bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        match key_type {
            KeyType::Ed25519 => {
                let mut seed = Zeroizing::new([0u8; 32]);
                seed.copy_from_slice(bytes);
                Ok(Self::Ed25519(Ed25519SigningKey::from_bytes(&seed)))
            }
            KeyType::Secp256k1 => Secp256k1SigningKey::from_slice(bytes)
                .map(Self::Secp256k1)
                .map_err(|e| CryptoError::InvalidKey(format!("invalid secp256k1 scalar: {}", e))),
        }
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            Self::Ed25519(_) => KeyType::Ed25519,
            Self::Secp256k1(_) => KeyType::Secp256k1,
        }
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        match self {
            Self::Ed25519(sk) => PublicKey::Ed25519(sk.verifying_key()),
            Self::Secp256k1(sk) => PublicKey::Secp256k1(*sk.verifying_key()),
        }
    }

    /// Raw secret bytes (32 bytes), wiped when the returned buffer drops.
    /// Only meant for sealing into a `SecretBox`.
    pub fn secret_bytes(&self) -> Zeroizing<Vec<u8>> {
        match self {
            Self::Ed25519(sk) => Zeroizing::new(sk.to_bytes().to_vec()),
            Self::Secp256k1(sk) => Zeroizing::new(sk.to_bytes().to_vec()),
        }
    }
}

/// Public key for verification operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Ed25519(Ed25519VerifyingKey),
    Secp256k1(Secp256k1VerifyingKey),
}

impl PublicKey {
    /// Decode from raw bytes: 32 bytes for Ed25519, SEC1 (33 or 65 bytes)
    /// for secp256k1.
    pub fn from_bytes(key_type: KeyType, bytes: &[u8]) -> Result<Self, CryptoError> {
        match key_type {
            KeyType::Ed25519 => {
                let arr: [u8; 32] =
                    bytes
                        .try_into()
                        .map_err(|_| CryptoError::InvalidKeyLength {
                            expected: 32,
                            actual: bytes.len(),
                        })?;
                Ed25519VerifyingKey::from_bytes(&arr)
                    .map(Self::Ed25519)
                    .map_err(|e| CryptoError::InvalidKey(format!("invalid ed25519 key: {}", e)))
            }
            KeyType::Secp256k1 => Secp256k1VerifyingKey::from_sec1_bytes(bytes)
                .map(Self::Secp256k1)
                .map_err(|e| CryptoError::InvalidKey(format!("invalid secp256k1 key: {}", e))),
        }
    }

    /// Decode from a hex string.
    pub fn from_hex(key_type: KeyType, hex_str: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_str.trim_start_matches("0x"))
            .map_err(|e| CryptoError::InvalidInput(format!("invalid hex: {}", e)))?;
        Self::from_bytes(key_type, &bytes)
    }

    /// Decode an Ed25519 key from a base58btc multibase string (`z...`),
    /// with or without the multicodec prefix.
    pub fn from_multibase(value: &str) -> Result<Self, CryptoError> {
        let encoded = value
            .strip_prefix('z')
            .ok_or_else(|| CryptoError::InvalidInput("only base58btc multibase is supported".into()))?;
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| CryptoError::InvalidInput(format!("invalid base58: {}", e)))?;
        let raw = bytes.strip_prefix(&ED25519_MULTICODEC[..]).unwrap_or(&bytes);
        Self::from_bytes(KeyType::Ed25519, raw)
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            Self::Ed25519(_) => KeyType::Ed25519,
            Self::Secp256k1(_) => KeyType::Secp256k1,
        }
    }

    /// Raw bytes; secp256k1 keys are SEC1-compressed.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Ed25519(vk) => vk.as_bytes().to_vec(),
            Self::Secp256k1(vk) => vk.to_encoded_point(true).as_bytes().to_vec(),
        }
    }

    /// Encode as hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Multibase (base58btc) encoding with the Ed25519 multicodec prefix,
    /// as used by `did:key`. `None` for secp256k1 keys.
    pub fn to_multibase(&self) -> Option<String> {
        match self {
            Self::Ed25519(vk) => {
                let mut bytes = ED25519_MULTICODEC.to_vec();
                bytes.extend_from_slice(vk.as_bytes());
                Some(format!("z{}", bs58::encode(bytes).into_string()))
            }
            Self::Secp256k1(_) => None,
        }
    }

    /// Ethereum address derived from a secp256k1 key.
    pub fn ethereum_address(&self) -> Option<[u8; 20]> {
        match self {
            Self::Secp256k1(vk) => Some(ethereum_address(vk)),
            Self::Ed25519(_) => None,
        }
    }
}

/// Last 20 bytes of keccak256 over the uncompressed public point.
pub fn ethereum_address(vk: &Secp256k1VerifyingKey) -> [u8; 20] {
    let point = vk.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// `0x`-prefixed lowercase hex form of an address.
pub fn format_address(address: &[u8; 20]) -> String {
    format!("0x{}", hex::encode(address))
}
