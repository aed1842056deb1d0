use std::fmt;

use ed25519_dalek::{Signer as _, Verifier as _};
use k256::ecdsa::signature::{Signer as _, Verifier as _};
use k256::ecdsa::{RecoveryId, Signature as Secp256k1Signature, VerifyingKey};

use crate::error::CryptoError;
use crate::hashing::sha256;
use crate::keys::{ethereum_address, KeyPair, PublicKey};

/// How a payload is turned into signature bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    /// Ed25519 over the raw message (64 bytes).
    EdDsa,
    /// secp256k1 ECDSA over SHA-256 of the message, compact `r || s` (64 bytes).
    Es256K,
    /// secp256k1 ECDSA over a caller-computed 32-byte digest, `r || s || v`
    /// with `v` in {27, 28} (65 bytes). Used for EIP-712 typed data.
    Es256KRecoverable,
}

impl SignatureAlgorithm {
    fn supports(&self, pair: &KeyPair) -> bool {
        matches!(
            (self, pair),
            (Self::EdDsa, KeyPair::Ed25519(_))
                | (Self::Es256K, KeyPair::Secp256k1(_))
                | (Self::Es256KRecoverable, KeyPair::Secp256k1(_))
        )
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EdDsa => write!(f, "EdDSA"),
            Self::Es256K => write!(f, "ES256K"),
            Self::Es256KRecoverable => write!(f, "ES256K-R"),
        }
    }
}

/// Sign `message` with `keypair` according to `algorithm`.
pub fn sign(
    keypair: &KeyPair,
    message: &[u8],
    algorithm: SignatureAlgorithm,
) -> Result<Vec<u8>, CryptoError> {
    if !algorithm.supports(keypair) {
        return Err(CryptoError::UnsupportedAlgorithm {
            algorithm,
            key_type: keypair.key_type(),
        });
    }

    match (algorithm, keypair) {
        (SignatureAlgorithm::EdDsa, KeyPair::Ed25519(sk)) => Ok(sk.sign(message).to_bytes().to_vec()),
        (SignatureAlgorithm::Es256K, KeyPair::Secp256k1(sk)) => {
            let sig: Secp256k1Signature = sk.sign(message);
            Ok(sig.to_bytes().to_vec())
        }
        (SignatureAlgorithm::Es256KRecoverable, KeyPair::Secp256k1(sk)) => {
            if message.len() != 32 {
                return Err(CryptoError::InvalidInput(format!(
                    "recoverable signatures need a 32-byte digest, got {} bytes",
                    message.len()
                )));
            }
            let (sig, recid) = sk
                .sign_prehash_recoverable(message)
                .map_err(|e| CryptoError::SigningError(e.to_string()))?;
            let mut out = sig.to_bytes().to_vec();
            out.push(27 + recid.to_byte());
            Ok(out)
        }
        _ => Err(CryptoError::UnsupportedAlgorithm {
            algorithm,
            key_type: keypair.key_type(),
        }),
    }
}

/// Verify `signature` over `message` against a public key.
pub fn verify(
    public_key: &PublicKey,
    message: &[u8],
    signature: &[u8],
    algorithm: SignatureAlgorithm,
) -> Result<(), CryptoError> {
    match (algorithm, public_key) {
        (SignatureAlgorithm::EdDsa, PublicKey::Ed25519(vk)) => {
            let sig = ed25519_dalek::Signature::from_slice(signature)
                .map_err(|_| CryptoError::SignatureVerificationFailed)?;
            vk.verify(message, &sig)
                .map_err(|_| CryptoError::SignatureVerificationFailed)
        }
        (SignatureAlgorithm::Es256K, PublicKey::Secp256k1(vk)) => {
            let sig = Secp256k1Signature::from_slice(signature)
                .map_err(|_| CryptoError::SignatureVerificationFailed)?;
            vk.verify(message, &sig)
                .map_err(|_| CryptoError::SignatureVerificationFailed)
        }
        (SignatureAlgorithm::Es256KRecoverable, PublicKey::Secp256k1(vk)) => {
            let recovered = recover_address(message, signature)?;
            if recovered == ethereum_address(vk) {
                Ok(())
            } else {
                Err(CryptoError::SignatureVerificationFailed)
            }
        }
        (algorithm, pk) => Err(CryptoError::UnsupportedAlgorithm {
            algorithm,
            key_type: pk.key_type(),
        }),
    }
}

/// Verify a secp256k1 signature against an Ethereum address instead of a
/// public key, for verification methods that only publish an account id.
///
/// Recoverable signatures carry their recovery id; for compact `ES256K`
/// signatures both candidates are tried over SHA-256 of the message.
pub fn verify_address(
    address: &[u8; 20],
    message: &[u8],
    signature: &[u8],
    algorithm: SignatureAlgorithm,
) -> Result<(), CryptoError> {
    let matches = match algorithm {
        SignatureAlgorithm::Es256KRecoverable => recover_address(message, signature)? == *address,
        SignatureAlgorithm::Es256K => {
            let sig = Secp256k1Signature::from_slice(signature)
                .map_err(|_| CryptoError::SignatureVerificationFailed)?;
            let digest = sha256(message);
            (0u8..2).any(|id| {
                RecoveryId::from_byte(id)
                    .and_then(|recid| VerifyingKey::recover_from_prehash(&digest, &sig, recid).ok())
                    .map(|vk| ethereum_address(&vk) == *address)
                    .unwrap_or(false)
            })
        }
        SignatureAlgorithm::EdDsa => {
            return Err(CryptoError::UnsupportedAlgorithm {
                algorithm,
                key_type: tessera_core::KeyType::Secp256k1,
            })
        }
    };
    if matches {
        Ok(())
    } else {
        Err(CryptoError::SignatureVerificationFailed)
    }
}

/// Recover the Ethereum address that produced a 65-byte recoverable
/// signature over a 32-byte digest.
pub fn recover_address(digest: &[u8], signature: &[u8]) -> Result<[u8; 20], CryptoError> {
    if signature.len() != 65 {
        return Err(CryptoError::SignatureVerificationFailed);
    }
    let sig = Secp256k1Signature::from_slice(&signature[..64])
        .map_err(|_| CryptoError::SignatureVerificationFailed)?;
    let v = signature[64];
    let recid = RecoveryId::from_byte(if v >= 27 { v - 27 } else { v })
        .ok_or(CryptoError::SignatureVerificationFailed)?;
    let vk = VerifyingKey::recover_from_prehash(digest, &sig, recid)
        .map_err(|_| CryptoError::SignatureVerificationFailed)?;
    Ok(ethereum_address(&vk))
}
