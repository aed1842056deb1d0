use sha2::{Digest, Sha256};

/// 32-byte digest.
pub type Hash = [u8; 32];

/// Keccak-256, as used for Ethereum addresses and EIP-712.
pub fn keccak256(data: &[u8]) -> Hash {
    ethers_core::utils::keccak256(data)
}

/// SHA-256.
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}
