pub mod encryption;
pub mod error;
pub mod hashing;
pub mod keys;
pub mod signing;

pub use encryption::SecretBox;
pub use error::CryptoError;
pub use hashing::{keccak256, sha256, Hash};
pub use keys::{ethereum_address, format_address, KeyPair, PublicKey};
pub use signing::{recover_address, sign, verify, verify_address, SignatureAlgorithm};
