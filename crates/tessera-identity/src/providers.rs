use tessera_core::KeyType;
use tessera_crypto::{format_address, PublicKey};

use crate::error::IdentityError;

/// Builds DIDs of one method from freshly created controller keys.
pub trait DidProvider: Send + Sync {
    /// Key type the provider's DIDs are controlled by.
    fn key_type(&self) -> KeyType;

    /// Derive the DID for a controller public key.
    fn build_did(&self, public_key: &PublicKey) -> Result<String, IdentityError>;
}

/// `did:ethr:<network>:0x<address>`; mainnet DIDs carry no network segment.
pub struct EthrDidProvider {
    network: String,
}

impl EthrDidProvider {
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
        }
    }

    /// Provider name under which this provider is registered.
    pub fn name(&self) -> String {
        format!("did:ethr:{}", self.network)
    }
}

impl DidProvider for EthrDidProvider {
    fn key_type(&self) -> KeyType {
        KeyType::Secp256k1
    }

    fn build_did(&self, public_key: &PublicKey) -> Result<String, IdentityError> {
        let address = public_key
            .ethereum_address()
            .ok_or_else(|| IdentityError::UnsupportedKeyType(public_key.key_type().to_string()))?;
        if self.network == "mainnet" {
            Ok(format!("did:ethr:{}", format_address(&address)))
        } else {
            Ok(format!("did:ethr:{}:{}", self.network, format_address(&address)))
        }
    }
}

/// `did:key:z<base58btc(0xed01 || pubkey)>` for Ed25519 keys.
pub struct KeyDidProvider;

impl KeyDidProvider {
    pub const NAME: &'static str = "did:key";
}

impl DidProvider for KeyDidProvider {
    fn key_type(&self) -> KeyType {
        KeyType::Ed25519
    }

    fn build_did(&self, public_key: &PublicKey) -> Result<String, IdentityError> {
        public_key
            .to_multibase()
            .map(|mb| format!("did:key:{}", mb))
            .ok_or_else(|| IdentityError::UnsupportedKeyType(public_key.key_type().to_string()))
    }
}
