use async_trait::async_trait;
use tessera_core::Did;
use tessera_crypto::PublicKey;

use crate::document::{DidDocument, VerificationMethod};
use crate::error::IdentityError;
use crate::resolver::DidResolver;

/// Offline resolver for Ed25519 `did:key` identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyResolver;

#[async_trait]
impl DidResolver for KeyResolver {
    async fn resolve(&self, did: &str) -> Result<DidDocument, IdentityError> {
        let parsed = Did::parse(did).map_err(|e| IdentityError::InvalidDid(e.to_string()))?;
        if parsed.method() != "key" {
            return Err(IdentityError::UnsupportedMethod(parsed.method().to_string()));
        }
        let multibase = parsed.identifier();
        let public_key = PublicKey::from_multibase(multibase)
            .map_err(|e| IdentityError::resolution(did, e.to_string(), false))?;

        let method = VerificationMethod {
            id: format!("{}#{}", did, multibase),
            method_type: "Ed25519VerificationKey2020".into(),
            controller: did.to_string(),
            public_key_hex: None,
            public_key_base58: None,
            public_key_multibase: public_key.to_multibase(),
            blockchain_account_id: None,
        };
        Ok(DidDocument::with_controller(did, method))
    }
}
