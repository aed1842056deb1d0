//! Proof suites: how a credential body becomes signing input, and which
//! signature algorithm and key type go with it.

pub mod eip712;
pub mod jcs;

use std::collections::HashMap;
use std::sync::Arc;

use tessera_core::KeyType;
use tessera_crypto::SignatureAlgorithm;
use tessera_identity::KeyMaterial;

use crate::error::CredentialError;

pub use eip712::EthereumEip712Signature2021;
pub use jcs::{EcdsaSecp256k1Signature2019, Ed25519Signature2020};

/// A proof format.
pub trait ProofSuite: Send + Sync {
    /// Tag written to `proof.type`.
    fn proof_type(&self) -> &'static str;

    fn algorithm(&self) -> SignatureAlgorithm;

    /// Key type the suite signs with.
    fn key_type(&self) -> KeyType;

    /// Bytes handed to the signer for an unsigned credential body. The
    /// verifier recomputes them from the received body.
    fn signing_input(
        &self,
        body: &serde_json::Value,
        issuer: &str,
    ) -> Result<Vec<u8>, CredentialError>;

    /// Check `signature` over `input` against a resolved verification method.
    fn verify(
        &self,
        material: &KeyMaterial,
        input: &[u8],
        signature: &[u8],
    ) -> Result<(), tessera_crypto::CryptoError> {
        match material {
            KeyMaterial::PublicKey(pk) => tessera_crypto::verify(pk, input, signature, self.algorithm()),
            KeyMaterial::Address(address) => {
                tessera_crypto::verify_address(address, input, signature, self.algorithm())
            }
        }
    }
}

/// Proof suites available to the issuer and verifier, keyed by tag.
#[derive(Default)]
pub struct ProofSuites {
    suites: HashMap<&'static str, Arc<dyn ProofSuite>>,
}

impl ProofSuites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in suite.
    pub fn standard() -> Self {
        let mut suites = Self::new();
        suites.suites.insert(
            EthereumEip712Signature2021::TYPE,
            Arc::new(EthereumEip712Signature2021),
        );
        suites.suites.insert(
            EcdsaSecp256k1Signature2019::TYPE,
            Arc::new(EcdsaSecp256k1Signature2019),
        );
        suites
            .suites
            .insert(Ed25519Signature2020::TYPE, Arc::new(Ed25519Signature2020));
        suites
    }

    /// Register a suite. Tags are unique.
    pub fn register(&mut self, suite: Arc<dyn ProofSuite>) -> Result<(), CredentialError> {
        let tag = suite.proof_type();
        if self.suites.contains_key(tag) {
            return Err(CredentialError::DuplicateProofSuite(tag.to_string()));
        }
        self.suites.insert(tag, suite);
        Ok(())
    }

    pub fn get(&self, proof_type: &str) -> Result<Arc<dyn ProofSuite>, CredentialError> {
        self.suites
            .get(proof_type)
            .cloned()
            .ok_or_else(|| CredentialError::UnsupportedFormat(proof_type.to_string()))
    }

    pub fn proof_types(&self) -> Vec<&'static str> {
        let mut tags: Vec<&'static str> = self.suites.keys().copied().collect();
        tags.sort_unstable();
        tags
    }
}
