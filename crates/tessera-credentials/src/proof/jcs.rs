use serde_json_canonicalizer::to_string as jcs_canonicalize;
use tessera_core::KeyType;
use tessera_crypto::SignatureAlgorithm;

use crate::error::CredentialError;
use crate::proof::ProofSuite;

/// RFC 8785 canonical form of a credential body.
pub fn canonicalize(body: &serde_json::Value) -> Result<Vec<u8>, CredentialError> {
    jcs_canonicalize(body)
        .map(String::into_bytes)
        .map_err(|e| CredentialError::Encoding(format!("JCS canonicalization failed: {}", e)))
}

/// secp256k1 ECDSA over SHA-256 of the JCS body.
#[derive(Debug, Default, Clone, Copy)]
pub struct EcdsaSecp256k1Signature2019;

impl EcdsaSecp256k1Signature2019 {
    pub const TYPE: &'static str = "EcdsaSecp256k1Signature2019";
}

impl ProofSuite for EcdsaSecp256k1Signature2019 {
    fn proof_type(&self) -> &'static str {
        Self::TYPE
    }

    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Es256K
    }

    fn key_type(&self) -> KeyType {
        KeyType::Secp256k1
    }

    fn signing_input(
        &self,
        body: &serde_json::Value,
        _issuer: &str,
    ) -> Result<Vec<u8>, CredentialError> {
        canonicalize(body)
    }
}

/// Ed25519 over the JCS body.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Signature2020;

impl Ed25519Signature2020 {
    pub const TYPE: &'static str = "Ed25519Signature2020";
}

impl ProofSuite for Ed25519Signature2020 {
    fn proof_type(&self) -> &'static str {
        Self::TYPE
    }

    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::EdDsa
    }

    fn key_type(&self) -> KeyType {
        KeyType::Ed25519
    }

    fn signing_input(
        &self,
        body: &serde_json::Value,
        _issuer: &str,
    ) -> Result<Vec<u8>, CredentialError> {
        canonicalize(body)
    }
}
