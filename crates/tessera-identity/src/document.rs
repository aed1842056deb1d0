use serde::{Deserialize, Serialize};
use tessera_core::{KeyType, ServiceEndpoint};
use tessera_crypto::PublicKey;

use crate::error::IdentityError;

pub const DID_CONTEXT: &str = "https://www.w3.org/ns/did/v1";

/// Multicodec prefix of a compressed secp256k1 key (`0xe701`).
const SECP256K1_MULTICODEC: [u8; 2] = [0xe7, 0x01];

/// A verification method within a DID Document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// Absolute (`did:...#frag`) or relative (`#frag`) id.
    pub id: String,
    /// Method type (e.g. "EcdsaSecp256k1RecoveryMethod2020").
    #[serde(rename = "type")]
    pub method_type: String,
    pub controller: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_hex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_base58: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_multibase: Option<String>,
    /// CAIP-10 account id (`eip155:<chainId>:<address>`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain_account_id: Option<String>,
}

/// What a verification method lets a verifier check a signature against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    PublicKey(PublicKey),
    /// Ethereum address; signatures are checked by key recovery.
    Address([u8; 20]),
}

impl VerificationMethod {
    fn key_type(&self) -> Result<KeyType, IdentityError> {
        if self.method_type.contains("Ed25519") {
            Ok(KeyType::Ed25519)
        } else if self.method_type.contains("Secp256k1") {
            Ok(KeyType::Secp256k1)
        } else {
            Err(IdentityError::UnsupportedKeyType(self.method_type.clone()))
        }
    }

    /// Decode the key material, preferring an explicit public key over an
    /// account id.
    pub fn key_material(&self) -> Result<KeyMaterial, IdentityError> {
        let invalid = |e: tessera_crypto::CryptoError| {
            IdentityError::InvalidDocument(format!("{}: {}", self.id, e))
        };

        if let Some(hex_key) = &self.public_key_hex {
            let pk = PublicKey::from_hex(self.key_type()?, hex_key).map_err(invalid)?;
            return Ok(KeyMaterial::PublicKey(pk));
        }
        if let Some(b58) = &self.public_key_base58 {
            let bytes = bs58::decode(b58).into_vec().map_err(|e| {
                IdentityError::InvalidDocument(format!("{}: invalid base58: {}", self.id, e))
            })?;
            let pk = PublicKey::from_bytes(self.key_type()?, &bytes).map_err(invalid)?;
            return Ok(KeyMaterial::PublicKey(pk));
        }
        if let Some(multibase) = &self.public_key_multibase {
            let pk = match self.key_type()? {
                KeyType::Ed25519 => PublicKey::from_multibase(multibase).map_err(invalid)?,
                KeyType::Secp256k1 => {
                    let encoded = multibase.strip_prefix('z').ok_or_else(|| {
                        IdentityError::InvalidDocument(format!(
                            "{}: only base58btc multibase is supported",
                            self.id
                        ))
                    })?;
                    let bytes = bs58::decode(encoded).into_vec().map_err(|e| {
                        IdentityError::InvalidDocument(format!("{}: invalid base58: {}", self.id, e))
                    })?;
                    let raw = bytes
                        .strip_prefix(&SECP256K1_MULTICODEC[..])
                        .unwrap_or(&bytes);
                    PublicKey::from_bytes(KeyType::Secp256k1, raw).map_err(invalid)?
                }
            };
            return Ok(KeyMaterial::PublicKey(pk));
        }
        if let Some(account) = &self.blockchain_account_id {
            return parse_account_address(account)
                .map(KeyMaterial::Address)
                .ok_or_else(|| {
                    IdentityError::InvalidDocument(format!(
                        "{}: invalid blockchainAccountId '{}'",
                        self.id, account
                    ))
                });
        }
        Err(IdentityError::InvalidDocument(format!(
            "{}: no key material",
            self.id
        )))
    }
}

/// Address part of `eip155:<chain>:0x...` or the legacy `0x...@eip155:<chain>`.
fn parse_account_address(account: &str) -> Option<[u8; 20]> {
    let address = match account.split_once('@') {
        Some((address, _)) => address,
        None => account.rsplit(':').next()?,
    };
    let bytes = hex::decode(address.strip_prefix("0x")?).ok()?;
    bytes.try_into().ok()
}

/// Entry of a verification relationship: a reference to a method of the
/// document, or an embedded method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VerificationRelationship {
    Reference(String),
    Embedded(VerificationMethod),
}

/// Resolved DID Document. Read-only and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    /// A string or an array in the wild; kept as-is.
    #[serde(rename = "@context", default, skip_serializing_if = "serde_json::Value::is_null")]
    pub context: serde_json::Value,
    pub id: String,
    #[serde(default)]
    pub verification_method: Vec<VerificationMethod>,
    #[serde(default)]
    pub authentication: Vec<VerificationRelationship>,
    #[serde(default)]
    pub assertion_method: Vec<VerificationRelationship>,
    #[serde(default, rename = "service")]
    pub services: Vec<ServiceEndpoint>,
}

impl DidDocument {
    /// Document with a single method that is also used for authentication
    /// and assertions.
    pub fn with_controller(id: impl Into<String>, method: VerificationMethod) -> Self {
        let reference = VerificationRelationship::Reference(method.id.clone());
        Self {
            context: serde_json::Value::Array(vec![DID_CONTEXT.into()]),
            id: id.into(),
            verification_method: vec![method],
            authentication: vec![reference.clone()],
            assertion_method: vec![reference],
            services: Vec::new(),
        }
    }

    fn matches(&self, candidate: &str, wanted: &str) -> bool {
        candidate == wanted
            || (candidate.starts_with('#') && format!("{}{}", self.id, candidate) == wanted)
    }

    /// Find a verification method by absolute id, also looking into
    /// methods embedded in relationships.
    pub fn find_verification_method(&self, id: &str) -> Option<&VerificationMethod> {
        let embedded = self
            .authentication
            .iter()
            .chain(self.assertion_method.iter())
            .filter_map(|rel| match rel {
                VerificationRelationship::Embedded(vm) => Some(vm),
                VerificationRelationship::Reference(_) => None,
            });
        self.verification_method
            .iter()
            .chain(embedded)
            .find(|vm| self.matches(&vm.id, id))
    }

    /// Ids of the methods listed under `authentication`.
    pub fn authentication_ids(&self) -> Vec<String> {
        self.authentication
            .iter()
            .map(|rel| match rel {
                VerificationRelationship::Reference(r) => r.clone(),
                VerificationRelationship::Embedded(vm) => vm.id.clone(),
            })
            .collect()
    }
}
