//! `EthereumEip712Signature2021`: the credential body signed as EIP-712
//! typed data.
//!
//! Struct types are derived from the JSON shape of the body: every nested
//! object becomes a struct named after its key with the first letter
//! capitalized (`credentialSubject` → `CredentialSubject`), strings map to
//! `string`, booleans to `bool` and non-negative integers to `uint256`.
//! Fields are ordered by name so issuer and verifier derive the same types.

use std::collections::BTreeMap;

use ethers_core::types::transaction::eip712::{Eip712, TypedData};
use serde_json::{json, Map, Value};
use tessera_core::{Did, KeyType, DEFAULT_TYPE};
use tessera_crypto::SignatureAlgorithm;
use tessera_identity::chain_id_for_network;

use crate::error::CredentialError;
use crate::proof::ProofSuite;

pub const DOMAIN_NAME: &str = "VerifiableCredential";
pub const DOMAIN_VERSION: &str = "1";

type Types = BTreeMap<String, Vec<Value>>;

#[derive(Debug, Default, Clone, Copy)]
pub struct EthereumEip712Signature2021;

impl EthereumEip712Signature2021 {
    pub const TYPE: &'static str = "EthereumEip712Signature2021";
}

impl ProofSuite for EthereumEip712Signature2021 {
    fn proof_type(&self) -> &'static str {
        Self::TYPE
    }

    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Es256KRecoverable
    }

    fn key_type(&self) -> KeyType {
        KeyType::Secp256k1
    }

    fn signing_input(&self, body: &Value, issuer: &str) -> Result<Vec<u8>, CredentialError> {
        let typed = typed_data(body, chain_id_for_issuer(issuer))?;
        let digest = typed
            .encode_eip712()
            .map_err(|e| CredentialError::Encoding(format!("EIP-712 encoding failed: {}", e)))?;
        Ok(digest.to_vec())
    }
}

/// Chain id of the network an issuer DID lives on; 1 when not `did:ethr`
/// or the network is unknown.
pub fn chain_id_for_issuer(issuer: &str) -> u64 {
    Did::parse(issuer)
        .ok()
        .filter(|did| did.method() == "ethr")
        .and_then(|did| {
            did.identifier()
                .split_once(':')
                .and_then(|(network, _)| chain_id_for_network(network))
        })
        .unwrap_or(1)
}

/// Full EIP-712 typed data for a credential body.
pub fn typed_data(body: &Value, chain_id: u64) -> Result<TypedData, CredentialError> {
    let object = body
        .as_object()
        .ok_or_else(|| CredentialError::Encoding("credential body is not an object".into()))?;

    let mut types = Types::new();
    types.insert(
        "EIP712Domain".into(),
        vec![
            json!({"name": "name", "type": "string"}),
            json!({"name": "version", "type": "string"}),
            json!({"name": "chainId", "type": "uint256"}),
        ],
    );
    derive_struct(DEFAULT_TYPE, object, &mut types)?;

    let typed = json!({
        "types": types,
        "primaryType": DEFAULT_TYPE,
        "domain": {
            "name": DOMAIN_NAME,
            "version": DOMAIN_VERSION,
            "chainId": chain_id,
        },
        "message": body,
    });
    serde_json::from_value(typed)
        .map_err(|e| CredentialError::Encoding(format!("invalid typed data: {}", e)))
}

fn capitalize(key: &str) -> String {
    let mut chars = key.trim_start_matches('@').chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn derive_struct(name: &str, object: &Map<String, Value>, types: &mut Types) -> Result<(), CredentialError> {
    let mut keys: Vec<&String> = object.keys().collect();
    keys.sort();

    let mut fields = Vec::with_capacity(keys.len());
    for key in keys {
        let field_type = derive_field(key, &object[key.as_str()], types)?;
        fields.push(json!({"name": key, "type": field_type}));
    }

    match types.get(name) {
        Some(existing) if *existing != fields => Err(CredentialError::Encoding(format!(
            "objects named '{}' have different shapes",
            name
        ))),
        Some(_) => Ok(()),
        None => {
            types.insert(name.to_string(), fields);
            Ok(())
        }
    }
}

fn derive_field(key: &str, value: &Value, types: &mut Types) -> Result<String, CredentialError> {
    match value {
        Value::String(_) => Ok("string".into()),
        Value::Bool(_) => Ok("bool".into()),
        Value::Number(n) if n.is_u64() => Ok("uint256".into()),
        Value::Object(object) => {
            let name = capitalize(key);
            if name.is_empty() {
                return Err(CredentialError::Encoding("empty object key".into()));
            }
            derive_struct(&name, object, types)?;
            Ok(name)
        }
        Value::Array(items) => {
            let mut element: Option<String> = None;
            for item in items {
                if item.is_array() {
                    return Err(CredentialError::Encoding(format!(
                        "nested arrays are not supported ('{}')",
                        key
                    )));
                }
                let ty = derive_field(key, item, types)?;
                match &element {
                    Some(existing) if *existing != ty => {
                        return Err(CredentialError::Encoding(format!(
                            "array '{}' mixes {} and {}",
                            key, existing, ty
                        )))
                    }
                    _ => element = Some(ty),
                }
            }
            Ok(format!("{}[]", element.unwrap_or_else(|| "string".into())))
        }
        Value::Number(n) => Err(CredentialError::Encoding(format!(
            "'{}' = {} is not a non-negative integer",
            key, n
        ))),
        Value::Null => Err(CredentialError::Encoding(format!("'{}' is null", key))),
    }
}
