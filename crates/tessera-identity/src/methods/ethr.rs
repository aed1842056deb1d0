use std::collections::HashMap;

use async_trait::async_trait;
use ethers_core::types::Address;
use ethers_core::utils::to_checksum;
use serde_json::json;
use tessera_core::{Did, KeyType};
use tessera_crypto::{keccak256, PublicKey};

use crate::document::{DidDocument, VerificationMethod};
use crate::error::IdentityError;
use crate::methods::http_error;
use crate::resolver::DidResolver;

/// ERC-1056 registry deployments.
const MAINNET_REGISTRY: &str = "0xdca7ef03e98e0dc2b855be647c39abe984fcf21b";
const GOERLI_REGISTRY: &str = "0xdca7ef03e98e0dc2b855be647c39abe984fcf21b";
const SEPOLIA_REGISTRY: &str = "0x03d5003bf0e79C5F5223588F347ebA39AfbC3818";

/// Chain id of a named Ethereum network.
pub fn chain_id_for_network(network: &str) -> Option<u64> {
    match network {
        "mainnet" => Some(1),
        "goerli" => Some(5),
        "sepolia" => Some(11_155_111),
        _ => None,
    }
}

/// One Ethereum network the resolver can query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthrNetwork {
    pub name: String,
    pub chain_id: u64,
    /// Registry contract address.
    pub registry: String,
    pub rpc_url: String,
}

impl EthrNetwork {
    /// Known network reached through Infura with the given project id.
    pub fn infura(name: &str, project_id: &str) -> Option<Self> {
        Self::with_rpc_url(name, format!("https://{}.infura.io/v3/{}", name, project_id))
    }

    /// Known network reached through an arbitrary JSON-RPC endpoint.
    pub fn with_rpc_url(name: &str, rpc_url: impl Into<String>) -> Option<Self> {
        let registry = match name {
            "mainnet" => MAINNET_REGISTRY,
            "goerli" => GOERLI_REGISTRY,
            "sepolia" => SEPOLIA_REGISTRY,
            _ => return None,
        };
        Some(Self {
            name: name.to_string(),
            chain_id: chain_id_for_network(name)?,
            registry: registry.to_string(),
            rpc_url: rpc_url.into(),
        })
    }
}

/// `did:ethr` resolver backed by the ERC-1056 `identityOwner` lookup.
///
/// Attribute and delegate change events are not replayed, so documents
/// carry the owner only.
pub struct EthrResolver {
    client: reqwest::Client,
    networks: HashMap<String, EthrNetwork>,
}

impl EthrResolver {
    pub fn new(client: reqwest::Client, networks: impl IntoIterator<Item = EthrNetwork>) -> Self {
        Self {
            client,
            networks: networks
                .into_iter()
                .map(|n| (n.name.clone(), n))
                .collect(),
        }
    }

    async fn identity_owner(
        &self,
        did: &str,
        network: &EthrNetwork,
        identity: &[u8; 20],
    ) -> Result<[u8; 20], IdentityError> {
        let selector = &keccak256(b"identityOwner(address)")[..4];
        let data = format!(
            "0x{}{:0>64}",
            hex::encode(selector),
            hex::encode(identity)
        );
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [{ "to": network.registry, "data": data }, "latest"],
        });

        let response = self
            .client
            .post(&network.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| http_error(did, e))?;
        let status = response.status();
        if !status.is_success() {
            let transient = status.is_server_error() || status.as_u16() == 429;
            return Err(IdentityError::resolution(
                did,
                format!("RPC endpoint returned {}", status),
                transient,
            ));
        }
        let reply: serde_json::Value = response.json().await.map_err(|e| http_error(did, e))?;

        if let Some(error) = reply.get("error") {
            return Err(IdentityError::resolution(
                did,
                format!("RPC error: {}", error),
                false,
            ));
        }
        let result = reply
            .get("result")
            .and_then(|r| r.as_str())
            .ok_or_else(|| IdentityError::resolution(did, "RPC reply has no result", false))?;
        let word = result.trim_start_matches("0x");
        let owner_hex = word
            .len()
            .checked_sub(40)
            .and_then(|start| word.get(start..))
            .ok_or_else(|| {
                IdentityError::resolution(did, "unexpected identityOwner result", false)
            })?;
        let bytes = hex::decode(owner_hex)
            .map_err(|e| IdentityError::resolution(did, format!("bad owner: {}", e), false))?;
        let mut owner = [0u8; 20];
        owner.copy_from_slice(&bytes);
        Ok(owner)
    }
}

/// Split the method-specific id into network and identity, which is an
/// address or a hex-encoded secp256k1 public key.
fn parse_identity(did: &str, id: &str) -> Result<(String, [u8; 20], Option<PublicKey>), IdentityError> {
    let (network, identity) = match id.split_once(':') {
        Some((network, identity)) => (network.to_string(), identity),
        None => ("mainnet".to_string(), id),
    };
    let malformed = || IdentityError::resolution(did, "malformed did:ethr identifier", false);
    let hex_part = identity.strip_prefix("0x").ok_or_else(malformed)?;

    match hex_part.len() {
        40 => {
            let bytes = hex::decode(hex_part).map_err(|_| malformed())?;
            let mut address = [0u8; 20];
            address.copy_from_slice(&bytes);
            Ok((network, address, None))
        }
        66 => {
            let public_key =
                PublicKey::from_hex(KeyType::Secp256k1, hex_part).map_err(|_| malformed())?;
            let address = public_key.ethereum_address().ok_or_else(malformed)?;
            Ok((network, address, Some(public_key)))
        }
        _ => Err(malformed()),
    }
}

#[async_trait]
impl DidResolver for EthrResolver {
    async fn resolve(&self, did: &str) -> Result<DidDocument, IdentityError> {
        let parsed = Did::parse(did).map_err(|e| IdentityError::InvalidDid(e.to_string()))?;
        if parsed.method() != "ethr" {
            return Err(IdentityError::UnsupportedMethod(parsed.method().to_string()));
        }
        let (network_name, identity, public_key) = parse_identity(did, parsed.identifier())?;
        let network = self.networks.get(&network_name).ok_or_else(|| {
            IdentityError::resolution(did, format!("network '{}' not configured", network_name), false)
        })?;

        let owner = self.identity_owner(did, network, &identity).await?;
        tracing::debug!(did = %did, network = %network.name, owner = %hex::encode(owner), "resolved identity owner");

        let controller = VerificationMethod {
            id: format!("{}#controller", did),
            method_type: "EcdsaSecp256k1RecoveryMethod2020".into(),
            controller: did.to_string(),
            public_key_hex: None,
            public_key_base58: None,
            public_key_multibase: None,
            blockchain_account_id: Some(format!(
                "eip155:{}:{}",
                network.chain_id,
                to_checksum(&Address::from(owner), None)
            )),
        };
        let mut doc = DidDocument::with_controller(did, controller);

        // The key embedded in the DID still controls it only while the owner is unchanged.
        if let Some(pk) = public_key.filter(|_| owner == identity) {
            let key_id = format!("{}#controllerKey", did);
            doc.verification_method.push(VerificationMethod {
                id: key_id.clone(),
                method_type: "EcdsaSecp256k1VerificationKey2019".into(),
                controller: did.to_string(),
                public_key_hex: Some(pk.to_hex()),
                public_key_base58: None,
                public_key_multibase: None,
                blockchain_account_id: None,
            });
            doc.authentication
                .push(crate::document::VerificationRelationship::Reference(key_id.clone()));
            doc.assertion_method
                .push(crate::document::VerificationRelationship::Reference(key_id));
        }
        Ok(doc)
    }
}
