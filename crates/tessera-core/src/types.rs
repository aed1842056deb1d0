use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Decentralized Identifier.
/// Format: `did:<method>:<method-specific-id>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Did(String);

impl Did {
    /// Parse a DID URI, validating the `did:<method>:<id>` shape.
    pub fn parse(uri: &str) -> Result<Self, CoreError> {
        let mut parts = uri.splitn(3, ':');
        let scheme = parts.next().unwrap_or_default();
        let method = parts.next().unwrap_or_default();
        let id = parts.next().unwrap_or_default();

        if scheme != "did" {
            return Err(CoreError::InvalidDid(format!(
                "DID must start with 'did:', got: {}",
                uri
            )));
        }
        if method.is_empty()
            || !method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(CoreError::InvalidDid(format!(
                "DID method must be non-empty lowercase alphanumeric, got: {}",
                uri
            )));
        }
        if id.is_empty() {
            return Err(CoreError::InvalidDid(format!(
                "DID must have format 'did:<method>:<identifier>', got: {}",
                uri
            )));
        }
        Ok(Self(uri.to_string()))
    }

    /// Create a DID from method and identifier components.
    pub fn from_parts(method: &str, identifier: &str) -> Self {
        Self(format!("did:{}:{}", method, identifier))
    }

    /// Get the full DID URI.
    pub fn uri(&self) -> &str {
        &self.0
    }

    /// The DID method name (`ethr`, `web`, `key`, ...).
    pub fn method(&self) -> &str {
        self.0.split(':').nth(1).unwrap_or_default()
    }

    /// Everything after `did:<method>:`.
    pub fn identifier(&self) -> &str {
        self.0.splitn(3, ':').nth(2).unwrap_or_default()
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Did {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Key algorithms the agent can generate and sign with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    Secp256k1,
    Ed25519,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secp256k1 => write!(f, "Secp256k1"),
            Self::Ed25519 => write!(f, "Ed25519"),
        }
    }
}

impl FromStr for KeyType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "secp256k1" => Ok(Self::Secp256k1),
            "ed25519" => Ok(Self::Ed25519),
            other => Err(CoreError::UnsupportedKeyType(other.to_string())),
        }
    }
}

/// Public handle of a managed key. Private material is held by the
/// key manager only, encrypted at rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Key {
    /// Key identifier (hex-encoded public key).
    pub kid: String,
    /// Label of the KMS holding the private part.
    pub kms: String,
    #[serde(rename = "type")]
    pub key_type: KeyType,
    /// Hex-encoded public key (compressed SEC1 for secp256k1).
    pub public_key_hex: String,
}

/// A service endpoint advertised by an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEndpoint {
    pub id: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub service_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An identifier managed by this agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    pub did: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Provider that created the DID (e.g. `did:ethr:sepolia`).
    pub provider: String,
    /// Key id of the controller key.
    pub controller_key_id: String,
    #[serde(default)]
    pub services: Vec<ServiceEndpoint>,
}

impl Identifier {
    /// Parsed form of the DID.
    pub fn parsed_did(&self) -> Result<Did, CoreError> {
        Did::parse(&self.did)
    }
}
