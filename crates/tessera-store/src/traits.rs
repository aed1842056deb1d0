use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tessera_core::{Identifier, Key, KeyType, ServiceEndpoint};

use crate::error::StoreResult;

/// Sealed private key as persisted in the `private_keys` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateKeyRecord {
    pub kid: String,
    #[serde(rename = "type")]
    pub key_type: KeyType,
    /// Hex of the SecretBox-sealed secret bytes.
    pub sealed_hex: String,
}

/// Public key handles.
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn put_key(&self, key: &Key) -> StoreResult<()>;

    async fn get_key(&self, kid: &str) -> StoreResult<Option<Key>>;
}

/// Encrypted private key material.
#[async_trait]
pub trait PrivateKeyStore: Send + Sync {
    async fn put_private_key(&self, record: &PrivateKeyRecord) -> StoreResult<()>;

    async fn get_private_key(&self, kid: &str) -> StoreResult<Option<PrivateKeyRecord>>;
}

/// Managed identifiers and their services.
#[async_trait]
pub trait DidStore: Send + Sync {
    /// Insert a new identifier. Fails with `AliasAlreadyExists` or
    /// `DuplicateDid` without writing anything; concurrent inserts are
    /// serialized so at most one writer can claim an alias.
    async fn insert_identifier(&self, identifier: &Identifier) -> StoreResult<()>;

    /// All identifiers in insertion order.
    async fn list_identifiers(&self) -> StoreResult<Vec<Identifier>>;

    async fn get_by_alias(&self, alias: &str) -> StoreResult<Option<Identifier>>;

    async fn get_by_did(&self, did: &str) -> StoreResult<Option<Identifier>>;

    /// Append a service to an existing identifier and return the updated
    /// identifier.
    async fn add_service(&self, did: &str, service: &ServiceEndpoint) -> StoreResult<Identifier>;
}
