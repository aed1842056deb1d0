use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;

use tessera_core::{Identifier, Key, ServiceEndpoint};

use crate::error::{StoreError, StoreResult};
use crate::traits::{DidStore, KeyStore, PrivateKeyRecord, PrivateKeyStore};

/// In-memory store. Identifiers keep insertion order; the write lock
/// makes the alias check and the insert a single step.
#[derive(Debug, Default)]
pub struct MemoryStore {
    keys: DashMap<String, Key>,
    private_keys: DashMap<String, PrivateKeyRecord>,
    identifiers: RwLock<Vec<Identifier>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyStore for MemoryStore {
    async fn put_key(&self, key: &Key) -> StoreResult<()> {
        self.keys.insert(key.kid.clone(), key.clone());
        Ok(())
    }

    async fn get_key(&self, kid: &str) -> StoreResult<Option<Key>> {
        Ok(self.keys.get(kid).map(|entry| entry.clone()))
    }
}

#[async_trait]
impl PrivateKeyStore for MemoryStore {
    async fn put_private_key(&self, record: &PrivateKeyRecord) -> StoreResult<()> {
        self.private_keys.insert(record.kid.clone(), record.clone());
        Ok(())
    }

    async fn get_private_key(&self, kid: &str) -> StoreResult<Option<PrivateKeyRecord>> {
        Ok(self.private_keys.get(kid).map(|entry| entry.clone()))
    }
}

#[async_trait]
impl DidStore for MemoryStore {
    async fn insert_identifier(&self, identifier: &Identifier) -> StoreResult<()> {
        let mut identifiers = self.identifiers.write().await;
        if let Some(alias) = &identifier.alias {
            if identifiers.iter().any(|i| i.alias.as_ref() == Some(alias)) {
                return Err(StoreError::AliasAlreadyExists(alias.clone()));
            }
        }
        if identifiers.iter().any(|i| i.did == identifier.did) {
            return Err(StoreError::DuplicateDid(identifier.did.clone()));
        }
        identifiers.push(identifier.clone());
        Ok(())
    }

    async fn list_identifiers(&self) -> StoreResult<Vec<Identifier>> {
        Ok(self.identifiers.read().await.clone())
    }

    async fn get_by_alias(&self, alias: &str) -> StoreResult<Option<Identifier>> {
        let identifiers = self.identifiers.read().await;
        Ok(identifiers
            .iter()
            .find(|i| i.alias.as_deref() == Some(alias))
            .cloned())
    }

    async fn get_by_did(&self, did: &str) -> StoreResult<Option<Identifier>> {
        let identifiers = self.identifiers.read().await;
        Ok(identifiers.iter().find(|i| i.did == did).cloned())
    }

    async fn add_service(&self, did: &str, service: &ServiceEndpoint) -> StoreResult<Identifier> {
        let mut identifiers = self.identifiers.write().await;
        let identifier = identifiers
            .iter_mut()
            .find(|i| i.did == did)
            .ok_or_else(|| StoreError::NotFound(did.to_string()))?;
        if identifier.services.iter().any(|s| s.id == service.id) {
            return Err(StoreError::DuplicateService(service.id.clone()));
        }
        identifier.services.push(service.clone());
        Ok(identifier.clone())
    }
}
