use std::collections::HashMap;
use std::sync::Arc;

use tessera_core::{Identifier, ServiceEndpoint};
use tessera_crypto::PublicKey;
use tessera_store::{DidStore, StoreError};
use tokio::sync::Mutex;

use crate::error::IdentityError;
use crate::key_manager::KeyManager;
use crate::providers::{DidProvider, EthrDidProvider, KeyDidProvider};

/// Lifecycle of the identifiers this agent controls.
pub struct DidManager {
    store: Arc<dyn DidStore>,
    keys: Arc<KeyManager>,
    providers: HashMap<String, Arc<dyn DidProvider>>,
    default_provider: String,
    /// Held from the alias check until the insert, so a caller that loses
    /// an alias race does not generate a key first.
    create_lock: Mutex<()>,
}

impl DidManager {
    /// Manager with no providers registered.
    pub fn new(
        store: Arc<dyn DidStore>,
        keys: Arc<KeyManager>,
        default_provider: impl Into<String>,
    ) -> Self {
        Self {
            store,
            keys,
            providers: HashMap::new(),
            default_provider: default_provider.into(),
            create_lock: Mutex::new(()),
        }
    }

    /// Manager with `did:ethr:<network>` for each given network plus `did:key`.
    pub fn with_default_providers(
        store: Arc<dyn DidStore>,
        keys: Arc<KeyManager>,
        default_provider: impl Into<String>,
        ethr_networks: &[&str],
    ) -> Self {
        let mut manager = Self::new(store, keys, default_provider);
        for network in ethr_networks {
            let provider = EthrDidProvider::new(*network);
            manager.register_provider(provider.name(), Arc::new(provider));
        }
        manager.register_provider(KeyDidProvider::NAME, Arc::new(KeyDidProvider));
        manager
    }

    pub fn register_provider(&mut self, name: impl Into<String>, provider: Arc<dyn DidProvider>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn default_provider(&self) -> &str {
        &self.default_provider
    }

    pub fn providers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// All managed identifiers in creation order.
    pub async fn find(&self) -> Result<Vec<Identifier>, IdentityError> {
        Ok(self.store.list_identifiers().await?)
    }

    pub async fn find_by_alias(&self, alias: &str) -> Result<Identifier, IdentityError> {
        self.store
            .get_by_alias(alias)
            .await?
            .ok_or_else(|| IdentityError::IdentifierNotFound(alias.to_string()))
    }

    pub async fn find_by_did(&self, did: &str) -> Result<Identifier, IdentityError> {
        self.store
            .get_by_did(did)
            .await?
            .ok_or_else(|| IdentityError::IdentifierNotFound(did.to_string()))
    }

    /// Create a new identifier with a fresh controller key.
    ///
    /// `provider` defaults to the manager's default provider. A bound alias
    /// fails with `AliasAlreadyExists`; the store re-checks under its write
    /// lock so concurrent creates with the same alias yield one identifier.
    pub async fn create(
        &self,
        alias: Option<&str>,
        provider: Option<&str>,
    ) -> Result<Identifier, IdentityError> {
        let provider_name = provider.unwrap_or(&self.default_provider);
        let provider = self
            .providers
            .get(provider_name)
            .ok_or_else(|| IdentityError::UnknownProvider(provider_name.to_string()))?;

        // Managers sharing a store without sharing this lock can still race
        // on an alias; the loser's key then stays in the key table unused.
        let _guard = self.create_lock.lock().await;
        if let Some(alias) = alias {
            if self.store.get_by_alias(alias).await?.is_some() {
                return Err(IdentityError::AliasAlreadyExists(alias.to_string()));
            }
        }

        let key = self.keys.create_key(provider.key_type()).await?;
        let public_key = PublicKey::from_hex(key.key_type, &key.public_key_hex)?;
        let identifier = Identifier {
            did: provider.build_did(&public_key)?,
            alias: alias.map(String::from),
            provider: provider_name.to_string(),
            controller_key_id: key.kid,
            services: Vec::new(),
        };

        self.store
            .insert_identifier(&identifier)
            .await
            .map_err(|e| match e {
                StoreError::AliasAlreadyExists(a) => IdentityError::AliasAlreadyExists(a),
                other => IdentityError::Storage(other),
            })?;

        tracing::info!(did = %identifier.did, alias = ?identifier.alias, provider = provider_name, "identifier created");
        Ok(identifier)
    }

    /// Attach a service endpoint to a managed identifier.
    pub async fn add_service(
        &self,
        did: &str,
        service: ServiceEndpoint,
    ) -> Result<Identifier, IdentityError> {
        let identifier = self
            .store
            .add_service(did, &service)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(d) => IdentityError::IdentifierNotFound(d),
                other => IdentityError::Storage(other),
            })?;
        tracing::info!(did = %did, service = %service.id, "service added");
        Ok(identifier)
    }
}
