//! RocksDB backend.
//!
//! Layout, one column family per table:
//! - `keys`: kid → JSON [`Key`]
//! - `private_keys`: kid → JSON [`PrivateKeyRecord`]
//! - `identifiers`: big-endian u64 sequence → JSON [`Identifier`] (services stripped)
//! - `services`: `did || 0x00 || u32 BE index` → JSON [`ServiceEndpoint`]
//! - `alias_index`, `did_index`: alias / did → sequence
//! - `meta`: schema version and the next identifier sequence

use std::path::Path;

use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};
use tokio::sync::Mutex;

use tessera_core::{Identifier, Key, ServiceEndpoint};

use crate::error::{StoreError, StoreResult};
use crate::migrations;
use crate::traits::{DidStore, KeyStore, PrivateKeyRecord, PrivateKeyStore};

pub(crate) const CF_KEYS: &str = "keys";
pub(crate) const CF_PRIVATE_KEYS: &str = "private_keys";
pub(crate) const CF_IDENTIFIERS: &str = "identifiers";
pub(crate) const CF_SERVICES: &str = "services";
pub(crate) const CF_ALIAS_INDEX: &str = "alias_index";
pub(crate) const CF_DID_INDEX: &str = "did_index";
pub(crate) const CF_META: &str = "meta";

pub(crate) const META_SCHEMA_VERSION: &[u8] = b"schema_version";
pub(crate) const META_NEXT_SEQ: &[u8] = b"next_identifier_seq";

const COLUMN_FAMILIES: [&str; 7] = [
    CF_KEYS,
    CF_PRIVATE_KEYS,
    CF_IDENTIFIERS,
    CF_SERVICES,
    CF_ALIAS_INDEX,
    CF_DID_INDEX,
    CF_META,
];

/// Look up a column family handle.
pub(crate) fn cf<'a>(db: &'a DB, name: &str) -> StoreResult<&'a ColumnFamily> {
    db.cf_handle(name)
        .ok_or_else(|| StoreError::Backend(format!("column family '{}' not found", name)))
}

pub(crate) fn decode_u64(bytes: &[u8]) -> StoreResult<u64> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::Corrupt(format!("expected 8-byte integer, got {} bytes", bytes.len())))?;
    Ok(u64::from_be_bytes(arr))
}

fn service_prefix(did: &str) -> Vec<u8> {
    let mut prefix = did.as_bytes().to_vec();
    prefix.push(0);
    prefix
}

fn service_key(did: &str, index: u32) -> Vec<u8> {
    let mut key = service_prefix(did);
    key.extend_from_slice(&index.to_be_bytes());
    key
}

/// RocksDB-backed store for keys and identifiers.
pub struct RocksStore {
    db: DB,
    /// Serializes identifier and service writes.
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create the database at `path` and bring its schema up to date.
    pub fn open(path: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(path)
            .map_err(|e| StoreError::Backend(format!("cannot create {}: {}", path.display(), e)))?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, cf_descriptors)?;
        let version = migrations::run(&db)?;
        tracing::info!(path = %path.display(), schema_version = version, "store opened");

        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    /// Current schema version recorded in `meta`.
    pub fn schema_version(&self) -> StoreResult<u32> {
        migrations::current_version(&self.db)
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> StoreResult<Option<T>> {
        match self.db.get_cf(cf(&self.db, cf_name)?, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn services_of(&self, did: &str) -> StoreResult<Vec<ServiceEndpoint>> {
        let prefix = service_prefix(did);
        let mut services = Vec::new();
        let iter = self.db.iterator_cf(
            cf(&self.db, CF_SERVICES)?,
            IteratorMode::From(&prefix, Direction::Forward),
        );
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            services.push(serde_json::from_slice(&value)?);
        }
        Ok(services)
    }

    fn identifier_at(&self, seq_bytes: &[u8]) -> StoreResult<Option<Identifier>> {
        let Some(mut identifier) = self.get_json::<Identifier>(CF_IDENTIFIERS, seq_bytes)? else {
            return Ok(None);
        };
        identifier.services = self.services_of(&identifier.did)?;
        Ok(Some(identifier))
    }

    fn lookup(&self, index_cf: &str, key: &str) -> StoreResult<Option<Identifier>> {
        match self.db.get_cf(cf(&self.db, index_cf)?, key.as_bytes())? {
            Some(seq) => {
                let identifier = self.identifier_at(&seq)?;
                if identifier.is_none() {
                    return Err(StoreError::Corrupt(format!(
                        "{} entry '{}' points at a missing identifier",
                        index_cf, key
                    )));
                }
                Ok(identifier)
            }
            None => Ok(None),
        }
    }

    fn next_seq(&self) -> StoreResult<u64> {
        match self.db.get_cf(cf(&self.db, CF_META)?, META_NEXT_SEQ)? {
            Some(bytes) => decode_u64(&bytes),
            None => Err(StoreError::Corrupt("identifier sequence missing".into())),
        }
    }
}

#[async_trait]
impl KeyStore for RocksStore {
    async fn put_key(&self, key: &Key) -> StoreResult<()> {
        let bytes = serde_json::to_vec(key)?;
        self.db.put_cf(cf(&self.db, CF_KEYS)?, key.kid.as_bytes(), bytes)?;
        Ok(())
    }

    async fn get_key(&self, kid: &str) -> StoreResult<Option<Key>> {
        self.get_json(CF_KEYS, kid.as_bytes())
    }
}

#[async_trait]
impl PrivateKeyStore for RocksStore {
    async fn put_private_key(&self, record: &PrivateKeyRecord) -> StoreResult<()> {
        let bytes = serde_json::to_vec(record)?;
        self.db
            .put_cf(cf(&self.db, CF_PRIVATE_KEYS)?, record.kid.as_bytes(), bytes)?;
        Ok(())
    }

    async fn get_private_key(&self, kid: &str) -> StoreResult<Option<PrivateKeyRecord>> {
        self.get_json(CF_PRIVATE_KEYS, kid.as_bytes())
    }
}

#[async_trait]
impl DidStore for RocksStore {
    async fn insert_identifier(&self, identifier: &Identifier) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;

        let alias_cf = cf(&self.db, CF_ALIAS_INDEX)?;
        let did_cf = cf(&self.db, CF_DID_INDEX)?;

        if let Some(alias) = &identifier.alias {
            if self.db.get_cf(alias_cf, alias.as_bytes())?.is_some() {
                return Err(StoreError::AliasAlreadyExists(alias.clone()));
            }
        }
        if self.db.get_cf(did_cf, identifier.did.as_bytes())?.is_some() {
            return Err(StoreError::DuplicateDid(identifier.did.clone()));
        }

        let seq = self.next_seq()?;
        let seq_bytes = seq.to_be_bytes();
        let mut record = identifier.clone();
        let services = std::mem::take(&mut record.services);

        let mut batch = WriteBatch::default();
        batch.put_cf(cf(&self.db, CF_IDENTIFIERS)?, seq_bytes, serde_json::to_vec(&record)?);
        batch.put_cf(did_cf, identifier.did.as_bytes(), seq_bytes);
        if let Some(alias) = &identifier.alias {
            batch.put_cf(alias_cf, alias.as_bytes(), seq_bytes);
        }
        let services_cf = cf(&self.db, CF_SERVICES)?;
        for (index, service) in services.iter().enumerate() {
            batch.put_cf(
                services_cf,
                service_key(&identifier.did, index as u32),
                serde_json::to_vec(service)?,
            );
        }
        batch.put_cf(cf(&self.db, CF_META)?, META_NEXT_SEQ, (seq + 1).to_be_bytes());
        self.db.write(batch)?;

        tracing::debug!(did = %identifier.did, seq, "identifier stored");
        Ok(())
    }

    async fn list_identifiers(&self) -> StoreResult<Vec<Identifier>> {
        let mut identifiers = Vec::new();
        for item in self
            .db
            .iterator_cf(cf(&self.db, CF_IDENTIFIERS)?, IteratorMode::Start)
        {
            let (_, value) = item?;
            let mut identifier: Identifier = serde_json::from_slice(&value)?;
            identifier.services = self.services_of(&identifier.did)?;
            identifiers.push(identifier);
        }
        Ok(identifiers)
    }

    async fn get_by_alias(&self, alias: &str) -> StoreResult<Option<Identifier>> {
        self.lookup(CF_ALIAS_INDEX, alias)
    }

    async fn get_by_did(&self, did: &str) -> StoreResult<Option<Identifier>> {
        self.lookup(CF_DID_INDEX, did)
    }

    async fn add_service(&self, did: &str, service: &ServiceEndpoint) -> StoreResult<Identifier> {
        let _guard = self.write_lock.lock().await;

        let mut identifier = self
            .lookup(CF_DID_INDEX, did)?
            .ok_or_else(|| StoreError::NotFound(did.to_string()))?;
        if identifier.services.iter().any(|s| s.id == service.id) {
            return Err(StoreError::DuplicateService(service.id.clone()));
        }

        let index = identifier.services.len() as u32;
        self.db.put_cf(
            cf(&self.db, CF_SERVICES)?,
            service_key(did, index),
            serde_json::to_vec(service)?,
        )?;
        identifier.services.push(service.clone());
        Ok(identifier)
    }
}
