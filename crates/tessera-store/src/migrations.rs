//! Schema migrations applied when the RocksDB store opens.
//!
//! Each migration runs at most once; the highest applied version is kept
//! under `schema_version` in the `meta` column family.

use rocksdb::{IteratorMode, WriteBatch, DB};

use crate::error::{StoreError, StoreResult};
use crate::rocks::{
    cf, decode_u64, CF_ALIAS_INDEX, CF_DID_INDEX, CF_IDENTIFIERS, CF_META, META_NEXT_SEQ,
    META_SCHEMA_VERSION,
};
use tessera_core::Identifier;

/// A single forward-only schema step.
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub apply: fn(&DB) -> StoreResult<()>,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_identifier_sequence",
        apply: create_identifier_sequence,
    },
    Migration {
        version: 2,
        name: "backfill_did_and_alias_index",
        apply: backfill_did_and_alias_index,
    },
];

pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Schema version recorded in the database, 0 for a fresh one.
pub fn current_version(db: &DB) -> StoreResult<u32> {
    match db.get_cf(cf(db, CF_META)?, META_SCHEMA_VERSION)? {
        Some(bytes) => {
            let arr: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
                StoreError::Corrupt(format!("schema version has {} bytes", bytes.len()))
            })?;
            Ok(u32::from_be_bytes(arr))
        }
        None => Ok(0),
    }
}

/// Apply every pending migration in order. Returns the resulting version.
pub fn run(db: &DB) -> StoreResult<u32> {
    let mut version = current_version(db)?;
    if version > latest_version() {
        return Err(StoreError::Corrupt(format!(
            "database schema version {} is newer than supported {}",
            version,
            latest_version()
        )));
    }

    for migration in MIGRATIONS.iter().filter(move |m| m.version > version) {
        tracing::info!(
            version = migration.version,
            name = migration.name,
            "applying store migration"
        );
        (migration.apply)(db).map_err(|e| StoreError::Migration {
            version: migration.version,
            name: migration.name,
            reason: e.to_string(),
        })?;
        db.put_cf(
            cf(db, CF_META)?,
            META_SCHEMA_VERSION,
            migration.version.to_be_bytes(),
        )?;
        version = migration.version;
    }
    Ok(version)
}

/// Seed the identifier sequence past any existing identifier records.
fn create_identifier_sequence(db: &DB) -> StoreResult<()> {
    let meta = cf(db, CF_META)?;
    if db.get_cf(meta, META_NEXT_SEQ)?.is_some() {
        return Ok(());
    }
    let mut next = 0u64;
    if let Some(item) = db
        .iterator_cf(cf(db, CF_IDENTIFIERS)?, IteratorMode::End)
        .next()
    {
        let (key, _) = item?;
        next = decode_u64(&key)? + 1;
    }
    db.put_cf(meta, META_NEXT_SEQ, next.to_be_bytes())?;
    Ok(())
}

/// Rebuild the DID and alias indexes from the identifier records.
fn backfill_did_and_alias_index(db: &DB) -> StoreResult<()> {
    let did_cf = cf(db, CF_DID_INDEX)?;
    let alias_cf = cf(db, CF_ALIAS_INDEX)?;
    let mut batch = WriteBatch::default();
    let mut count = 0usize;

    for item in db.iterator_cf(cf(db, CF_IDENTIFIERS)?, IteratorMode::Start) {
        let (key, value) = item?;
        let identifier: Identifier = serde_json::from_slice(&value)?;
        batch.put_cf(did_cf, identifier.did.as_bytes(), &key);
        if let Some(alias) = &identifier.alias {
            batch.put_cf(alias_cf, alias.as_bytes(), &key);
        }
        count += 1;
    }
    db.write(batch)?;
    tracing::debug!(count, "indexed identifiers");
    Ok(())
}
