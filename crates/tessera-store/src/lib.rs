//! Tessera Store: persistence for keys, sealed private keys and managed
//! identifiers.
//!
//! The core only talks to the [`KeyStore`], [`PrivateKeyStore`] and
//! [`DidStore`] traits. Two backends implement all three:
//! - [`RocksStore`]: RocksDB with one column family per table, migrated on open
//! - [`MemoryStore`]: process-local, for tests and ephemeral agents

pub mod error;
pub mod memory;
pub mod migrations;
pub mod rocks;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use rocks::RocksStore;
pub use traits::{DidStore, KeyStore, PrivateKeyRecord, PrivateKeyStore};
