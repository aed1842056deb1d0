//! Tessera Identity: key custody, managed DIDs and DID resolution.
//!
//! - [`KeyManager`]: generates keys, seals private halves at rest, signs
//! - [`DidManager`]: creates identifiers through pluggable [`DidProvider`]s
//! - [`MethodResolver`]: dispatches resolution to per-method plugins
//!   ([`EthrResolver`], [`WebResolver`], [`KeyResolver`])

pub mod did_manager;
pub mod document;
pub mod error;
pub mod key_manager;
pub mod methods;
pub mod providers;
pub mod resolver;

pub use did_manager::DidManager;
pub use document::{DidDocument, KeyMaterial, VerificationMethod, VerificationRelationship};
pub use error::IdentityError;
pub use key_manager::{KeyManager, LOCAL_KMS};
pub use methods::{chain_id_for_network, EthrNetwork, EthrResolver, KeyResolver, WebResolver};
pub use providers::{DidProvider, EthrDidProvider, KeyDidProvider};
pub use resolver::{DidResolver, MethodResolver, ResolverConfig};
