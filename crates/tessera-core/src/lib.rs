//! Shared types and errors for the Tessera identity agent:
//! DIDs, key handles, managed identifiers and W3C verifiable credentials.

pub mod credential;
pub mod error;
pub mod types;

pub use credential::{
    CredentialPayload, CredentialStatusEntry, Issuer, Proof, VerifiableCredential,
    DEFAULT_CONTEXT, DEFAULT_TYPE,
};
pub use error::CoreError;
pub use types::{Did, Identifier, Key, KeyType, ServiceEndpoint};
