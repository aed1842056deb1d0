//! Tessera Credentials: proof suites, issuer, status checker, verifier
//! and the [`Agent`] facade tying them to the identity layer.

pub mod agent;
pub mod error;
pub mod issuer;
pub mod proof;
pub mod status;
pub mod verifier;

pub use agent::{Agent, DEFAULT_ALIAS};
pub use error::CredentialError;
pub use issuer::{verification_method_id, CredentialIssuer};
pub use proof::{
    EcdsaSecp256k1Signature2019, Ed25519Signature2020, EthereumEip712Signature2021, ProofSuite,
    ProofSuites,
};
pub use status::{StatusChecker, StatusList2017, StatusMethod, StatusResult};
pub use verifier::{CredentialVerifier, Revocation, VerificationResult};
