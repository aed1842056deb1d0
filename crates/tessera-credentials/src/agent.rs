use std::sync::Arc;

use tessera_core::{CredentialPayload, Identifier, ServiceEndpoint, VerifiableCredential};
use tessera_identity::{DidDocument, DidManager, DidResolver, IdentityError, KeyManager};
use tokio::sync::Mutex;

use crate::error::CredentialError;
use crate::issuer::CredentialIssuer;
use crate::proof::ProofSuites;
use crate::status::{StatusChecker, StatusResult};
use crate::verifier::{CredentialVerifier, VerificationResult};

/// Alias of the identifier the agent issues with by default.
pub const DEFAULT_ALIAS: &str = "default";

/// Facade over identifier management, issuance, status and verification.
pub struct Agent {
    dids: Arc<DidManager>,
    resolver: Arc<dyn DidResolver>,
    issuer: CredentialIssuer,
    status: Arc<StatusChecker>,
    verifier: CredentialVerifier,
    default_lock: Mutex<()>,
}

impl Agent {
    pub fn new(
        keys: Arc<KeyManager>,
        dids: Arc<DidManager>,
        resolver: Arc<dyn DidResolver>,
        suites: Arc<ProofSuites>,
        status: Arc<StatusChecker>,
    ) -> Self {
        Self {
            issuer: CredentialIssuer::new(dids.clone(), keys, suites.clone()),
            verifier: CredentialVerifier::new(resolver.clone(), suites, status.clone()),
            dids,
            resolver,
            status,
            default_lock: Mutex::new(()),
        }
    }

    /// Return the `default` identifier. It is created with the default
    /// provider only while the store holds no identifier at all; a store
    /// with identifiers but no `default` alias yields `IdentifierNotFound`.
    pub async fn ensure_default_identifier(&self) -> Result<Identifier, CredentialError> {
        let _guard = self.default_lock.lock().await;
        if !self.dids.find().await?.is_empty() {
            return Ok(self.dids.find_by_alias(DEFAULT_ALIAS).await?);
        }
        match self.dids.create(Some(DEFAULT_ALIAS), None).await {
            Ok(identifier) => Ok(identifier),
            // Created by another agent on the same store in the meantime.
            Err(IdentityError::AliasAlreadyExists(_)) => {
                Ok(self.dids.find_by_alias(DEFAULT_ALIAS).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn create_identifier(
        &self,
        alias: Option<&str>,
        provider: Option<&str>,
    ) -> Result<Identifier, CredentialError> {
        Ok(self.dids.create(alias, provider).await?)
    }

    pub async fn identifiers(&self) -> Result<Vec<Identifier>, CredentialError> {
        Ok(self.dids.find().await?)
    }

    pub async fn identifier(&self, alias: &str) -> Result<Identifier, CredentialError> {
        Ok(self.dids.find_by_alias(alias).await?)
    }

    pub async fn add_service(
        &self,
        did: &str,
        service: ServiceEndpoint,
    ) -> Result<Identifier, CredentialError> {
        Ok(self.dids.add_service(did, service).await?)
    }

    pub async fn issue_credential(
        &self,
        payload: CredentialPayload,
        issuer_alias: &str,
        proof_format: &str,
    ) -> Result<VerifiableCredential, CredentialError> {
        self.issuer.issue(payload, issuer_alias, proof_format).await
    }

    pub async fn check_status(
        &self,
        credential: &VerifiableCredential,
    ) -> Result<StatusResult, CredentialError> {
        self.status.check(credential).await
    }

    pub async fn verify_credential(
        &self,
        credential: &VerifiableCredential,
    ) -> Result<VerificationResult, CredentialError> {
        self.verifier.verify(credential).await
    }

    pub async fn resolve_did(&self, did: &str) -> Result<DidDocument, CredentialError> {
        Ok(self.resolver.resolve(did).await?)
    }
}
