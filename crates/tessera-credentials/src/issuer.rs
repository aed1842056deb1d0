use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use tessera_core::{CredentialPayload, Identifier, Proof, VerifiableCredential};
use tessera_identity::{DidManager, IdentityError, KeyManager};

use crate::error::CredentialError;
use crate::proof::ProofSuites;

pub const ASSERTION_METHOD: &str = "assertionMethod";

/// Issues credentials signed by managed identifiers.
pub struct CredentialIssuer {
    dids: Arc<DidManager>,
    keys: Arc<KeyManager>,
    suites: Arc<ProofSuites>,
}

impl CredentialIssuer {
    pub fn new(dids: Arc<DidManager>, keys: Arc<KeyManager>, suites: Arc<ProofSuites>) -> Self {
        Self { dids, keys, suites }
    }

    /// Build and sign a credential for the identifier bound to `issuer_alias`.
    pub async fn issue(
        &self,
        payload: CredentialPayload,
        issuer_alias: &str,
        proof_format: &str,
    ) -> Result<VerifiableCredential, CredentialError> {
        let suite = self.suites.get(proof_format)?;
        let identifier = self.dids.find_by_alias(issuer_alias).await?;
        let key = self.keys.get(&identifier.controller_key_id).await?;
        if key.key_type != suite.key_type() {
            return Err(CredentialError::UnsupportedFormat(format!(
                "{} needs a {} key, {} is controlled by a {} key",
                proof_format,
                suite.key_type(),
                identifier.did,
                key.key_type
            )));
        }

        let mut credential = VerifiableCredential::new(identifier.did.clone(), payload);
        let input = suite.signing_input(&credential.unsigned_body()?, &identifier.did)?;
        let signature = self
            .keys
            .sign(&key.kid, &input, suite.algorithm())
            .await
            .map_err(CredentialError::from_signing)?;

        credential.proof = Some(Proof {
            proof_type: suite.proof_type().to_string(),
            created: Utc::now().trunc_subsecs(0),
            proof_purpose: ASSERTION_METHOD.to_string(),
            verification_method: verification_method_id(&identifier)?,
            proof_value: hex::encode(signature),
        });

        tracing::info!(
            issuer = %identifier.did,
            proof_type = suite.proof_type(),
            subject = ?credential.credential_subject.get("id"),
            "credential issued"
        );
        Ok(credential)
    }
}

/// Id of the verification method that resolvers publish for an
/// identifier's controller key.
pub fn verification_method_id(identifier: &Identifier) -> Result<String, CredentialError> {
    let did = identifier.parsed_did().map_err(IdentityError::from)?;
    match did.method() {
        "ethr" => Ok(format!("{}#controller", did)),
        "key" => Ok(format!("{}#{}", did, did.identifier())),
        other => Err(CredentialError::Identity(IdentityError::UnsupportedMethod(
            other.to_string(),
        ))),
    }
}
