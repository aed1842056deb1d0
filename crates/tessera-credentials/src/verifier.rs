use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tessera_core::VerifiableCredential;
use tessera_identity::DidResolver;

use crate::error::CredentialError;
use crate::proof::ProofSuites;
use crate::status::StatusChecker;

/// Revocation state as seen by the verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Revocation {
    Revoked,
    NotRevoked,
    /// The status lookup failed; the credential may or may not be revoked.
    Unknown { reason: String },
}

/// Result of verifying a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub signature_valid: bool,
    /// Why the signature check failed, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_error: Option<String>,
    pub revocation: Revocation,
}

impl VerificationResult {
    /// Signature holds and the credential is known not to be revoked.
    pub fn is_valid(&self) -> bool {
        self.signature_valid && self.revocation == Revocation::NotRevoked
    }
}

/// Checks credential proofs against resolved issuer documents and looks
/// up their revocation status.
pub struct CredentialVerifier {
    resolver: Arc<dyn DidResolver>,
    suites: Arc<ProofSuites>,
    status: Arc<StatusChecker>,
}

impl CredentialVerifier {
    pub fn new(
        resolver: Arc<dyn DidResolver>,
        suites: Arc<ProofSuites>,
        status: Arc<StatusChecker>,
    ) -> Self {
        Self {
            resolver,
            suites,
            status,
        }
    }

    /// Verify a credential. Failing to resolve the issuer is an error; a
    /// bad signature or a failed status lookup is reported in the result.
    pub async fn verify(
        &self,
        credential: &VerifiableCredential,
    ) -> Result<VerificationResult, CredentialError> {
        let document = self.resolver.resolve(&credential.issuer.id).await?;

        let signature_error = self.check_signature(credential, &document).err();
        if let Some(reason) = &signature_error {
            tracing::info!(issuer = %credential.issuer.id, reason = %reason, "credential signature invalid");
        }

        let revocation = match self.status.check(credential).await {
            Ok(result) if result.revoked => Revocation::Revoked,
            Ok(_) => Revocation::NotRevoked,
            Err(e) => {
                tracing::warn!(issuer = %credential.issuer.id, error = %e, "revocation status unknown");
                Revocation::Unknown {
                    reason: e.to_string(),
                }
            }
        };

        Ok(VerificationResult {
            signature_valid: signature_error.is_none(),
            signature_error,
            revocation,
        })
    }

    fn check_signature(
        &self,
        credential: &VerifiableCredential,
        document: &tessera_identity::DidDocument,
    ) -> Result<(), String> {
        let proof = credential.proof().map_err(|e| e.to_string())?;
        let suite = self.suites.get(&proof.proof_type).map_err(|e| e.to_string())?;

        if !proof
            .verification_method
            .starts_with(&format!("{}#", credential.issuer.id))
        {
            return Err(format!(
                "verification method {} does not belong to issuer {}",
                proof.verification_method, credential.issuer.id
            ));
        }
        let method = document
            .find_verification_method(&proof.verification_method)
            .ok_or_else(|| format!("verification method {} not found", proof.verification_method))?;
        let material = method.key_material().map_err(|e| e.to_string())?;

        let signature = hex::decode(proof.proof_value.trim_start_matches("0x"))
            .map_err(|e| format!("proof value is not hex: {}", e))?;
        let body = credential.unsigned_body().map_err(|e| e.to_string())?;
        let input = suite
            .signing_input(&body, &credential.issuer.id)
            .map_err(|e| e.to_string())?;

        suite
            .verify(&material, &input, &signature)
            .map_err(|e| e.to_string())
    }
}
