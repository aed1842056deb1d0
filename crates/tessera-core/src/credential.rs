use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// Base JSON-LD context of every credential.
pub const DEFAULT_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";
/// Base type of every credential.
pub const DEFAULT_TYPE: &str = "VerifiableCredential";

/// Pointer to the revocation status of a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialStatusEntry {
    /// Status method tag (e.g. `CredentialStatusList2017`).
    #[serde(rename = "type")]
    pub status_type: String,
    /// Status endpoint URL.
    pub id: String,
    /// Any further members; they are covered by the proof like the rest.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CredentialStatusEntry {
    pub fn new(status_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            status_type: status_type.into(),
            id: id.into(),
            extra: Map::new(),
        }
    }
}

/// Credential issuer: either a bare DID or an object with an `id`.
///
/// The form it was read in is kept, so a received credential serializes
/// back to the body that was signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "IssuerRepr", into = "IssuerRepr")]
pub struct Issuer {
    pub id: String,
    /// Additional issuer properties, e.g. `name`.
    pub extra: Map<String, Value>,
    compact: bool,
}

impl Issuer {
    /// An issuer in object form, `{"id": ...}`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            extra: Map::new(),
            compact: false,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum IssuerRepr {
    Id(String),
    Object {
        id: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl From<IssuerRepr> for Issuer {
    fn from(repr: IssuerRepr) -> Self {
        match repr {
            IssuerRepr::Id(id) => Self {
                id,
                extra: Map::new(),
                compact: true,
            },
            IssuerRepr::Object { id, extra } => Self {
                id,
                extra,
                compact: false,
            },
        }
    }
}

impl From<Issuer> for IssuerRepr {
    fn from(issuer: Issuer) -> Self {
        if issuer.compact && issuer.extra.is_empty() {
            IssuerRepr::Id(issuer.id)
        } else {
            IssuerRepr::Object {
                id: issuer.id,
                extra: issuer.extra,
            }
        }
    }
}

/// Proof attached to a verifiable credential at issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    /// Proof format tag.
    #[serde(rename = "type")]
    pub proof_type: String,
    pub created: DateTime<Utc>,
    pub proof_purpose: String,
    /// Verification method URL (e.g. `did:ethr:sepolia:0xabc#controller`).
    pub verification_method: String,
    /// Hex-encoded signature.
    pub proof_value: String,
}

/// Caller-supplied content of a credential to issue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPayload {
    /// Additional types besides `VerifiableCredential`.
    #[serde(default, rename = "type")]
    pub credential_type: Vec<String>,
    /// Claims about the subject, usually including the subject `id`.
    pub credential_subject: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_status: Option<CredentialStatusEntry>,
}

/// A W3C-style verifiable credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiableCredential {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    #[serde(rename = "type")]
    pub credential_type: Vec<String>,
    pub issuer: Issuer,
    pub issuance_date: DateTime<Utc>,
    pub credential_subject: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_status: Option<CredentialStatusEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
    /// Top-level members without a dedicated field (`expirationDate`,
    /// `evidence`, ...). Kept so that they stay under the signature.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VerifiableCredential {
    /// Build an unsigned credential for `issuer_did`, issued now.
    ///
    /// The issuance date is truncated to whole seconds so that its
    /// serialized form is stable across a JSON round trip.
    pub fn new(issuer_did: impl Into<String>, payload: CredentialPayload) -> Self {
        let mut types = vec![DEFAULT_TYPE.to_string()];
        for t in payload.credential_type {
            if t != DEFAULT_TYPE && !types.contains(&t) {
                types.push(t);
            }
        }

        Self {
            context: vec![DEFAULT_CONTEXT.to_string()],
            credential_type: types,
            issuer: Issuer::new(issuer_did),
            issuance_date: Utc::now().trunc_subsecs(0),
            credential_subject: payload.credential_subject,
            credential_status: payload.credential_status,
            proof: None,
            extra: Map::new(),
        }
    }

    /// The credential body covered by the proof: everything but `proof`.
    pub fn unsigned_body(&self) -> Result<serde_json::Value, CoreError> {
        let mut value = serde_json::to_value(self)?;
        if let Some(obj) = value.as_object_mut() {
            obj.remove("proof");
        }
        Ok(value)
    }

    /// The attached proof, or an error if the credential is unsigned.
    pub fn proof(&self) -> Result<&Proof, CoreError> {
        self.proof
            .as_ref()
            .ok_or_else(|| CoreError::MissingField("proof".into()))
    }

    /// Check if the credential has been signed.
    pub fn is_signed(&self) -> bool {
        self.proof.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> CredentialPayload {
        let subject = json!({"id": "did:web:example.com", "you": "Rock"});
        CredentialPayload {
            credential_type: vec!["VerifiableCredential".into(), "Membership".into()],
            credential_subject: subject.as_object().cloned().unwrap(),
            credential_status: Some(CredentialStatusEntry::new(
                "CredentialStatusList2017",
                "http://localhost:4000/credentialStatus",
            )),
        }
    }

    #[test]
    fn test_new_credential_shape() {
        let vc = VerifiableCredential::new("did:ethr:sepolia:0xabc", payload());
        assert_eq!(vc.context, vec![DEFAULT_CONTEXT.to_string()]);
        assert_eq!(vc.credential_type, vec!["VerifiableCredential", "Membership"]);
        assert_eq!(vc.issuer.id, "did:ethr:sepolia:0xabc");
        assert_eq!(vc.issuance_date.timestamp_subsec_nanos(), 0);
        assert!(!vc.is_signed());
        assert!(vc.proof().is_err());
    }

    #[test]
    fn test_unsigned_body_excludes_proof() {
        let mut vc = VerifiableCredential::new("did:ethr:sepolia:0xabc", payload());
        vc.proof = Some(Proof {
            proof_type: "Ed25519Signature2020".into(),
            created: Utc::now(),
            proof_purpose: "assertionMethod".into(),
            verification_method: "did:ethr:sepolia:0xabc#controller".into(),
            proof_value: "00".into(),
        });
        let body = vc.unsigned_body().unwrap();
        assert!(body.get("proof").is_none());
        assert_eq!(body["credentialSubject"]["you"], "Rock");
        assert_eq!(body["credentialStatus"]["type"], "CredentialStatusList2017");
        assert_eq!(body["@context"][0], DEFAULT_CONTEXT);
    }

    #[test]
    fn test_serde_roundtrip_preserves_body() {
        let vc = VerifiableCredential::new("did:key:z6Mk", payload());
        let json = serde_json::to_string(&vc).unwrap();
        let back: VerifiableCredential = serde_json::from_str(&json).unwrap();
        assert_eq!(back.unsigned_body().unwrap(), vc.unsigned_body().unwrap());
    }

    #[test]
    fn test_no_status_is_omitted() {
        let mut p = payload();
        p.credential_status = None;
        let vc = VerifiableCredential::new("did:key:z6Mk", p);
        let body = vc.unsigned_body().unwrap();
        assert!(body.get("credentialStatus").is_none());
    }

    #[test]
    fn test_unknown_members_survive_roundtrip() {
        let raw = json!({
            "@context": [DEFAULT_CONTEXT],
            "type": [DEFAULT_TYPE],
            "issuer": "did:key:z6Mk",
            "issuanceDate": "2024-01-01T00:00:00Z",
            "expirationDate": "2025-01-01T00:00:00Z",
            "evidence": [{"type": "DocumentVerification"}],
            "credentialSubject": {"id": "did:web:example.com"},
            "credentialStatus": {
                "type": "CredentialStatusList2017",
                "id": "http://localhost:4000/credentialStatus",
                "statusListIndex": "7",
            },
        });
        let vc: VerifiableCredential = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(vc.issuer.id, "did:key:z6Mk");
        assert_eq!(vc.extra["expirationDate"], "2025-01-01T00:00:00Z");
        assert_eq!(vc.unsigned_body().unwrap(), raw);
    }

    #[test]
    fn test_issuer_object_form_keeps_members() {
        let raw = json!({"id": "did:key:z6Mk", "name": "Example University"});
        let issuer: Issuer = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(issuer.id, "did:key:z6Mk");
        assert_eq!(serde_json::to_value(&issuer).unwrap(), raw);
        assert_eq!(
            serde_json::to_value(Issuer::new("did:key:z6Mk")).unwrap(),
            json!({"id": "did:key:z6Mk"})
        );
    }
}
