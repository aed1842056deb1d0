//! Integration test: default identifier, issuance in every proof format,
//! status lookups and verification against a mocked Sepolia node.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tessera_core::{CredentialPayload, CredentialStatusEntry, VerifiableCredential};
use tessera_credentials::{
    Agent, CredentialError, EcdsaSecp256k1Signature2019, Ed25519Signature2020,
    EthereumEip712Signature2021, Revocation, StatusChecker, StatusList2017, StatusMethod,
    DEFAULT_ALIAS,
};
use tessera_integration_tests::{agent, local_agent, mock_chain, mock_status};
use tessera_node::api::sample_payload;
use tessera_store::MemoryStore;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn plain_payload() -> CredentialPayload {
    CredentialPayload {
        credential_type: vec!["Membership".into()],
        credential_subject: json!({"id": "did:web:example.com", "level": "gold", "since": 2021})
            .as_object()
            .cloned()
            .unwrap(),
        credential_status: None,
    }
}

/// Issue the sample credential pointing at `status`'s list.
async fn issue_with_status(agent: &Agent, status: &MockServer) -> VerifiableCredential {
    agent
        .issue_credential(
            sample_payload(&format!("{}/credentialStatus", status.uri())),
            DEFAULT_ALIAS,
            EthereumEip712Signature2021::TYPE,
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_sample_scenario() {
    let chain = mock_chain().await;
    let status = mock_status(json!({"revoked": false})).await;
    let agent = agent(&chain, Arc::new(MemoryStore::new()));

    let identifier = agent.ensure_default_identifier().await.unwrap();
    assert!(identifier.did.starts_with("did:ethr:sepolia:0x"));
    assert_eq!(identifier.did.len(), "did:ethr:sepolia:0x".len() + 40);
    assert_eq!(identifier.alias.as_deref(), Some(DEFAULT_ALIAS));

    let vc = agent
        .issue_credential(
            sample_payload(&format!("{}/credentialStatus", status.uri())),
            DEFAULT_ALIAS,
            EthereumEip712Signature2021::TYPE,
        )
        .await
        .unwrap();
    assert_eq!(vc.issuer.id, identifier.did);
    assert_eq!(vc.credential_subject["you"], "Rock");

    assert!(!agent.check_status(&vc).await.unwrap().revoked);
    let result = agent.verify_credential(&vc).await.unwrap();
    assert!(result.signature_valid, "{:?}", result.signature_error);
    assert_eq!(result.revocation, Revocation::NotRevoked);
    assert!(result.is_valid());
}

#[tokio::test]
async fn test_default_identifier_created_once() {
    let chain = mock_chain().await;
    let agent = agent(&chain, Arc::new(MemoryStore::new()));

    let first = agent.ensure_default_identifier().await.unwrap();
    let second = agent.ensure_default_identifier().await.unwrap();
    assert_eq!(first, second);
    let all = agent.identifiers().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].alias.as_deref(), Some(DEFAULT_ALIAS));
}

#[tokio::test]
async fn test_every_format_verifies() {
    let chain = mock_chain().await;
    let agent = agent(&chain, Arc::new(MemoryStore::new()));
    agent.ensure_default_identifier().await.unwrap();
    agent
        .create_identifier(Some("ed"), Some("did:key"))
        .await
        .unwrap();

    let cases = [
        (DEFAULT_ALIAS, EthereumEip712Signature2021::TYPE),
        (DEFAULT_ALIAS, EcdsaSecp256k1Signature2019::TYPE),
        ("ed", Ed25519Signature2020::TYPE),
    ];
    for (alias, format) in cases {
        let vc = agent
            .issue_credential(plain_payload(), alias, format)
            .await
            .unwrap();
        assert_eq!(vc.proof().unwrap().proof_type, format);
        let result = agent.verify_credential(&vc).await.unwrap();
        assert!(
            result.signature_valid,
            "{} failed: {:?}",
            format, result.signature_error
        );
        assert_eq!(result.revocation, Revocation::NotRevoked);
    }
}

#[tokio::test]
async fn test_tampering_breaks_signature() {
    let chain = mock_chain().await;
    let agent = agent(&chain, Arc::new(MemoryStore::new()));
    agent.ensure_default_identifier().await.unwrap();

    for format in [
        EthereumEip712Signature2021::TYPE,
        EcdsaSecp256k1Signature2019::TYPE,
    ] {
        let vc = agent
            .issue_credential(plain_payload(), DEFAULT_ALIAS, format)
            .await
            .unwrap();

        let mut claims = vc.clone();
        claims
            .credential_subject
            .insert("level".into(), json!("platinum"));
        assert!(!agent.verify_credential(&claims).await.unwrap().signature_valid);

        let mut types = vc.clone();
        types.credential_type.push("Forged".into());
        assert!(!agent.verify_credential(&types).await.unwrap().signature_valid);

        let mut unsigned = vc;
        unsigned.proof = None;
        assert!(!agent.verify_credential(&unsigned).await.unwrap().signature_valid);
    }
}

#[tokio::test]
async fn test_foreign_issuer_signature_rejected() {
    let chain = mock_chain().await;
    let agent = agent(&chain, Arc::new(MemoryStore::new()));
    agent.ensure_default_identifier().await.unwrap();
    let other = agent
        .create_identifier(Some("other"), None)
        .await
        .unwrap();

    // Signed by "default", claimed by "other".
    let mut vc = agent
        .issue_credential(plain_payload(), DEFAULT_ALIAS, EthereumEip712Signature2021::TYPE)
        .await
        .unwrap();
    vc.issuer.id = other.did.clone();
    let result = agent.verify_credential(&vc).await.unwrap();
    assert!(!result.signature_valid);
}

/// Counts lookups and reports "revoked", so any lookup would show.
#[derive(Default)]
struct CountingStatus {
    calls: AtomicUsize,
}

#[async_trait]
impl StatusMethod for CountingStatus {
    async fn check(&self, _entry: &CredentialStatusEntry) -> Result<bool, CredentialError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

#[tokio::test]
async fn test_no_status_means_no_lookup() {
    let counting = Arc::new(CountingStatus::default());
    let mut status = StatusChecker::new();
    status.register(StatusList2017::TYPE, counting.clone()).unwrap();
    let agent = local_agent(status);
    agent.ensure_default_identifier().await.unwrap();

    let vc = agent
        .issue_credential(plain_payload(), DEFAULT_ALIAS, Ed25519Signature2020::TYPE)
        .await
        .unwrap();
    assert!(!agent.check_status(&vc).await.unwrap().revoked);
    let result = agent.verify_credential(&vc).await.unwrap();
    assert!(result.signature_valid, "{:?}", result.signature_error);
    assert_eq!(result.revocation, Revocation::NotRevoked);
    assert_eq!(counting.calls.load(Ordering::SeqCst), 0);

    // With a status entry the same method is consulted.
    let mut payload = plain_payload();
    payload.credential_status = Some(CredentialStatusEntry::new(
        StatusList2017::TYPE,
        "http://status.invalid/credentialStatus",
    ));
    let vc = agent
        .issue_credential(payload, DEFAULT_ALIAS, Ed25519Signature2020::TYPE)
        .await
        .unwrap();
    assert_eq!(
        agent.verify_credential(&vc).await.unwrap().revocation,
        Revocation::Revoked
    );
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_status_outcomes() {
    let chain = mock_chain().await;
    let agent = agent(&chain, Arc::new(MemoryStore::new()));
    agent.ensure_default_identifier().await.unwrap();

    let revoked = mock_status(json!({"revoked": true})).await;
    let vc = issue_with_status(&agent, &revoked).await;
    assert!(agent.check_status(&vc).await.unwrap().revoked);
    let result = agent.verify_credential(&vc).await.unwrap();
    assert!(result.signature_valid);
    assert_eq!(result.revocation, Revocation::Revoked);

    // Bare booleans are accepted too.
    let bare = mock_status(json!(false)).await;
    let vc = issue_with_status(&agent, &bare).await;
    assert!(!agent.check_status(&vc).await.unwrap().revoked);

    let garbage = mock_status(json!({"revoked": "maybe"})).await;
    let vc = issue_with_status(&agent, &garbage).await;
    assert!(matches!(
        agent.check_status(&vc).await,
        Err(CredentialError::StatusFetchError { .. })
    ));
    let result = agent.verify_credential(&vc).await.unwrap();
    assert!(result.signature_valid);
    assert!(matches!(result.revocation, Revocation::Unknown { .. }));
    assert!(!result.is_valid());

    let mut unknown = vc;
    if let Some(entry) = unknown.credential_status.as_mut() {
        entry.status_type = "StatusList2021Entry".into();
    }
    assert!(matches!(
        agent.check_status(&unknown).await,
        Err(CredentialError::UnknownStatusType(_))
    ));
}

#[tokio::test]
async fn test_unreachable_chain_fails_verification() {
    let chain = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&chain)
        .await;
    let agent = agent(&chain, Arc::new(MemoryStore::new()));
    agent.ensure_default_identifier().await.unwrap();
    let vc = agent
        .issue_credential(plain_payload(), DEFAULT_ALIAS, EthereumEip712Signature2021::TYPE)
        .await
        .unwrap();

    let err = agent.verify_credential(&vc).await.unwrap_err();
    match err {
        CredentialError::Identity(e) => assert!(e.is_transient(), "{}", e),
        other => panic!("unexpected error: {}", other),
    }
    // One call plus two retries.
    let requests = chain.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}
