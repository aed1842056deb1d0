//! Integration test: the node's HTTP surface on a did:ethr agent.

use std::sync::Arc;

use serde_json::json;
use tessera_core::{Identifier, VerifiableCredential};
use tessera_credentials::{Revocation, StatusChecker, VerificationResult};
use tessera_identity::DidDocument;
use tessera_integration_tests::{agent, local_agent, mock_chain, serve};
use tessera_store::MemoryStore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_root_runs_sample_flow() {
    let chain = mock_chain().await;
    let base = serve(agent(&chain, Arc::new(MemoryStore::new()))).await;

    let first: Identifier = reqwest::get(format!("{}/", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(first.did.starts_with("did:ethr:sepolia:0x"));
    assert_eq!(first.alias.as_deref(), Some("default"));

    // Repeated calls reuse the default identifier.
    let second: Identifier = reqwest::get(format!("{}/", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first, second);
    let all: Vec<Identifier> = reqwest::get(format!("{}/identifiers", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 1);

    // Issuance, verification and resolution via RPC.
    let doc: DidDocument = reqwest::get(format!("{}/did/{}", base, first.did))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(doc.id, first.did);
    assert!(doc
        .find_verification_method(&format!("{}#controller", first.did))
        .is_some());
}

#[tokio::test]
async fn test_issue_and_verify_over_http() {
    let chain = mock_chain().await;
    let base = serve(agent(&chain, Arc::new(MemoryStore::new()))).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/identifiers", base))
        .json(&json!({"alias": "default"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);

    let vc: VerifiableCredential = client
        .post(format!("{}/credentials/issue", base))
        .json(&json!({
            "credential": {
                "type": ["Membership"],
                "credentialSubject": {"id": "did:web:example.com", "tier": 3},
                "credentialStatus": {
                    "type": "CredentialStatusList2017",
                    "id": format!("{}/credentialStatus", base)
                }
            }
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        vc.proof().unwrap().proof_type,
        "EthereumEip712Signature2021"
    );

    let result: VerificationResult = client
        .post(format!("{}/credentials/verify", base))
        .json(&json!({"credential": vc}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(result.signature_valid, "{:?}", result.signature_error);
    assert_eq!(result.revocation, Revocation::NotRevoked);

    let mut tampered = vc;
    tampered.credential_subject.insert("tier".into(), json!(4));
    let result: VerificationResult = client
        .post(format!("{}/credentials/verify", base))
        .json(&json!({"credential": tampered}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!result.signature_valid);
}

#[tokio::test]
async fn test_error_statuses() {
    let chain = mock_chain().await;
    let base = serve(agent(&chain, Arc::new(MemoryStore::new()))).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/identifiers", base))
        .json(&json!({"alias": "x", "provider": "did:ethr:ropsten"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

    let resp = client
        .post(format!("{}/credentials/issue", base))
        .json(&json!({
            "credential": {"credentialSubject": {"id": "did:web:example.com"}},
            "issuer": "nobody"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

    let resp = client
        .get(format!("{}/did/did:ethr:mainnet:0x7e5f4552091a69125d5dfcb7b8c2659029395bdf", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_resolve_route_keeps_percent_encoded_port() {
    let site = MockServer::start().await;
    let did = format!(
        "did:web:{}",
        site.uri().trim_start_matches("http://").replace(':', "%3A")
    );
    Mock::given(method("GET"))
        .and(path("/.well-known/did.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "@context": "https://www.w3.org/ns/did/v1",
            "id": did,
            "verificationMethod": [{
                "id": format!("{}#owner", did),
                "type": "EcdsaSecp256k1RecoveryMethod2020",
                "controller": did,
                "blockchainAccountId": "eip155:1:0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
            }]
        })))
        .expect(1)
        .mount(&site)
        .await;

    let base = serve(local_agent(StatusChecker::new())).await;
    let resp = reqwest::get(format!("{}/did/{}", base, did)).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let doc: DidDocument = resp.json().await.unwrap();
    assert_eq!(doc.id, did);
}
