//! Integration test: method dispatch across the ethr, web and key resolvers.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tessera_identity::{
    DidResolver, EthrNetwork, EthrResolver, IdentityError, KeyResolver, MethodResolver,
    ResolverConfig, WebResolver,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ADDRESS_DID: &str = "did:ethr:sepolia:0x7e5f4552091a69125d5dfcb7b8c2659029395bdf";

fn resolver(chain: &MockServer) -> MethodResolver {
    let client = reqwest::Client::new();
    let mut resolver = MethodResolver::new(ResolverConfig {
        timeout: Duration::from_secs(2),
        max_retries: 1,
        base_backoff: Duration::from_millis(10),
    });
    resolver.register(
        "ethr",
        Arc::new(EthrResolver::new(
            client.clone(),
            EthrNetwork::with_rpc_url("sepolia", chain.uri()),
        )),
    );
    resolver.register("web", Arc::new(WebResolver::new(client).with_scheme("http")));
    resolver.register("key", Arc::new(KeyResolver));
    resolver
}

/// `did:web` identifier for a document served by `server`.
fn web_did(server: &MockServer) -> String {
    let host = server.uri().trim_start_matches("http://").replace(':', "%3A");
    format!("did:web:{}", host)
}

#[tokio::test]
async fn test_key_resolution_is_offline() {
    let chain = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&chain)
        .await;

    let did = "did:key:z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK";
    let doc = resolver(&chain).resolve(did).await.unwrap();
    assert_eq!(doc.id, did);
    assert_eq!(doc.authentication_ids().len(), 1);
}

#[tokio::test]
async fn test_web_resolution_only_hits_web_host() {
    let chain = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&chain)
        .await;

    let site = MockServer::start().await;
    let did = web_did(&site);
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
            }],
            "authentication": ["#owner"]
        })))
        .expect(1)
        .mount(&site)
        .await;

    let doc = resolver(&chain).resolve(&did).await.unwrap();
    assert_eq!(doc.id, did);
    assert!(doc.find_verification_method("#owner").is_some());
}

#[tokio::test]
async fn test_ethr_resolution_retries_transient_errors() {
    let chain = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .expect(2)
        .mount(&chain)
        .await;

    let err = resolver(&chain).resolve(ADDRESS_DID).await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_ethr_rpc_error_not_retried() {
    let chain = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32000, "message": "execution reverted"}
        })))
        .expect(1)
        .mount(&chain)
        .await;

    let err = resolver(&chain).resolve(ADDRESS_DID).await.unwrap_err();
    assert!(matches!(
        err,
        IdentityError::ResolutionFailed { transient: false, .. }
    ));
}

#[tokio::test]
async fn test_unregistered_method() {
    let chain = MockServer::start().await;
    let resolver = resolver(&chain);
    assert!(matches!(
        resolver.resolve("did:ion:EiClkZMDxPKqC9c").await,
        Err(IdentityError::UnsupportedMethod(m)) if m == "ion"
    ));
    assert!(matches!(
        resolver.resolve("not-a-did").await,
        Err(IdentityError::InvalidDid(_))
    ));
}
