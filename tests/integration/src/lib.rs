//! Fixtures shared by the integration tests: a mocked Ethereum JSON-RPC
//! node, a mocked status list and agents wired the way the node wires them.

use std::sync::Arc;

use serde_json::json;
use tessera_credentials::{Agent, ProofSuites, StatusChecker};
use tessera_crypto::SecretBox;
use tessera_identity::{
    DidManager, KeyManager, KeyResolver, MethodResolver, ResolverConfig, WebResolver,
};
use tessera_node::api::{build_router, AppState};
use tessera_node::config::{Secrets, TesseraConfig};
use tessera_node::node::build_agent;
use tessera_store::{DidStore, KeyStore, MemoryStore, PrivateKeyStore};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};
use zeroize::Zeroizing;

/// Answers `identityOwner(address)` with the queried address, i.e. every
/// identity still owns itself.
pub struct EchoOwner;

impl Respond for EchoOwner {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => return ResponseTemplate::new(400),
        };
        let data = body["params"][0]["data"].as_str().unwrap_or_default();
        if data.len() < 40 {
            return ResponseTemplate::new(400);
        }
        let address = &data[data.len() - 40..];
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": body["id"].clone(),
            "result": format!("0x{:0>64}", address),
        }))
    }
}

/// A JSON-RPC endpoint serving the ERC-1056 owner lookup.
pub async fn mock_chain() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_call"})))
        .respond_with(EchoOwner)
        .mount(&server)
        .await;
    server
}

/// A `CredentialStatusList2017` endpoint at `/credentialStatus`.
pub async fn mock_status(body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/credentialStatus"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    server
}

/// Node configuration with `did:ethr:sepolia` as default provider and
/// every ethr lookup sent to `rpc_url`.
pub fn config(rpc_url: &str) -> TesseraConfig {
    let mut config = TesseraConfig::default();
    config.identity.rpc_url = Some(rpc_url.to_string());
    config.resolver.base_backoff_ms = 10;
    config.status.timeout_secs = 2;
    config
}

pub fn secrets(kms_secret_key: &str) -> Secrets {
    Secrets {
        kms_secret_key: Zeroizing::new(kms_secret_key.to_string()),
        infura_project_id: None,
    }
}

/// Agent on `store`, sealed with a fresh secret.
pub fn agent<S>(chain: &MockServer, store: Arc<S>) -> Agent
where
    S: KeyStore + PrivateKeyStore + DidStore + 'static,
{
    agent_with_secret(chain, store, &SecretBox::generate_secret())
}

pub fn agent_with_secret<S>(chain: &MockServer, store: Arc<S>, secret: &str) -> Agent
where
    S: KeyStore + PrivateKeyStore + DidStore + 'static,
{
    match build_agent(&config(&chain.uri()), &secrets(secret), store) {
        Ok(agent) => agent,
        Err(e) => panic!("agent assembly failed: {:#}", e),
    }
}

/// In-memory `did:key` agent assembled by hand: `did:web` documents are
/// fetched over plain http and `status` answers every status lookup.
pub fn local_agent(status: StatusChecker) -> Agent {
    let store = Arc::new(MemoryStore::new());
    let secret_box = match SecretBox::new(&SecretBox::generate_secret()) {
        Ok(secret_box) => secret_box,
        Err(e) => panic!("bad secret: {}", e),
    };
    let keys = Arc::new(KeyManager::new(store.clone(), store.clone(), secret_box));
    let dids = Arc::new(DidManager::with_default_providers(
        store,
        keys.clone(),
        "did:key",
        &[],
    ));
    let mut resolver = MethodResolver::new(ResolverConfig::default());
    resolver.register(
        "web",
        Arc::new(WebResolver::new(reqwest::Client::new()).with_scheme("http")),
    );
    resolver.register("key", Arc::new(KeyResolver));
    Agent::new(
        keys,
        dids,
        Arc::new(resolver),
        Arc::new(ProofSuites::standard()),
        Arc::new(status),
    )
}

/// Serve `agent` on an ephemeral port; the sample credential points at the
/// node's own status endpoint. Returns the base URL.
pub async fn serve(agent: Agent) -> String {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(e) => panic!("cannot bind: {}", e),
    };
    let base = match listener.local_addr() {
        Ok(addr) => format!("http://{}", addr),
        Err(e) => panic!("no local address: {}", e),
    };
    let state = AppState::new(Arc::new(agent), format!("{}/credentialStatus", base));
    tokio::spawn(async move {
        let _ = axum::serve(listener, build_router(state)).await;
    });
    base
}
