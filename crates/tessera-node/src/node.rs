//! Startup assembly of the agent: store, key custody, DID providers,
//! method resolvers, proof suites and status methods.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tessera_credentials::{Agent, ProofSuites, StatusChecker, StatusList2017};
use tessera_crypto::SecretBox;
use tessera_identity::{
    DidManager, EthrNetwork, EthrResolver, KeyManager, KeyResolver, MethodResolver, WebResolver,
};
use tessera_store::{DidStore, KeyStore, MemoryStore, PrivateKeyStore, RocksStore};

use crate::api::{self, AppState};
use crate::config::{Secrets, StorageBackend, TesseraConfig};

/// A fully assembled node, ready to serve the HTTP API.
pub struct TesseraNode {
    config: TesseraConfig,
    agent: Arc<Agent>,
}

impl TesseraNode {
    /// Open (and migrate) the configured store, then build the agent on it.
    pub fn new(config: TesseraConfig, secrets: &Secrets) -> anyhow::Result<Self> {
        let agent = match config.storage.backend {
            StorageBackend::Rocksdb => {
                let path = config.storage.data_dir.join("store");
                std::fs::create_dir_all(&path)
                    .with_context(|| format!("cannot create {}", path.display()))?;
                let store = RocksStore::open(&path)
                    .with_context(|| format!("cannot open store at {}", path.display()))?;
                tracing::info!(
                    path = %path.display(),
                    schema_version = store.schema_version()?,
                    "store opened"
                );
                build_agent(&config, secrets, Arc::new(store))?
            }
            StorageBackend::Memory => {
                tracing::warn!("using in-memory store, identifiers will not survive a restart");
                build_agent(&config, secrets, Arc::new(MemoryStore::new()))?
            }
        };
        Ok(Self {
            config,
            agent: Arc::new(agent),
        })
    }

    pub fn agent(&self) -> Arc<Agent> {
        self.agent.clone()
    }

    pub fn config(&self) -> &TesseraConfig {
        &self.config
    }

    /// Serve the HTTP API until the future resolves or fails.
    pub async fn run(&self) -> anyhow::Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.api.listen_addr, self.config.api.port)
            .parse()
            .context("invalid API listen address")?;
        let state = AppState::new(self.agent.clone(), self.config.status_url());
        api::start_api_server(addr, state).await
    }
}

/// Build an [`Agent`] on top of any store implementing the three tables.
pub fn build_agent<S>(
    config: &TesseraConfig,
    secrets: &Secrets,
    store: Arc<S>,
) -> anyhow::Result<Agent>
where
    S: KeyStore + PrivateKeyStore + DidStore + 'static,
{
    let secret_box = SecretBox::new(&secrets.kms_secret_key).context("invalid KMS_SECRET_KEY")?;
    let keys = Arc::new(KeyManager::new(store.clone(), store.clone(), secret_box));

    let networks: Vec<&str> = config
        .identity
        .ethr_networks
        .iter()
        .map(String::as_str)
        .collect();
    let dids = Arc::new(DidManager::with_default_providers(
        store,
        keys.clone(),
        config.identity.default_provider.clone(),
        &networks,
    ));
    tracing::info!(
        default_provider = %dids.default_provider(),
        providers = ?dids.providers(),
        "DID providers registered"
    );

    let resolver_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.resolver.timeout_secs))
        .build()
        .context("cannot build resolver HTTP client")?;
    let mut resolver = MethodResolver::new(config.resolver.to_resolver_config());
    resolver.register(
        "ethr",
        Arc::new(EthrResolver::new(
            resolver_client.clone(),
            ethr_networks(config, secrets)?,
        )),
    );
    resolver.register("web", Arc::new(WebResolver::new(resolver_client)));
    resolver.register("key", Arc::new(KeyResolver));

    let status_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.status.timeout_secs))
        .build()
        .context("cannot build status HTTP client")?;
    let mut status = StatusChecker::new();
    status.register(
        StatusList2017::TYPE,
        Arc::new(StatusList2017::new(status_client)),
    )?;

    Ok(Agent::new(
        keys,
        dids,
        Arc::new(resolver),
        Arc::new(ProofSuites::standard()),
        Arc::new(status),
    ))
}

/// RPC endpoints for every configured `did:ethr` network. An explicit
/// `rpc_url` wins over Infura.
fn ethr_networks(config: &TesseraConfig, secrets: &Secrets) -> anyhow::Result<Vec<EthrNetwork>> {
    let mut networks = Vec::with_capacity(config.identity.ethr_networks.len());
    for name in &config.identity.ethr_networks {
        let network = match (&config.identity.rpc_url, &secrets.infura_project_id) {
            (Some(url), _) => EthrNetwork::with_rpc_url(name, url.clone()),
            (None, Some(project_id)) => EthrNetwork::infura(name, project_id),
            (None, None) => anyhow::bail!(
                "did:ethr:{} needs identity.rpc_url or {}",
                name,
                crate::config::INFURA_PROJECT_ENV
            ),
        };
        let network = network.with_context(|| format!("unknown ethr network: {}", name))?;
        tracing::debug!(network = %network.name, chain_id = network.chain_id, "ethr network configured");
        networks.push(network);
    }
    Ok(networks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zeroize::Zeroizing;

    fn secrets(infura: Option<&str>) -> Secrets {
        Secrets {
            kms_secret_key: Zeroizing::new(SecretBox::generate_secret()),
            infura_project_id: infura.map(|p| Zeroizing::new(p.to_string())),
        }
    }

    #[test]
    fn test_ethr_networks_prefers_rpc_url() {
        let mut config = TesseraConfig::default();
        config.identity.rpc_url = Some("http://localhost:8545".into());
        let networks = ethr_networks(&config, &secrets(Some("abc"))).unwrap();
        assert_eq!(networks.len(), 1);
        assert_eq!(networks[0].rpc_url, "http://localhost:8545");
        assert_eq!(networks[0].chain_id, 11155111);
    }

    #[test]
    fn test_ethr_networks_infura() {
        let config = TesseraConfig::default();
        let networks = ethr_networks(&config, &secrets(Some("abc"))).unwrap();
        assert_eq!(networks[0].rpc_url, "https://sepolia.infura.io/v3/abc");
    }

    #[test]
    fn test_ethr_networks_errors() {
        let config = TesseraConfig::default();
        assert!(ethr_networks(&config, &secrets(None)).is_err());

        let mut config = TesseraConfig::default();
        config.identity.ethr_networks = vec!["ropsten".into()];
        assert!(ethr_networks(&config, &secrets(Some("abc"))).is_err());
    }

    #[test]
    fn test_build_agent_rejects_bad_secret() {
        let config = TesseraConfig::default();
        let bad = Secrets {
            kms_secret_key: Zeroizing::new("not-hex".into()),
            infura_project_id: Some(Zeroizing::new("abc".into())),
        };
        assert!(build_agent(&config, &bad, Arc::new(MemoryStore::new())).is_err());
    }

    #[tokio::test]
    async fn test_node_on_rocksdb_creates_default_identifier() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TesseraConfig::default();
        config.storage.data_dir = dir.path().to_path_buf();
        let secrets = secrets(Some("abc"));

        let did = {
            let node = TesseraNode::new(config.clone(), &secrets).unwrap();
            let identifier = node.agent().ensure_default_identifier().await.unwrap();
            assert!(identifier.did.starts_with("did:ethr:sepolia:0x"));
            identifier.did
        };

        // Reopening the same directory keeps the identifier.
        let node = TesseraNode::new(config, &secrets).unwrap();
        let identifier = node.agent().ensure_default_identifier().await.unwrap();
        assert_eq!(identifier.did, did);
        assert_eq!(node.agent().identifiers().await.unwrap().len(), 1);
    }
}
