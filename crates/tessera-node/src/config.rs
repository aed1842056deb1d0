//! Node configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

pub const KMS_SECRET_ENV: &str = "KMS_SECRET_KEY";
pub const INFURA_PROJECT_ENV: &str = "INFURA_PROJECT_ID";

/// Full configuration for the Tessera node.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TesseraConfig {
    /// API server settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Identifier creation and `did:ethr` networks.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Credential status lookups.
    #[serde(default)]
    pub status: StatusConfig,

    /// DID resolution policy.
    #[serde(default)]
    pub resolver: ResolverSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API listen address.
    #[serde(default = "default_api_addr")]
    pub listen_addr: String,
    /// API port.
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Rocksdb,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    /// Path to the data directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Provider used when none is requested.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Networks for which `did:ethr` identifiers can be created and resolved.
    #[serde(default = "default_ethr_networks")]
    pub ethr_networks: Vec<String>,
    /// JSON-RPC endpoint used instead of Infura, for every network.
    #[serde(default)]
    pub rpc_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Status endpoint put into the sample credential; defaults to this
    /// node's own `/credentialStatus`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_status_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSettings {
    #[serde(default = "default_resolver_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_ms")]
    pub base_backoff_ms: u64,
}

// Default value functions
fn default_api_addr() -> String {
    "127.0.0.1".into()
}
fn default_api_port() -> u16 {
    4000
}
fn default_backend() -> StorageBackend {
    StorageBackend::Rocksdb
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}
fn default_provider() -> String {
    "did:ethr:sepolia".into()
}
fn default_ethr_networks() -> Vec<String> {
    vec!["sepolia".into()]
}
fn default_status_timeout() -> u64 {
    10
}
fn default_resolver_timeout() -> u64 {
    10
}
fn default_max_retries() -> u32 {
    2
}
fn default_backoff_ms() -> u64 {
    200
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_api_addr(),
            port: default_api_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            ethr_networks: default_ethr_networks(),
            rpc_url: None,
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_status_timeout(),
        }
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_resolver_timeout(),
            max_retries: default_max_retries(),
            base_backoff_ms: default_backoff_ms(),
        }
    }
}

impl ResolverSettings {
    pub fn to_resolver_config(&self) -> tessera_identity::ResolverConfig {
        tessera_identity::ResolverConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            base_backoff: Duration::from_millis(self.base_backoff_ms),
        }
    }
}

impl TesseraConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: TesseraConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Status URL for the sample credential.
    pub fn status_url(&self) -> String {
        if let Some(url) = &self.status.url {
            return url.clone();
        }
        let host = match self.api.listen_addr.as_str() {
            "0.0.0.0" | "::" => "localhost",
            other => other,
        };
        format!("http://{}:{}/credentialStatus", host, self.api.port)
    }
}

/// Secrets read once from the environment at startup.
pub struct Secrets {
    /// Hex-encoded 32-byte key sealing private keys at rest.
    pub kms_secret_key: Zeroizing<String>,
    /// Infura project id used to build `did:ethr` RPC URLs.
    pub infura_project_id: Option<Zeroizing<String>>,
}

impl Secrets {
    pub fn from_env() -> anyhow::Result<Self> {
        let kms_secret_key = std::env::var(KMS_SECRET_ENV)
            .map(Zeroizing::new)
            .map_err(|_| anyhow::anyhow!("{} must be set", KMS_SECRET_ENV))?;
        let infura_project_id = std::env::var(INFURA_PROJECT_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .map(Zeroizing::new);
        Ok(Self {
            kms_secret_key,
            infura_project_id,
        })
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("kms_secret_key", &"<redacted>")
            .field(
                "infura_project_id",
                &self.infura_project_id.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
