use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tessera_core::Did;

use crate::document::DidDocument;
use crate::error::IdentityError;

/// Resolves DIDs to their documents.
#[async_trait]
pub trait DidResolver: Send + Sync {
    async fn resolve(&self, did: &str) -> Result<DidDocument, IdentityError>;
}

/// Timeout and retry policy applied to every plugin call.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub timeout: Duration,
    /// Retries after the first attempt, for transient failures only.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub base_backoff: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 2,
            base_backoff: Duration::from_millis(200),
        }
    }
}

/// Dispatches resolution by DID method to one registered plugin.
pub struct MethodResolver {
    resolvers: HashMap<String, Arc<dyn DidResolver>>,
    config: ResolverConfig,
}

impl MethodResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            resolvers: HashMap::new(),
            config,
        }
    }

    /// Register the plugin for `method`. A later registration for the same
    /// method replaces the earlier one.
    pub fn register(&mut self, method: impl Into<String>, resolver: Arc<dyn DidResolver>) {
        let method = method.into();
        if self.resolvers.insert(method.clone(), resolver).is_some() {
            tracing::warn!(method = %method, "DID resolver replaced");
        }
    }

    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.resolvers.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }

    async fn attempt(
        &self,
        resolver: &Arc<dyn DidResolver>,
        did: &str,
    ) -> Result<DidDocument, IdentityError> {
        match tokio::time::timeout(self.config.timeout, resolver.resolve(did)).await {
            Ok(result) => result,
            Err(_) => Err(IdentityError::resolution(
                did,
                format!("timed out after {:?}", self.config.timeout),
                true,
            )),
        }
    }
}

impl Default for MethodResolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

#[async_trait]
impl DidResolver for MethodResolver {
    async fn resolve(&self, did: &str) -> Result<DidDocument, IdentityError> {
        let parsed = Did::parse(did).map_err(|e| IdentityError::InvalidDid(e.to_string()))?;
        let resolver = self
            .resolvers
            .get(parsed.method())
            .ok_or_else(|| IdentityError::UnsupportedMethod(parsed.method().to_string()))?;

        tracing::debug!(did = %did, method = parsed.method(), "resolving DID");

        let mut attempt = 0u32;
        loop {
            match self.attempt(resolver, did).await {
                Ok(doc) => return Ok(doc),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    let delay = self.config.base_backoff * 2u32.pow(attempt);
                    attempt += 1;
                    tracing::debug!(
                        did = %did,
                        attempt,
                        max_retries = self.config.max_retries,
                        error = %e,
                        "resolution failed, retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
