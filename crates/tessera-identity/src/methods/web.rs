use async_trait::async_trait;
use tessera_core::Did;
use url::Url;

use crate::document::DidDocument;
use crate::error::IdentityError;
use crate::methods::http_error;
use crate::resolver::DidResolver;

/// `did:web` resolver: fetches the document over HTTPS.
pub struct WebResolver {
    client: reqwest::Client,
    scheme: String,
}

impl WebResolver {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            scheme: "https".into(),
        }
    }

    /// Use another URL scheme, e.g. plain `http` against a local host.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Document URL for a `did:web` method-specific id:
    /// `host` → `/.well-known/did.json`, `host:a:b` → `/a/b/did.json`.
    pub fn document_url(&self, did: &str, id: &str) -> Result<Url, IdentityError> {
        let mut segments = id.split(':');
        let host = segments
            .next()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| IdentityError::InvalidDid(did.to_string()))?
            .replace("%3A", ":")
            .replace("%3a", ":");
        let path: Vec<&str> = segments.collect();
        if path.iter().any(|s| s.is_empty()) {
            return Err(IdentityError::InvalidDid(did.to_string()));
        }

        let raw = if path.is_empty() {
            format!("{}://{}/.well-known/did.json", self.scheme, host)
        } else {
            format!("{}://{}/{}/did.json", self.scheme, host, path.join("/"))
        };
        Url::parse(&raw).map_err(|e| IdentityError::InvalidDid(format!("{}: {}", did, e)))
    }
}

#[async_trait]
impl DidResolver for WebResolver {
    async fn resolve(&self, did: &str) -> Result<DidDocument, IdentityError> {
        let parsed = Did::parse(did).map_err(|e| IdentityError::InvalidDid(e.to_string()))?;
        if parsed.method() != "web" {
            return Err(IdentityError::UnsupportedMethod(parsed.method().to_string()));
        }
        let url = self.document_url(did, parsed.identifier())?;
        tracing::debug!(did = %did, url = %url, "fetching did:web document");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| http_error(did, e))?;
        let status = response.status();
        if !status.is_success() {
            let transient = status.is_server_error() || status.as_u16() == 429;
            return Err(IdentityError::resolution(
                did,
                format!("{} returned {}", url, status),
                transient,
            ));
        }

        let doc: DidDocument = response
            .json()
            .await
            .map_err(|e| IdentityError::resolution(did, format!("invalid document: {}", e), false))?;
        if doc.id != did {
            return Err(IdentityError::resolution(
                did,
                format!("document id '{}' does not match", doc.id),
                false,
            ));
        }
        Ok(doc)
    }
}
