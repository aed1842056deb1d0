use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tessera_core::{CredentialStatusEntry, VerifiableCredential};

use crate::error::CredentialError;

/// Largest status body that is read.
const MAX_STATUS_BODY: usize = 64 * 1024;
/// Characters of an unparseable body quoted in the error.
const MAX_QUOTED_BODY: usize = 128;

/// Outcome of a status lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResult {
    pub revoked: bool,
}

/// Revocation lookup for one status type.
#[async_trait]
pub trait StatusMethod: Send + Sync {
    /// Whether the credential the entry belongs to is revoked.
    async fn check(&self, entry: &CredentialStatusEntry) -> Result<bool, CredentialError>;
}

/// `CredentialStatusList2017`: GET the entry URL, which answers
/// `{"revoked": bool}` or a bare boolean.
pub struct StatusList2017 {
    client: reqwest::Client,
}

impl StatusList2017 {
    pub const TYPE: &'static str = "CredentialStatusList2017";

    /// `client` should carry the request timeout; lookups are not retried.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StatusBody {
    Object { revoked: bool },
    Bare(bool),
}

#[async_trait]
impl StatusMethod for StatusList2017 {
    async fn check(&self, entry: &CredentialStatusEntry) -> Result<bool, CredentialError> {
        let fail = |reason: String| CredentialError::StatusFetchError {
            url: entry.id.clone(),
            reason,
        };

        let mut response = self
            .client
            .get(&entry.id)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("endpoint returned {}", status)));
        }
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| fail(e.to_string()))? {
            if bytes.len() + chunk.len() > MAX_STATUS_BODY {
                return Err(fail(format!("body exceeds {} bytes", MAX_STATUS_BODY)));
            }
            bytes.extend_from_slice(&chunk);
        }
        let body: StatusBody = serde_json::from_slice(&bytes)
            .map_err(|_| fail(format!("unexpected body: {}", quote(&bytes))))?;

        Ok(match body {
            StatusBody::Object { revoked } | StatusBody::Bare(revoked) => revoked,
        })
    }
}

/// Leading part of a body, for error messages.
fn quote(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    match text.char_indices().nth(MAX_QUOTED_BODY) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.into_owned(),
    }
}

/// Registry of status methods keyed by status type.
#[derive(Default)]
pub struct StatusChecker {
    methods: HashMap<String, Arc<dyn StatusMethod>>,
}

impl StatusChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the method for `status_type`. Each type can be registered once.
    pub fn register(
        &mut self,
        status_type: impl Into<String>,
        method: Arc<dyn StatusMethod>,
    ) -> Result<(), CredentialError> {
        let status_type = status_type.into();
        if self.methods.contains_key(&status_type) {
            return Err(CredentialError::DuplicateStatusMethod(status_type));
        }
        self.methods.insert(status_type, method);
        Ok(())
    }

    /// Look up the revocation status of a credential. Credentials without
    /// `credentialStatus` are never revoked and need no lookup.
    pub async fn check(&self, credential: &VerifiableCredential) -> Result<StatusResult, CredentialError> {
        let Some(entry) = &credential.credential_status else {
            return Ok(StatusResult { revoked: false });
        };
        let method = self
            .methods
            .get(&entry.status_type)
            .ok_or_else(|| CredentialError::UnknownStatusType(entry.status_type.clone()))?;

        let revoked = method.check(entry).await?;
        tracing::debug!(status_type = %entry.status_type, url = %entry.id, revoked, "credential status checked");
        Ok(StatusResult { revoked })
    }
}
