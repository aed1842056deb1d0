//! HTTP API server for the Tessera node.
//!
//! `GET /` runs the sample issue/status/verify flow on the default
//! identifier; the remaining routes expose the agent operations one by one.

use axum::{
    extract::{Path, RawPathParams, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;

use tessera_core::{
    CredentialPayload, CredentialStatusEntry, Identifier, ServiceEndpoint, VerifiableCredential,
};
use tessera_credentials::{
    Agent, CredentialError, EthereumEip712Signature2021, StatusList2017, StatusResult,
    VerificationResult, DEFAULT_ALIAS,
};
use tessera_identity::{DidDocument, IdentityError};

/// Shared state behind every handler.
pub struct AppState {
    pub agent: Arc<Agent>,
    /// Status endpoint written into the sample credential.
    pub status_url: String,
}

impl AppState {
    pub fn new(agent: Arc<Agent>, status_url: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            agent,
            status_url: status_url.into(),
        })
    }
}

// --- Request / response types ---

#[derive(Debug, Default, Deserialize)]
pub struct CreateIdentifierRequest {
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCredentialRequest {
    pub credential: CredentialPayload,
    /// Alias of the issuing identifier.
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_proof_format")]
    pub proof_format: String,
}

#[derive(Debug, Deserialize)]
pub struct CredentialRequest {
    pub credential: VerifiableCredential,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error kind.
    pub kind: String,
}

fn default_issuer() -> String {
    DEFAULT_ALIAS.into()
}

fn default_proof_format() -> String {
    EthereumEip712Signature2021::TYPE.into()
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

/// HTTP status and kind for each error the agent can return.
pub fn classify(error: &CredentialError) -> (StatusCode, &'static str) {
    match error {
        CredentialError::UnsupportedFormat(_) => (StatusCode::UNPROCESSABLE_ENTITY, "unsupported_format"),
        CredentialError::UnknownStatusType(_) => (StatusCode::FAILED_DEPENDENCY, "unknown_status_type"),
        CredentialError::StatusFetchError { .. } => (StatusCode::SERVICE_UNAVAILABLE, "status_fetch_error"),
        CredentialError::Encoding(_) => (StatusCode::BAD_REQUEST, "encoding"),
        CredentialError::InvalidCredential(_) => (StatusCode::BAD_REQUEST, "invalid_credential"),
        CredentialError::DuplicateProofSuite(_) | CredentialError::DuplicateStatusMethod(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "registry")
        }
        CredentialError::Identity(e) => match e {
            IdentityError::KeyNotFound(_) => (StatusCode::GONE, "key_not_found"),
            IdentityError::DecryptionFailed { .. } => (StatusCode::LOCKED, "decryption_failed"),
            IdentityError::UnsupportedKeyType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_key_type")
            }
            IdentityError::UnsupportedFormat(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "unsupported_format")
            }
            IdentityError::AliasAlreadyExists(_) => (StatusCode::CONFLICT, "alias_already_exists"),
            IdentityError::IdentifierNotFound(_) => (StatusCode::NOT_FOUND, "identifier_not_found"),
            IdentityError::UnknownProvider(_) => (StatusCode::BAD_REQUEST, "unknown_provider"),
            IdentityError::InvalidDid(_) => (StatusCode::BAD_REQUEST, "invalid_did"),
            IdentityError::UnsupportedMethod(_) => (StatusCode::NOT_IMPLEMENTED, "unsupported_method"),
            IdentityError::ResolutionFailed { transient: true, .. } => {
                (StatusCode::GATEWAY_TIMEOUT, "resolution_failed")
            }
            IdentityError::ResolutionFailed { .. } | IdentityError::InvalidDocument(_) => {
                (StatusCode::BAD_GATEWAY, "resolution_failed")
            }
            IdentityError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),
            IdentityError::Crypto(_) => (StatusCode::INTERNAL_SERVER_ERROR, "crypto"),
        },
    }
}

fn error_response(error: CredentialError) -> ApiError {
    let (status, kind) = classify(&error);
    if status.is_server_error() {
        tracing::error!(error = %error, kind, "request failed");
    } else {
        tracing::debug!(error = %error, kind, "request rejected");
    }
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            kind: kind.into(),
        }),
    )
}

/// The credential `GET /` issues with the default identifier.
pub fn sample_payload(status_url: &str) -> CredentialPayload {
    let mut subject = serde_json::Map::new();
    subject.insert("id".into(), json!("did:web:example.com"));
    subject.insert("you".into(), json!("Rock"));
    CredentialPayload {
        credential_type: Vec::new(),
        credential_subject: subject,
        credential_status: Some(CredentialStatusEntry::new(StatusList2017::TYPE, status_url)),
    }
}

// --- Handlers ---

async fn handle_root(State(state): State<Arc<AppState>>) -> ApiResult<Identifier> {
    let agent = &state.agent;
    agent.ensure_default_identifier().await.map_err(error_response)?;

    let credential = agent
        .issue_credential(
            sample_payload(&state.status_url),
            DEFAULT_ALIAS,
            EthereumEip712Signature2021::TYPE,
        )
        .await
        .map_err(error_response)?;
    tracing::info!(credential = ?credential, "sample credential");

    match agent.check_status(&credential).await {
        Ok(status) => tracing::info!(revoked = status.revoked, "sample credential status"),
        Err(e) => tracing::warn!(error = %e, "sample credential status check failed"),
    }
    match agent.verify_credential(&credential).await {
        Ok(result) => tracing::info!(
            signature_valid = result.signature_valid,
            revocation = ?result.revocation,
            "sample credential verified"
        ),
        Err(e) => tracing::warn!(error = %e, "sample credential verification failed"),
    }

    let identifiers = agent.identifiers().await.map_err(error_response)?;
    identifiers.into_iter().next().map(Json).ok_or_else(|| {
        error_response(CredentialError::Identity(IdentityError::IdentifierNotFound(
            DEFAULT_ALIAS.into(),
        )))
    })
}

async fn handle_credential_status() -> Json<StatusResult> {
    Json(StatusResult { revoked: false })
}

async fn handle_list_identifiers(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Identifier>> {
    state.agent.identifiers().await.map(Json).map_err(error_response)
}

async fn handle_create_identifier(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateIdentifierRequest>,
) -> Result<(StatusCode, Json<Identifier>), ApiError> {
    let identifier = state
        .agent
        .create_identifier(req.alias.as_deref(), req.provider.as_deref())
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(identifier)))
}

async fn handle_get_identifier(
    State(state): State<Arc<AppState>>,
    Path(alias): Path<String>,
) -> ApiResult<Identifier> {
    state.agent.identifier(&alias).await.map(Json).map_err(error_response)
}

async fn handle_add_service(
    State(state): State<Arc<AppState>>,
    Path(alias): Path<String>,
    Json(service): Json<ServiceEndpoint>,
) -> ApiResult<Identifier> {
    let identifier = state.agent.identifier(&alias).await.map_err(error_response)?;
    state
        .agent
        .add_service(&identifier.did, service)
        .await
        .map(Json)
        .map_err(error_response)
}

/// The DID is taken as sent, without percent-decoding: `did:web` writes a
/// host port as `%3A` inside the identifier itself.
async fn handle_resolve_did(
    State(state): State<Arc<AppState>>,
    params: RawPathParams,
) -> ApiResult<DidDocument> {
    let did = params
        .iter()
        .find(|(name, _)| *name == "did")
        .map(|(_, value)| value)
        .unwrap_or_default();
    state.agent.resolve_did(did).await.map(Json).map_err(error_response)
}

async fn handle_issue_credential(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IssueCredentialRequest>,
) -> ApiResult<VerifiableCredential> {
    state
        .agent
        .issue_credential(req.credential, &req.issuer, &req.proof_format)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn handle_verify_credential(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialRequest>,
) -> ApiResult<VerificationResult> {
    state
        .agent
        .verify_credential(&req.credential)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn handle_check_status(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialRequest>,
) -> ApiResult<StatusResult> {
    state
        .agent
        .check_status(&req.credential)
        .await
        .map(Json)
        .map_err(error_response)
}

// --- Server ---

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/credentialStatus", get(handle_credential_status))
        .route(
            "/identifiers",
            get(handle_list_identifiers).post(handle_create_identifier),
        )
        .route("/identifiers/{alias}", get(handle_get_identifier))
        .route("/identifiers/{alias}/services", post(handle_add_service))
        .route("/did/{did}", get(handle_resolve_did))
        .route("/credentials/issue", post(handle_issue_credential))
        .route("/credentials/verify", post(handle_verify_credential))
        .route("/credentials/status", post(handle_check_status))
        .with_state(state)
}

pub async fn start_api_server(listen_addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "HTTP API server started");
    axum::serve(listener, app).await?;
    Ok(())
}
