//! HTTP route wiring for the connection broker.
//!
//! Thin plumbing over the coordinator:
//! 1. Host UI calls POST /api/connections/:service/connect
//! 2. Caller redirects the user to the returned authorization URL
//! 3. Provider redirects back to /api/connections/:service/callback
//! 4. Coordinator exchanges the verifier and persists credentials
//! 5. Status/disconnect/test endpoints read and manage the connection

use crate::coordinator::AuthCoordinator;
use crate::error::AuthError;
use crate::service::ServiceName;
use crate::status::ConnectionStatus;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
}

/// Application error for the connection endpoints
enum AppError {
    BadRequest(String),
    Auth(AuthError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AppError::Auth(err) => {
                let status = match &err {
                    AuthError::UnsupportedService(_) => StatusCode::NOT_FOUND,
                    AuthError::InvalidOrExpiredSession => StatusCode::UNAUTHORIZED,
                    AuthError::ProviderUnavailable(_) | AuthError::TokenExchangeFailed(_) => {
                        StatusCode::BAD_GATEWAY
                    }
                    AuthError::Configuration(_)
                    | AuthError::Storage(_)
                    | AuthError::CredentialCorrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.kind(), err.to_string())
            }
        };

        let body = Json(ErrorResponse {
            error: message,
            kind,
        });
        (status, body).into_response()
    }
}

/// Shared state for the connection API
#[derive(Clone)]
pub struct ConnectionAppState {
    pub coordinator: Arc<AuthCoordinator>,
}

#[derive(Deserialize)]
struct PrincipalQuery {
    principal_id: Uuid,
}

#[derive(Deserialize)]
struct ConnectRequest {
    principal_id: Uuid,
    return_url: Option<String>,
}

#[derive(Deserialize)]
struct PrincipalBody {
    principal_id: Uuid,
}

/// Provider callback query parameters
#[derive(Deserialize)]
struct CallbackQuery {
    oauth_token: Option<String>,
    oauth_verifier: Option<String>,
    denied: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConnectResponse {
    auth_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CallbackResponse {
    success: bool,
    principal_id: Uuid,
    service: ServiceName,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DisconnectResponse {
    success: bool,
    service: ServiceName,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TestResponse {
    success: bool,
    service: ServiceName,
    user_id: String,
    username: String,
}

/// One entry of the connections listing: status plus display metadata.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionEntry {
    #[serde(flatten)]
    status: ConnectionStatus,
    display_name: &'static str,
    description: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionsListResponse {
    principal_id: Uuid,
    connections: Vec<ConnectionEntry>,
    last_updated: chrono::DateTime<Utc>,
}

/// Create the connection API router
pub fn create_connection_router(state: ConnectionAppState) -> Router {
    Router::new()
        .route("/api/connections", get(list_connections))
        .route("/api/connections/:service/connect", post(connect))
        .route("/api/connections/:service/callback", get(callback))
        .route("/api/connections/:service/status", get(connection_status))
        .route("/api/connections/:service/disconnect", post(disconnect))
        .route("/api/connections/:service/test", post(test_connection))
        .with_state(Arc::new(state))
}

fn parse_service(raw: &str) -> Result<ServiceName, AppError> {
    raw.parse::<ServiceName>().map_err(AppError::from)
}

/// GET /api/connections
///
/// Status for every supported service, with display metadata for the
/// host's connections panel.
async fn list_connections(
    State(state): State<Arc<ConnectionAppState>>,
    Query(query): Query<PrincipalQuery>,
) -> Result<Json<ConnectionsListResponse>, AppError> {
    let statuses = state.coordinator.list_statuses(query.principal_id)?;

    let connections = statuses
        .into_iter()
        .map(|status| {
            let service = status.service_name;
            ConnectionEntry {
                status,
                display_name: service.display_name(),
                description: service.description(),
            }
        })
        .collect();

    Ok(Json(ConnectionsListResponse {
        principal_id: query.principal_id,
        connections,
        last_updated: Utc::now(),
    }))
}

/// POST /api/connections/:service/connect
///
/// Initiates the OAuth handshake and returns the provider's
/// authorization URL for the caller to redirect the user to.
async fn connect(
    State(state): State<Arc<ConnectionAppState>>,
    Path(service): Path<String>,
    Json(request): Json<ConnectRequest>,
) -> Result<Json<ConnectResponse>, AppError> {
    let service = parse_service(&service)?;
    debug!(service = %service, principal = %request.principal_id, "connect requested");

    let outcome = state
        .coordinator
        .initiate(request.principal_id, service, request.return_url)
        .await?;

    Ok(Json(ConnectResponse {
        auth_url: outcome.authorization_url,
    }))
}

/// GET /api/connections/:service/callback
///
/// Provider redirect target. Completes the handshake; redirects to the
/// session's return URL when one was given, JSON otherwise.
async fn callback(
    State(state): State<Arc<ConnectionAppState>>,
    Path(service): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, AppError> {
    let service = parse_service(&service)?;

    if query.denied.is_some() {
        return Err(AppError::BadRequest(
            "authorization was denied at the provider".to_string(),
        ));
    }

    let oauth_token = query
        .oauth_token
        .ok_or_else(|| AppError::BadRequest("missing 'oauth_token' parameter".to_string()))?;
    let oauth_verifier = query
        .oauth_verifier
        .ok_or_else(|| AppError::BadRequest("missing 'oauth_verifier' parameter".to_string()))?;

    let outcome = state.coordinator.callback(&oauth_token, &oauth_verifier).await?;

    if outcome.service != service {
        return Err(AppError::BadRequest("service name mismatch".to_string()));
    }

    if let Some(return_url) = &outcome.return_url {
        let separator = if return_url.contains('?') { '&' } else { '?' };
        let target = format!(
            "{return_url}{separator}oauth=success&service={}",
            outcome.service
        );
        return Ok(Redirect::temporary(&target).into_response());
    }

    Ok(Json(CallbackResponse {
        success: true,
        principal_id: outcome.principal,
        service: outcome.service,
    })
    .into_response())
}

/// GET /api/connections/:service/status
async fn connection_status(
    State(state): State<Arc<ConnectionAppState>>,
    Path(service): Path<String>,
    Query(query): Query<PrincipalQuery>,
) -> Result<Json<ConnectionStatus>, AppError> {
    let service = parse_service(&service)?;
    let status = state.coordinator.status(query.principal_id, service)?;
    Ok(Json(status))
}

/// POST /api/connections/:service/disconnect
async fn disconnect(
    State(state): State<Arc<ConnectionAppState>>,
    Path(service): Path<String>,
    Json(body): Json<PrincipalBody>,
) -> Result<Json<DisconnectResponse>, AppError> {
    let service = parse_service(&service)?;
    state.coordinator.revoke(body.principal_id, service)?;

    Ok(Json(DisconnectResponse {
        success: true,
        service,
        message: format!("{} connection disconnected", service.display_name()),
    }))
}

/// POST /api/connections/:service/test
///
/// Verifies stored credentials by fetching the account identity.
async fn test_connection(
    State(state): State<Arc<ConnectionAppState>>,
    Path(service): Path<String>,
    Json(body): Json<PrincipalBody>,
) -> Result<Response, AppError> {
    let service = parse_service(&service)?;

    let identity = state
        .coordinator
        .test_connection(body.principal_id, service)
        .await?;

    match identity {
        Some(identity) => Ok(Json(TestResponse {
            success: true,
            service,
            user_id: identity.id,
            username: identity.handle,
        })
        .into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("no credentials stored for {service}"),
                kind: "not_connected",
            }),
        )
            .into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_query_deserialization() {
        let query = "oauth_token=req-tok&oauth_verifier=ver-123";
        let parsed: CallbackQuery = serde_urlencoded::from_str(query).unwrap();
        assert_eq!(parsed.oauth_token.as_deref(), Some("req-tok"));
        assert_eq!(parsed.oauth_verifier.as_deref(), Some("ver-123"));
        assert!(parsed.denied.is_none());

        // User hit "cancel" at the provider
        let query = "denied=req-tok";
        let parsed: CallbackQuery = serde_urlencoded::from_str(query).unwrap();
        assert!(parsed.denied.is_some());
        assert!(parsed.oauth_token.is_none());
    }

    #[test]
    fn test_error_response_serialization() {
        let err = AppError::Auth(AuthError::InvalidOrExpiredSession);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let err = AppError::Auth(AuthError::UnsupportedService("myspace".into()));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let err = AppError::Auth(AuthError::TokenExchangeFailed("boom".into()));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);

        let err = AppError::Auth(AuthError::CredentialCorrupt("rotated".into()));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
