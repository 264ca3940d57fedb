//! Admin request handlers
//!
//! Two operator endpoints, both guarded by the shared secret in the `Auth`
//! header:
//!
//! - `POST /adduser` provisions or replaces a tenant account
//! - `GET /info` lists every tenant as newline-delimited JSON

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use thiserror::Error;

use tg_core::error::RegistryError;
use tg_core::secret::secrets_match;
use tg_core::types::RegisterRequest;

use crate::state::GatewayState;

/// Header carrying the operator secret
pub const AUTH_HEADER: &str = "auth";

/// Errors returned by admin handlers
#[derive(Error, Debug)]
pub enum AdminError {
    /// Missing or wrong operator secret, or no secret configured
    #[error("not allowed")]
    NotAllowed,

    /// Request body could not be parsed
    #[error("malformed account: {0}")]
    BadRequest(#[from] serde_json::Error),

    /// Provisioning failed
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl AdminError {
    fn status(&self) -> StatusCode {
        match self {
            AdminError::Registry(e) if !e.is_client_error() => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        tracing::warn!("Admin request failed ({}): {}", status.as_u16(), message);
        (status, Json(json!({ "code": "error", "message": message }))).into_response()
    }
}

/// Build the admin router
pub fn admin_routes(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/adduser", post(add_user))
        .route("/info", get(show_info))
        .with_state(state)
}

/// Check the operator secret. Fails closed when none is configured.
fn authorize(state: &GatewayState, headers: &HeaderMap) -> Result<(), AdminError> {
    let expected = state.config.admin_secret().ok_or(AdminError::NotAllowed)?;
    let provided = headers
        .get(AUTH_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AdminError::NotAllowed)?;

    if secrets_match(provided, expected) {
        Ok(())
    } else {
        Err(AdminError::NotAllowed)
    }
}

/// Provision or replace a tenant
async fn add_user(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AdminError> {
    authorize(&state, &headers)?;

    let request: RegisterRequest = serde_json::from_slice(&body)?;

    tracing::info!(
        "Provisioning tenant {} ({} tunnels)",
        request.tenant_id,
        request.tunnels.len()
    );
    state.registry.register(request).await?;

    Ok(Json(json!({ "code": "ok" })))
}

/// List every tenant, one JSON record per line
async fn show_info(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AdminError> {
    authorize(&state, &headers)?;

    let mut body = String::new();
    for line in state.registry.list_all().await {
        body.push_str(&line);
        body.push('\n');
    }

    Ok(([(header::CONTENT_TYPE, "application/x-ndjson")], body))
}
