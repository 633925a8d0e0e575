//! API key management endpoints (cloud mode only).
//!
//! - `POST /v1/api-keys/create` - bootstrap the first key
//! - `POST /v1/api-keys/regenerate` - revoke everything, mint a replacement
//! - `GET  /v1/api-keys/me` - masked metadata of the current key
//!
//! Create and list authenticate with the identity token alone: a tenant
//! bootstrapping its first key cannot present a key yet. Regenerate runs
//! behind the full auth gate.

use axum::{Extension, Json, extract::State, http::HeaderMap};
use serde_json::{Value, json};

use crate::{
    error::AppError,
    handlers::require_identity,
    middleware::auth::AuthContext,
    models::api_key::ApiKeyIssuedResponse,
    services::keys,
    state::AppState,
};

/// Create the first API key for a tenant. Fails with `Conflict` if an
/// active key already exists; regeneration is the replacement path.
///
/// The raw secret appears in this response and is never retrievable again.
pub async fn create_first_key(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiKeyIssuedResponse>, AppError> {
    let identity = require_identity(&state, &headers).await?;

    let api_key = keys::create_first_key(&state.pool, &identity.subject_id, "test").await?;

    Ok(Json(ApiKeyIssuedResponse {
        api_key,
        message: "API key created (shown only once)".to_string(),
    }))
}

/// Revoke all existing keys and mint a new one, atomically.
pub async fn regenerate_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ApiKeyIssuedResponse>, AppError> {
    let api_key = keys::regenerate_key(&state.pool, auth.tenant_id()).await?;

    Ok(Json(ApiKeyIssuedResponse {
        api_key,
        message: "API key regenerated. Old key revoked.".to_string(),
    }))
}

/// Masked metadata of the tenant's current active key. Raw secrets are
/// never returned here.
pub async fn list_my_keys(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let identity = require_identity(&state, &headers).await?;

    let keys = keys::list_masked_keys(&state.pool, &identity.subject_id).await?;

    Ok(Json(json!({ "keys": keys })))
}
