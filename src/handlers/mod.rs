//! HTTP request handlers.

pub mod api_keys;
pub mod cognitive;
pub mod health;
pub mod payments;
pub mod webhooks;

use axum::http::HeaderMap;

use crate::{
    error::AppError,
    middleware::auth::IDENTITY_HEADER,
    services::identity::Identity,
    state::AppState,
};

/// Verify the identity token on routes that authenticate with identity
/// alone (key bootstrap, payments): a key may not exist yet, so the full
/// auth gate cannot apply.
pub(crate) async fn require_identity(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Identity, AppError> {
    let token = headers
        .get(IDENTITY_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing X-Firebase-Token".to_string()))?;

    state.cloud()?.identity.verify(token).await
}
