//! Post-response usage tracking middleware.
//!
//! Runs inside the auth gate, so the authorization context is already in
//! the request extensions. The counter write happens on a detached task
//! after the response is produced; it can never change the outcome of the
//! request it observes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{middleware::auth::AuthContext, services::usage, state::AppState};

pub async fn usage_tracker(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    // Local mode has no key to attribute usage to
    let api_key_id = request
        .extensions()
        .get::<AuthContext>()
        .and_then(AuthContext::api_key_id);

    let response = next.run(request).await;

    if let Some(api_key_id) = api_key_id {
        usage::record_usage(state.pool.clone(), api_key_id);
    }

    response
}
