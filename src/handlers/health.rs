//! Health check endpoint.

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::{config::Mode, state::AppState};

/// `GET /health` - liveness probe, reports the deployment mode.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let mode = match state.mode() {
        Mode::Local => "local",
        Mode::Cloud => "cloud",
    };

    Json(json!({
        "status": "ok",
        "service": "orbmem-api",
        "mode": mode,
    }))
}
