//! Data-plane endpoints: memory, vector, graph, and safety operations.
//!
//! Every handler resolves the authenticated tenant to its orchestration
//! handle first; the handle applies the namespacing discipline, so nothing
//! here touches a storage engine directly.

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{error::AppError, middleware::auth::AuthContext, state::AppState};

// ---- memory ----

#[derive(Debug, Deserialize)]
pub struct MemorySetRequest {
    pub key: String,
    pub value: Value,
    pub session_id: Option<String>,
    pub ttl: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MemoryKeyQuery {
    pub key: String,
}

/// `POST /v1/memory/set`
pub async fn memory_set(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<MemorySetRequest>,
) -> Result<Json<Value>, AppError> {
    if request.key.is_empty() {
        return Err(AppError::Validation("Missing required field: key".to_string()));
    }

    let handle = state.tenants.get_handle(auth.tenant_id()).await;
    handle
        .memory_set(
            &request.key,
            &request.value,
            request.session_id.as_deref(),
            request.ttl,
        )
        .await?;

    Ok(Json(json!({ "status": "ok", "key": request.key })))
}

/// `GET /v1/memory/get?key=`
pub async fn memory_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<MemoryKeyQuery>,
) -> Result<Json<Value>, AppError> {
    let handle = state.tenants.get_handle(auth.tenant_id()).await;
    let value = handle.memory_get(&query.key).await?;

    Ok(Json(json!({ "key": query.key, "value": value })))
}

/// `GET /v1/memory/keys`
pub async fn memory_keys(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    let handle = state.tenants.get_handle(auth.tenant_id()).await;
    let keys = handle.memory_keys().await?;

    Ok(Json(json!({ "keys": keys })))
}

/// `DELETE /v1/memory/delete?key=`
pub async fn memory_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<MemoryKeyQuery>,
) -> Result<Json<Value>, AppError> {
    let handle = state.tenants.get_handle(auth.tenant_id()).await;
    handle.memory_delete(&query.key).await?;

    Ok(Json(json!({ "status": "ok", "deleted": query.key })))
}

// ---- vector ----

#[derive(Debug, Deserialize)]
pub struct VectorAddRequest {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct VectorSearchRequest {
    pub query: String,
    #[serde(default = "default_k")]
    pub k: usize,
}

fn default_k() -> usize {
    5
}

/// `POST /v1/vector/add`
pub async fn vector_add(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<VectorAddRequest>,
) -> Result<Json<Value>, AppError> {
    if request.id.is_empty() || request.text.is_empty() {
        return Err(AppError::Validation("Missing field: id or text".to_string()));
    }

    let handle = state.tenants.get_handle(auth.tenant_id()).await;
    handle.vector_add(&request.text, json!({ "id": request.id }));

    Ok(Json(json!({ "status": "ok", "id": request.id })))
}

/// `POST /v1/vector/search`
pub async fn vector_search(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<VectorSearchRequest>,
) -> Result<Json<Value>, AppError> {
    if request.query.is_empty() {
        return Err(AppError::Validation("Missing field: query".to_string()));
    }

    let handle = state.tenants.get_handle(auth.tenant_id()).await;
    let results = handle.vector_search(&request.query, request.k);

    Ok(Json(json!({ "query": request.query, "results": results })))
}

// ---- graph ----

#[derive(Debug, Deserialize)]
pub struct GraphAddRequest {
    pub node_id: String,
    pub content: String,
    pub parent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GraphPathQuery {
    pub node_a: String,
    pub node_b: String,
}

/// `POST /v1/graph/add_step`
pub async fn graph_add_step(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<GraphAddRequest>,
) -> Result<Json<Value>, AppError> {
    if request.node_id.is_empty() || request.content.is_empty() {
        return Err(AppError::Validation(
            "Missing field: node_id or content".to_string(),
        ));
    }

    let handle = state.tenants.get_handle(auth.tenant_id()).await;
    handle.graph_add(&request.node_id, &request.content, request.parent.as_deref());

    Ok(Json(json!({ "status": "ok", "node": request.node_id })))
}

/// `GET /v1/graph/path?node_a=&node_b=`
pub async fn graph_path(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<GraphPathQuery>,
) -> Result<Json<Value>, AppError> {
    let handle = state.tenants.get_handle(auth.tenant_id()).await;
    let path = handle.graph_path(&query.node_a, &query.node_b);

    Ok(Json(json!({
        "from": query.node_a,
        "to": query.node_b,
        "path": path,
    })))
}

// ---- safety ----

#[derive(Debug, Deserialize)]
pub struct SafetyScanRequest {
    pub text: String,
}

/// `POST /v1/safety/scan`
pub async fn safety_scan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<SafetyScanRequest>,
) -> Result<Json<Value>, AppError> {
    if request.text.is_empty() {
        return Err(AppError::Validation("Missing field: text".to_string()));
    }

    let handle = state.tenants.get_handle(auth.tenant_id()).await;
    let events = handle.safety_scan(&request.text);

    Ok(Json(json!({ "input": request.text, "events": events })))
}

/// `GET /v1/`
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "orbmem API v1 online" }))
}
