//! Per-tenant orchestration handle.
//!
//! One handle per tenant, owning references to the shared storage engines
//! and responsible for the namespacing discipline on every read and write
//! path. The backends themselves may be shared across tenants; this handle
//! is the sole isolation mechanism:
//!
//! - memory: tenant id is the scoping column on every operation
//! - vector: payloads are stamped with the tenant id on write and results
//!   are filtered by it on read
//! - graph: node ids are prefixed `"<tenant>:"` going in and the prefix is
//!   stripped coming back out
//! - safety: stateless, nothing to scope

use std::sync::Arc;

use serde_json::Value;

use crate::engines::{GraphStore, MemoryStore, SafetyEvent, SafetyScanner, VectorHit, VectorIndex};
use crate::error::AppError;

pub struct TenantHandle {
    tenant_id: String,
    memory: Arc<dyn MemoryStore>,
    vector: Arc<dyn VectorIndex>,
    graph: Arc<dyn GraphStore>,
    safety: Arc<dyn SafetyScanner>,
}

impl TenantHandle {
    pub(crate) fn new(
        tenant_id: String,
        memory: Arc<dyn MemoryStore>,
        vector: Arc<dyn VectorIndex>,
        graph: Arc<dyn GraphStore>,
        safety: Arc<dyn SafetyScanner>,
    ) -> Self {
        Self {
            tenant_id,
            memory,
            vector,
            graph,
            safety,
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Namespaced form of an identifier for backends that share one keyspace.
    fn ns(&self, id: &str) -> String {
        format!("{}:{}", self.tenant_id, id)
    }

    fn strip_ns(&self, id: &str) -> String {
        id.strip_prefix(&format!("{}:", self.tenant_id))
            .unwrap_or(id)
            .to_string()
    }

    // ---- memory ----

    pub async fn memory_set(
        &self,
        key: &str,
        value: &Value,
        session_id: Option<&str>,
        ttl_seconds: Option<i64>,
    ) -> Result<(), AppError> {
        self.memory
            .set(&self.tenant_id, key, value, session_id, ttl_seconds)
            .await
    }

    pub async fn memory_get(&self, key: &str) -> Result<Option<Value>, AppError> {
        self.memory.get(&self.tenant_id, key).await
    }

    pub async fn memory_keys(&self) -> Result<Vec<String>, AppError> {
        self.memory.keys(&self.tenant_id).await
    }

    pub async fn memory_delete(&self, key: &str) -> Result<bool, AppError> {
        self.memory.delete(&self.tenant_id, key).await
    }

    // ---- vector ----

    /// Stamp the payload with the owning tenant and index the text.
    pub fn vector_add(&self, text: &str, payload: Value) {
        let mut payload = match payload {
            Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        payload.insert(
            "tenant_id".to_string(),
            Value::String(self.tenant_id.clone()),
        );
        self.vector.add(text, Value::Object(payload));
    }

    /// Search the shared index and keep only this tenant's documents.
    pub fn vector_search(&self, query: &str, k: usize) -> Vec<VectorHit> {
        self.vector
            .search(query, k)
            .into_iter()
            .filter(|hit| {
                hit.payload.get("tenant_id").and_then(Value::as_str) == Some(self.tenant_id.as_str())
            })
            .collect()
    }

    // ---- graph ----

    pub fn graph_add(&self, node_id: &str, content: &str, parent: Option<&str>) {
        let parent = parent.map(|p| self.ns(p));
        self.graph
            .add_node(&self.ns(node_id), content, parent.as_deref());
    }

    /// Path between two of this tenant's nodes, with the namespace prefix
    /// stripped from the result.
    pub fn graph_path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        self.graph
            .path(&self.ns(from), &self.ns(to))
            .map(|path| path.iter().map(|id| self.strip_ns(id)).collect())
    }

    // ---- safety ----

    pub fn safety_scan(&self, text: &str) -> Vec<SafetyEvent> {
        self.safety.scan(text)
    }
}
