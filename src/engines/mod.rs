//! Storage-engine adapters.
//!
//! The cognitive database is four narrow contracts: key-value memory,
//! vector similarity, graph traversal, and safety scanning. Backends are
//! swappable adapters behind these traits; the tenant layer supplies the
//! scoping, the engines just store and retrieve.

pub mod graph;
pub mod memory;
pub mod safety;
pub mod vector;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;

/// Tenant-scoped key-value memory with optional expiry.
///
/// The tenant id is an explicit scoping column: every operation is bounded
/// to one tenant's rows.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn set(
        &self,
        tenant_id: &str,
        key: &str,
        value: &Value,
        session_id: Option<&str>,
        ttl_seconds: Option<i64>,
    ) -> Result<(), AppError>;

    async fn get(&self, tenant_id: &str, key: &str) -> Result<Option<Value>, AppError>;

    async fn keys(&self, tenant_id: &str) -> Result<Vec<String>, AppError>;

    /// Returns true when a row was actually removed.
    async fn delete(&self, tenant_id: &str, key: &str) -> Result<bool, AppError>;
}

/// A ranked similarity hit.
#[derive(Debug, Clone, Serialize)]
pub struct VectorHit {
    pub score: f32,
    pub text: String,
    pub payload: Value,
}

/// Similarity index. One instance may be shared by every tenant; isolation
/// is the caller's payload-tagging discipline, not the index's concern.
pub trait VectorIndex: Send + Sync {
    fn add(&self, text: &str, payload: Value);

    /// Top-k hits for the query, best first.
    fn search(&self, query: &str, k: usize) -> Vec<VectorHit>;
}

/// Reasoning-step graph: nodes with content, optional parent edges, and
/// shortest-path lookup.
pub trait GraphStore: Send + Sync {
    fn add_node(&self, id: &str, content: &str, parent: Option<&str>);

    /// Shortest path between two nodes, or None when unconnected/unknown.
    fn path(&self, from: &str, to: &str) -> Option<Vec<String>>;
}

/// A classified safety finding inside scanned text.
#[derive(Debug, Clone, Serialize)]
pub struct SafetyEvent {
    /// The matched fragment
    pub text: String,
    pub tag: String,
    pub severity: u8,
    pub correction: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Stateless text classifier for safety events.
pub trait SafetyScanner: Send + Sync {
    fn scan(&self, text: &str) -> Vec<SafetyEvent>;
}
