//! Tenant isolation: the router that hands out per-tenant handles, and the
//! handle that applies the namespacing discipline to every storage call.

pub mod handle;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::engines::{GraphStore, MemoryStore, SafetyScanner, VectorIndex};

pub use handle::TenantHandle;

/// Maps an authenticated tenant id to its isolated orchestration handle.
///
/// Handles are created lazily on first access and retained for the process
/// lifetime; there is no eviction. The map is guarded by an async mutex so
/// concurrent first access for one previously-unseen tenant constructs
/// exactly one handle (and therefore exactly one namespace root).
///
/// The router is built once at startup and injected through `AppState`;
/// the underlying engines may be shared infrastructure (the vector index in
/// particular is one instance serving every tenant).
pub struct TenantRouter {
    handles: Mutex<HashMap<String, Arc<TenantHandle>>>,
    memory: Arc<dyn MemoryStore>,
    vector: Arc<dyn VectorIndex>,
    graph: Arc<dyn GraphStore>,
    safety: Arc<dyn SafetyScanner>,
}

impl TenantRouter {
    pub fn new(
        memory: Arc<dyn MemoryStore>,
        vector: Arc<dyn VectorIndex>,
        graph: Arc<dyn GraphStore>,
        safety: Arc<dyn SafetyScanner>,
    ) -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
            memory,
            vector,
            graph,
            safety,
        }
    }

    /// Get or create the handle for a tenant.
    ///
    /// Handle construction is cheap (no I/O), so holding the map lock across
    /// it is fine and is what makes first access race-free.
    pub async fn get_handle(&self, tenant_id: &str) -> Arc<TenantHandle> {
        let mut handles = self.handles.lock().await;
        handles
            .entry(tenant_id.to_string())
            .or_insert_with(|| {
                Arc::new(TenantHandle::new(
                    tenant_id.to_string(),
                    Arc::clone(&self.memory),
                    Arc::clone(&self.vector),
                    Arc::clone(&self.graph),
                    Arc::clone(&self.safety),
                ))
            })
            .clone()
    }
}

/// Memory stub so tenant tests need no database.
#[cfg(test)]
pub(crate) mod tests_support {
    use async_trait::async_trait;
    use serde_json::Value;

    use crate::engines::MemoryStore;
    use crate::error::AppError;

    pub(crate) struct NullMemoryStore;

    #[async_trait]
    impl MemoryStore for NullMemoryStore {
        async fn set(
            &self,
            _tenant_id: &str,
            _key: &str,
            _value: &Value,
            _session_id: Option<&str>,
            _ttl_seconds: Option<i64>,
        ) -> Result<(), AppError> {
            Ok(())
        }

        async fn get(&self, _tenant_id: &str, _key: &str) -> Result<Option<Value>, AppError> {
            Ok(None)
        }

        async fn keys(&self, _tenant_id: &str) -> Result<Vec<String>, AppError> {
            Ok(vec![])
        }

        async fn delete(&self, _tenant_id: &str, _key: &str) -> Result<bool, AppError> {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::{
        graph::InMemoryGraphStore, safety::KeywordSafetyScanner, vector::InMemoryVectorIndex,
    };

    fn test_router() -> Arc<TenantRouter> {
        Arc::new(TenantRouter::new(
            Arc::new(tests_support::NullMemoryStore),
            Arc::new(InMemoryVectorIndex::new()),
            Arc::new(InMemoryGraphStore::new()),
            Arc::new(KeywordSafetyScanner::new()),
        ))
    }

    #[tokio::test]
    async fn concurrent_first_access_yields_one_handle() {
        let router = test_router();
        let (a, b, c) = tokio::join!(
            router.get_handle("u1"),
            router.get_handle("u1"),
            router.get_handle("u1"),
        );
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
    }

    #[tokio::test]
    async fn handles_are_cached_and_per_tenant() {
        let router = test_router();
        let first = router.get_handle("u1").await;
        let again = router.get_handle("u1").await;
        let other = router.get_handle("u2").await;
        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
    }
}
