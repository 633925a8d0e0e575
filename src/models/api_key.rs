//! API key model for authentication and entitlement.
//!
//! API keys authenticate tenants making requests to the API. They are stored
//! in the database as SHA-256 hashes; the raw secret is shown exactly once
//! at creation and is never retrievable afterwards.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::services::keys;

/// Represents an API key record from the database.
///
/// # Database Table
///
/// Maps to the `api_keys` table. Records are never deleted; revocation and
/// regeneration flip `is_active` so at most one row per tenant is active at
/// any moment (enforced by a partial unique index).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKeyRecord {
    /// Unique identifier for this API key
    pub id: Uuid,

    /// Identity-provider subject id of the owning tenant
    pub tenant_id: String,

    /// SHA-256 hash of the raw API key (64 hex characters)
    pub key_hash: String,

    /// Whether this API key is currently active
    ///
    /// Inactive keys are rejected during authentication. This provides a way to revoke access without deleting the record.
    pub is_active: bool,

    /// When true, `expires_at` is ignored and the key never expires
    pub is_unlimited: bool,

    /// Expiry timestamp; meaningful only when `is_unlimited` is false
    pub expires_at: Option<DateTime<Utc>>,

    /// Free-form plan label, e.g. "test" or "paid"
    pub plan: String,

    /// Timestamp when this API key was created
    pub created_at: DateTime<Utc>,
}

/// A key as returned by the list endpoint: metadata plus an irreversibly
/// masked secret. Only the last four characters of the stored digest are
/// ever exposed.
#[derive(Debug, Clone, Serialize)]
pub struct MaskedApiKey {
    pub id: Uuid,
    pub key: String,
    pub is_active: bool,
    pub is_unlimited: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub plan: String,
    pub created_at: DateTime<Utc>,
}

impl From<ApiKeyRecord> for MaskedApiKey {
    fn from(record: ApiKeyRecord) -> Self {
        Self {
            id: record.id,
            key: keys::mask_key_hash(&record.key_hash),
            is_active: record.is_active,
            is_unlimited: record.is_unlimited,
            expires_at: record.expires_at,
            plan: record.plan,
            created_at: record.created_at,
        }
    }
}

/// Response for key creation and regeneration. The raw secret appears here
/// and nowhere else.
#[derive(Debug, Serialize)]
pub struct ApiKeyIssuedResponse {
    pub api_key: String,
    pub message: String,
}
