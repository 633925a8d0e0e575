//! Authentication middleware: the single authorization decision per request.
//!
//! # Modes
//!
//! - **Local**: always succeeds with an unlimited context. Returns before a
//!   single header is read; no identity or key is ever required offline.
//! - **Cloud**: requires two independent proofs on every request: a valid
//!   identity token (`X-Firebase-Token`) and a valid, active, non-expired
//!   API key (`Authorization: Bearer <key>`) owned by that identity.
//!
//! # Cloud verification order (strict short-circuit)
//!
//! 1. Both headers present
//! 2. Bearer format
//! 3. Identity verification (establishes the tenant id)
//! 4. Key prefix format (cheap rejection before any lookup)
//! 5. Digest lookup
//! 6. Ownership match
//! 7. Active flag
//! 8. Expiry, skipped entirely for unlimited keys
//!
//! The first failing check decides the 401 reason; nothing after it runs.
//! On success the context is attached to request extensions; on failure the
//! request never reaches a handler.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    config::Mode,
    error::AppError,
    models::api_key::ApiKeyRecord,
    services::keys,
    state::AppState,
};

pub const IDENTITY_HEADER: &str = "X-Firebase-Token";

/// Authorization context attached to authenticated requests.
///
/// Ephemeral and request-scoped: inserted into the request's extension map,
/// consumed by handlers and the usage tracker, never persisted.
#[derive(Debug, Clone)]
pub enum AuthContext {
    /// Offline operation: one implicit tenant, unlimited grant.
    Local { tenant_id: String },
    /// A verified cloud tenant.
    Cloud {
        tenant_id: String,
        email: Option<String>,
        api_key_id: Uuid,
        is_unlimited: bool,
    },
}

impl AuthContext {
    pub fn tenant_id(&self) -> &str {
        match self {
            AuthContext::Local { tenant_id } => tenant_id,
            AuthContext::Cloud { tenant_id, .. } => tenant_id,
        }
    }

    /// The authenticated key id, absent in local mode.
    pub fn api_key_id(&self) -> Option<Uuid> {
        match self {
            AuthContext::Local { .. } => None,
            AuthContext::Cloud { api_key_id, .. } => Some(*api_key_id),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        match self {
            AuthContext::Local { .. } => true,
            AuthContext::Cloud { is_unlimited, .. } => *is_unlimited,
        }
    }
}

/// Authentication middleware function.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let context = match state.mode() {
        // Local mode bypasses everything below; no header is read.
        Mode::Local => AuthContext::Local {
            tenant_id: state.config.local_tenant_id(),
        },
        Mode::Cloud => authenticate_cloud(&state, request.headers()).await?,
    };

    // Handlers and the usage tracker extract this via Extension<AuthContext>
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

async fn authenticate_cloud(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<AuthContext, AppError> {
    let cloud = state.cloud()?;

    // Step 1: both proofs must be present
    let auth_header = headers.get("Authorization").and_then(|h| h.to_str().ok());
    let identity_token = headers.get(IDENTITY_HEADER).and_then(|h| h.to_str().ok());

    let (auth_header, identity_token) = match (auth_header, identity_token) {
        (Some(a), Some(t)) => (a, t),
        _ => {
            return Err(AppError::Unauthorized(
                "Missing Authorization or X-Firebase-Token".to_string(),
            ));
        }
    };

    // Step 2: bearer format
    let raw_key = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or_else(|| {
            AppError::Unauthorized("Invalid Authorization header format".to_string())
        })?;

    // Step 3: identity first; it establishes the tenant id
    let identity = cloud.identity.verify(identity_token).await?;

    // Step 4: cheap format rejection before touching the database
    if !raw_key.starts_with(keys::API_KEY_PREFIX) {
        return Err(AppError::Unauthorized("Invalid API key prefix".to_string()));
    }

    // Step 5: digest lookup
    let key_hash = keys::hash_api_key(raw_key);
    let record = keys::get_record_by_hash(&state.pool, &key_hash)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid API key".to_string()))?;

    // Steps 6-8: ownership, active flag, expiry
    validate_record(&record, &identity.subject_id, Utc::now())?;

    Ok(AuthContext::Cloud {
        tenant_id: identity.subject_id,
        email: identity.email,
        api_key_id: record.id,
        is_unlimited: record.is_unlimited,
    })
}

/// Flag checks on a looked-up key record, in rejection-reason order.
///
/// Expiry is skipped entirely for unlimited keys, even when an expiry
/// timestamp is present on the row.
fn validate_record(
    record: &ApiKeyRecord,
    subject_id: &str,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if record.tenant_id != subject_id {
        return Err(AppError::Unauthorized(
            "API key does not belong to this user".to_string(),
        ));
    }

    if !record.is_active {
        return Err(AppError::Unauthorized("API key is disabled".to_string()));
    }

    if !record.is_unlimited {
        if let Some(expires_at) = record.expires_at {
            if expires_at < now {
                return Err(AppError::Unauthorized("API key expired".to_string()));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(tenant: &str, active: bool, unlimited: bool, expires_in: Option<i64>) -> ApiKeyRecord {
        let now = Utc::now();
        ApiKeyRecord {
            id: Uuid::new_v4(),
            tenant_id: tenant.to_string(),
            key_hash: keys::hash_api_key("orbynt-test"),
            is_active: active,
            is_unlimited: unlimited,
            expires_at: expires_in.map(|days| now + Duration::days(days)),
            plan: "test".to_string(),
            created_at: now,
        }
    }

    fn reason(err: AppError) -> String {
        match err {
            AppError::Unauthorized(msg) => msg,
            other => panic!("expected Unauthorized, got {other:?}"),
        }
    }

    #[test]
    fn ownership_mismatch_rejected_first() {
        // Inactive AND foreign: ownership is the first failing check
        let r = record("someone-else", false, false, Some(-1));
        let err = validate_record(&r, "u1", Utc::now()).unwrap_err();
        assert_eq!(reason(err), "API key does not belong to this user");
    }

    #[test]
    fn disabled_key_rejected() {
        let r = record("u1", false, true, None);
        let err = validate_record(&r, "u1", Utc::now()).unwrap_err();
        assert_eq!(reason(err), "API key is disabled");
    }

    #[test]
    fn expired_key_rejected_unless_unlimited() {
        let expired = record("u1", true, false, Some(-1));
        let err = validate_record(&expired, "u1", Utc::now()).unwrap_err();
        assert_eq!(reason(err), "API key expired");

        // Same expiry timestamp, unlimited flag set: accepted
        let mut unlimited = expired.clone();
        unlimited.is_unlimited = true;
        assert!(validate_record(&unlimited, "u1", Utc::now()).is_ok());
    }

    #[test]
    fn valid_bounded_key_accepted() {
        let r = record("u1", true, false, Some(30));
        assert!(validate_record(&r, "u1", Utc::now()).is_ok());
    }

    #[test]
    fn local_context_is_unlimited_without_key() {
        let ctx = AuthContext::Local {
            tenant_id: "local".to_string(),
        };
        assert!(ctx.is_unlimited());
        assert!(ctx.api_key_id().is_none());
        assert_eq!(ctx.tenant_id(), "local");
    }
}
