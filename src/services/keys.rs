//! API key lifecycle service.
//!
//! This service owns key generation and the credential store transitions:
//! - **create-first**: mint a key for a tenant that has none (409 otherwise)
//! - **regenerate**: deactivate everything, mint exactly one replacement
//! - **list (masked)**: metadata of the most recent active key, secret redacted
//!
//! # Single-active-key invariant
//!
//! At most one `api_keys` row per tenant may be active at any moment. Every
//! mutation here runs inside one database transaction that first takes a
//! per-tenant advisory lock, so concurrent regenerate/payment-finalize calls
//! for the same tenant serialize instead of interleaving. A partial unique
//! index on `(tenant_id) WHERE is_active` backs the invariant at the
//! database level.

use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::{Postgres, Transaction};

use crate::{db::DbPool, error::AppError, models::api_key::{ApiKeyRecord, MaskedApiKey}};

/// Human-recognizable prefix carried by every raw key.
///
/// The prefix authenticates nothing; it only allows rejecting garbage input
/// before a database lookup.
pub const API_KEY_PREFIX: &str = "orbynt-";

/// Generate a raw API key and its storable digest.
///
/// Raw key = prefix + 32 random bytes hex-encoded (256 bits of entropy).
/// Only the digest is ever persisted.
pub fn generate_api_key() -> (String, String) {
    let token: [u8; 32] = rand::random();
    let raw_key = format!("{API_KEY_PREFIX}{}", hex::encode(token));
    let key_hash = hash_api_key(&raw_key);
    (raw_key, key_hash)
}

/// SHA-256 digest of a raw key, hex-encoded.
pub fn hash_api_key(raw_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Irreversible display form: prefix, a fixed mask, and the last four
/// characters of the stored digest.
pub fn mask_key_hash(key_hash: &str) -> String {
    let tail = &key_hash[key_hash.len().saturating_sub(4)..];
    format!("{API_KEY_PREFIX}********{tail}")
}

/// Serialize all entitlement mutations for one tenant.
///
/// Advisory lock keyed by tenant id, released automatically when the
/// transaction commits or rolls back.
pub(crate) async fn lock_tenant(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
) -> Result<(), AppError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(tenant_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Insert one new active key inside an open transaction and return the raw
/// secret. The caller decides what else commits with it.
pub(crate) async fn mint_key(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    plan: &str,
    is_unlimited: bool,
    duration_days: Option<i64>,
) -> Result<String, AppError> {
    let (raw_key, key_hash) = generate_api_key();

    let expires_at = match (is_unlimited, duration_days) {
        (false, Some(days)) => Some(Utc::now() + Duration::days(days)),
        _ => None,
    };

    sqlx::query(
        r#"
        INSERT INTO api_keys (tenant_id, key_hash, is_active, is_unlimited, expires_at, plan)
        VALUES ($1, $2, TRUE, $3, $4, $5)
        "#,
    )
    .bind(tenant_id)
    .bind(&key_hash)
    .bind(is_unlimited)
    .bind(expires_at)
    .bind(plan)
    .execute(&mut **tx)
    .await?;

    Ok(raw_key)
}

/// Deactivate every active key for a tenant inside an open transaction.
pub(crate) async fn deactivate_keys(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
) -> Result<u64, AppError> {
    let result = sqlx::query(
        "UPDATE api_keys SET is_active = FALSE WHERE tenant_id = $1 AND is_active = TRUE",
    )
    .bind(tenant_id)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected())
}

/// Create the first key for a tenant.
///
/// Intentionally non-idempotent: if an active key already exists the call
/// fails with `Conflict` and regeneration is the designated replacement
/// path.
pub async fn create_first_key(
    pool: &DbPool,
    tenant_id: &str,
    plan: &str,
) -> Result<String, AppError> {
    let mut tx = pool.begin().await?;
    lock_tenant(&mut tx, tenant_id).await?;

    let existing = sqlx::query_scalar::<_, i32>(
        "SELECT 1 FROM api_keys WHERE tenant_id = $1 AND is_active = TRUE LIMIT 1",
    )
    .bind(tenant_id)
    .fetch_optional(&mut *tx)
    .await?;

    if existing.is_some() {
        return Err(AppError::Conflict(
            "API key already exists. Regenerate to create a new one.".to_string(),
        ));
    }

    let raw_key = mint_key(&mut tx, tenant_id, plan, true, None).await?;
    tx.commit().await?;

    Ok(raw_key)
}

/// Deactivate every existing key for the tenant and mint exactly one
/// replacement, as a single atomic unit. A failure anywhere rolls the whole
/// unit back, leaving the tenant's prior state untouched.
pub async fn regenerate_key(pool: &DbPool, tenant_id: &str) -> Result<String, AppError> {
    let mut tx = pool.begin().await?;
    lock_tenant(&mut tx, tenant_id).await?;

    deactivate_keys(&mut tx, tenant_id).await?;
    let raw_key = mint_key(&mut tx, tenant_id, "test", true, None).await?;

    tx.commit().await?;
    Ok(raw_key)
}

/// Metadata of the tenant's most recent active key, secret masked.
///
/// Returns an empty list when the tenant holds no active key.
pub async fn list_masked_keys(
    pool: &DbPool,
    tenant_id: &str,
) -> Result<Vec<MaskedApiKey>, AppError> {
    let records = sqlx::query_as::<_, ApiKeyRecord>(
        r#"
        SELECT id, tenant_id, key_hash, is_active, is_unlimited, expires_at, plan, created_at
        FROM api_keys
        WHERE tenant_id = $1 AND is_active = TRUE
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    Ok(records.into_iter().map(MaskedApiKey::from).collect())
}

/// Look up a key record by digest. Used by the auth gate; flag checks stay
/// with the caller so the rejection reason is precise.
pub async fn get_record_by_hash(
    pool: &DbPool,
    key_hash: &str,
) -> Result<Option<ApiKeyRecord>, AppError> {
    let record = sqlx::query_as::<_, ApiKeyRecord>(
        r#"
        SELECT id, tenant_id, key_hash, is_active, is_unlimited, expires_at, plan, created_at
        FROM api_keys
        WHERE key_hash = $1
        LIMIT 1
        "#,
    )
    .bind(key_hash)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}
