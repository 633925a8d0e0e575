//! API key lifecycle tests against a real database.
//!
//! Each test gets its own database with migrations applied.

use orbmem::error::AppError;
use orbmem::services::keys;
use sqlx::PgPool;

async fn active_key_count(pool: &PgPool, tenant_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM api_keys WHERE tenant_id = $1 AND is_active = TRUE")
        .bind(tenant_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test]
async fn first_key_is_issued_once_then_conflicts(pool: PgPool) {
    let raw = keys::create_first_key(&pool, "u1", "test").await.unwrap();
    assert!(raw.starts_with("orbynt-"));

    // Masked listing exposes only the digest tail
    let hash = keys::hash_api_key(&raw);
    let masked = keys::list_masked_keys(&pool, "u1").await.unwrap();
    assert_eq!(masked.len(), 1);
    assert!(masked[0].key.ends_with(&hash[hash.len() - 4..]));
    assert!(!masked[0].key.contains(&raw["orbynt-".len()..]));

    // Second bootstrap attempt is a business-rule conflict, not a new key
    let err = keys::create_first_key(&pool, "u1", "test")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(active_key_count(&pool, "u1").await, 1);
}

#[sqlx::test]
async fn regenerate_is_destructive_idempotent(pool: PgPool) {
    let first = keys::create_first_key(&pool, "u1", "test").await.unwrap();
    let second = keys::regenerate_key(&pool, "u1").await.unwrap();
    let third = keys::regenerate_key(&pool, "u1").await.unwrap();

    assert_ne!(second, third);
    assert_eq!(active_key_count(&pool, "u1").await, 1);

    // Only the newest key authenticates; earlier ones are dead
    for old in [&first, &second] {
        let record = keys::get_record_by_hash(&pool, &keys::hash_api_key(old))
            .await
            .unwrap()
            .unwrap();
        assert!(!record.is_active);
    }
    let newest = keys::get_record_by_hash(&pool, &keys::hash_api_key(&third))
        .await
        .unwrap()
        .unwrap();
    assert!(newest.is_active);
}

#[sqlx::test]
async fn regenerate_works_for_tenant_with_no_keys(pool: PgPool) {
    let raw = keys::regenerate_key(&pool, "fresh-tenant").await.unwrap();
    assert!(raw.starts_with("orbynt-"));
    assert_eq!(active_key_count(&pool, "fresh-tenant").await, 1);
}

#[sqlx::test]
async fn concurrent_regenerates_keep_one_active_key(pool: PgPool) {
    keys::create_first_key(&pool, "u1", "test").await.unwrap();

    let (a, b, c) = tokio::join!(
        keys::regenerate_key(&pool, "u1"),
        keys::regenerate_key(&pool, "u1"),
        keys::regenerate_key(&pool, "u1"),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();

    assert_eq!(active_key_count(&pool, "u1").await, 1);
}

#[sqlx::test]
async fn tenants_do_not_affect_each_other(pool: PgPool) {
    let u1_key = keys::create_first_key(&pool, "u1", "test").await.unwrap();
    keys::create_first_key(&pool, "u2", "test").await.unwrap();
    keys::regenerate_key(&pool, "u2").await.unwrap();

    // u2's regeneration never touched u1's key
    let record = keys::get_record_by_hash(&pool, &keys::hash_api_key(&u1_key))
        .await
        .unwrap()
        .unwrap();
    assert!(record.is_active);
    assert_eq!(active_key_count(&pool, "u1").await, 1);
    assert_eq!(active_key_count(&pool, "u2").await, 1);
}
