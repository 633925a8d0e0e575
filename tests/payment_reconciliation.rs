//! Payment reconciliation tests against a real database.
//!
//! These exercise the exactly-once guarantee with the same payment arriving
//! through multiple delivery paths, sequentially and concurrently.

use orbmem::models::payment::PaymentRecord;
use orbmem::services::keys;
use orbmem::services::payments::{self, PaymentOutcome};
use sqlx::PgPool;

async fn active_key_count(pool: &PgPool, tenant_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM api_keys WHERE tenant_id = $1 AND is_active = TRUE")
        .bind(tenant_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn ledger_count(pool: &PgPool, payment_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE payment_id = $1")
        .bind(payment_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test]
async fn payment_rotates_entitlement_and_replay_is_a_noop(pool: PgPool) {
    // Tenant starts with a bootstrap key
    let first = keys::create_first_key(&pool, "u1", "test").await.unwrap();

    // Client verify path lands first
    let outcome = payments::finalize_payment(
        &pool,
        "u1",
        "PAY123",
        Some("order_1"),
        Some(49_900),
        "monthly",
    )
    .await
    .unwrap();
    let issued = match outcome {
        PaymentOutcome::Issued { api_key } => api_key,
        other => panic!("expected issuance, got {other:?}"),
    };

    // The bootstrap key died with the rotation
    let old = keys::get_record_by_hash(&pool, &keys::hash_api_key(&first))
        .await
        .unwrap()
        .unwrap();
    assert!(!old.is_active);

    // The webhook for the same payment arrives later: acknowledged as
    // already processed, no third key, no second secret
    let replay = payments::finalize_payment(
        &pool,
        "u1",
        "PAY123",
        Some("order_1"),
        Some(49_900),
        "monthly",
    )
    .await
    .unwrap();
    assert!(matches!(replay, PaymentOutcome::AlreadyProcessed));

    assert_eq!(ledger_count(&pool, "PAY123").await, 1);
    assert_eq!(active_key_count(&pool, "u1").await, 1);

    // The ledger row records what the processor reported, not what any
    // client claimed
    let entry = sqlx::query_as::<_, PaymentRecord>(
        "SELECT id, tenant_id, payment_id, order_id, amount, plan, recorded_at
         FROM payments WHERE payment_id = $1",
    )
    .bind("PAY123")
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(entry.tenant_id, "u1");
    assert_eq!(entry.order_id.as_deref(), Some("order_1"));
    assert_eq!(entry.amount, Some(49_900));
    assert_eq!(entry.plan, "monthly");

    let current = keys::get_record_by_hash(&pool, &keys::hash_api_key(&issued))
        .await
        .unwrap()
        .unwrap();
    assert!(current.is_active);
    assert_eq!(current.plan, "monthly");
}

#[sqlx::test]
async fn concurrent_deliveries_of_one_payment_issue_once(pool: PgPool) {
    let (a, b) = tokio::join!(
        payments::finalize_payment(&pool, "u1", "PAY_X", Some("o1"), Some(49_900), "monthly"),
        payments::finalize_payment(&pool, "u1", "PAY_X", Some("o1"), Some(49_900), "monthly"),
    );

    let outcomes = [a.unwrap(), b.unwrap()];
    let issued = outcomes
        .iter()
        .filter(|o| matches!(o, PaymentOutcome::Issued { .. }))
        .count();
    let replays = outcomes
        .iter()
        .filter(|o| matches!(o, PaymentOutcome::AlreadyProcessed))
        .count();

    // Exactly one delivery won; the other observed "already processed"
    assert_eq!(issued, 1);
    assert_eq!(replays, 1);
    assert_eq!(ledger_count(&pool, "PAY_X").await, 1);
    assert_eq!(active_key_count(&pool, "u1").await, 1);
}

#[sqlx::test]
async fn concurrent_distinct_payments_both_record_one_key_survives(pool: PgPool) {
    let (a, b) = tokio::join!(
        payments::finalize_payment(&pool, "u1", "PAY_A", Some("o_a"), Some(49_900), "monthly"),
        payments::finalize_payment(&pool, "u1", "PAY_B", Some("o_b"), Some(499_900), "yearly"),
    );
    a.unwrap();
    b.unwrap();

    // Both payments are in the ledger, and the tenant holds exactly one
    // active key: whichever transaction committed last
    assert_eq!(ledger_count(&pool, "PAY_A").await, 1);
    assert_eq!(ledger_count(&pool, "PAY_B").await, 1);
    assert_eq!(active_key_count(&pool, "u1").await, 1);
}

#[sqlx::test]
async fn payment_and_regenerate_serialize_per_tenant(pool: PgPool) {
    keys::create_first_key(&pool, "u1", "test").await.unwrap();

    let (payment, regen) = tokio::join!(
        payments::finalize_payment(&pool, "u1", "PAY_R", Some("o_r"), Some(49_900), "monthly"),
        keys::regenerate_key(&pool, "u1"),
    );
    payment.unwrap();
    regen.unwrap();

    assert_eq!(active_key_count(&pool, "u1").await, 1);
}

#[sqlx::test]
async fn payments_for_different_tenants_do_not_interfere(pool: PgPool) {
    let (a, b) = tokio::join!(
        payments::finalize_payment(&pool, "u1", "PAY_1", None, Some(49_900), "monthly"),
        payments::finalize_payment(&pool, "u2", "PAY_2", None, Some(49_900), "monthly"),
    );
    assert!(matches!(a.unwrap(), PaymentOutcome::Issued { .. }));
    assert!(matches!(b.unwrap(), PaymentOutcome::Issued { .. }));

    assert_eq!(active_key_count(&pool, "u1").await, 1);
    assert_eq!(active_key_count(&pool, "u2").await, 1);
}
