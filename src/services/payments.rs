//! Payment reconciliation.
//!
//! The same real-world payment can reach us through two unsynchronized
//! paths: the client's checkout callback and the processor's webhook.
//! Either may arrive zero, one, or many times, in any order, concurrently.
//! `finalize_payment` guarantees the entitlement side effect happens at most
//! once per payment:
//!
//! 1. take the per-tenant advisory lock (serializes with regenerate and
//!    with other payments for the same tenant)
//! 2. explicit ledger check by payment id: seen before means
//!    `AlreadyProcessed`, a normal success value
//! 3. insert the ledger row; a uniqueness violation from a racing
//!    transaction is downgraded to `AlreadyProcessed` too, and the loser
//!    mutates no keys
//! 4. deactivate all active keys, mint one replacement, commit everything
//!    together
//!
//! Only the transaction that inserted the ledger row ever returns the raw
//! secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{db::DbPool, error::AppError, services::keys};

type HmacSha256 = Hmac<Sha256>;

/// Webhook event types that drive entitlement. Everything else is
/// acknowledged and ignored.
const SUPPORTED_EVENTS: [&str; 2] = ["payment.captured", "order.paid"];

pub fn is_supported_event(event_type: &str) -> bool {
    SUPPORTED_EVENTS.contains(&event_type)
}

/// Outcome of a finalization attempt. `AlreadyProcessed` is success: the
/// payment was handled by an earlier (or concurrent) delivery.
#[derive(Debug)]
pub enum PaymentOutcome {
    Issued { api_key: String },
    AlreadyProcessed,
}

/// Record a payment and rotate the tenant's entitlement, exactly once per
/// payment id.
pub async fn finalize_payment(
    pool: &DbPool,
    tenant_id: &str,
    payment_id: &str,
    order_id: Option<&str>,
    amount: Option<i64>,
    plan: &str,
) -> Result<PaymentOutcome, AppError> {
    let mut tx = pool.begin().await?;
    keys::lock_tenant(&mut tx, tenant_id).await?;

    // Read-before-write idempotency check; the unique constraint below is
    // only the backstop for the remaining race window.
    let seen = sqlx::query_scalar::<_, i32>("SELECT 1 FROM payments WHERE payment_id = $1 LIMIT 1")
        .bind(payment_id)
        .fetch_optional(&mut *tx)
        .await?;

    if seen.is_some() {
        tracing::info!(%payment_id, %tenant_id, "duplicate payment delivery ignored");
        return Ok(PaymentOutcome::AlreadyProcessed);
    }

    let inserted = sqlx::query(
        r#"
        INSERT INTO payments (tenant_id, payment_id, order_id, amount, plan)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(tenant_id)
    .bind(payment_id)
    .bind(order_id)
    .bind(amount)
    .bind(plan)
    .execute(&mut *tx)
    .await;

    if let Err(err) = inserted {
        if is_unique_violation(&err) {
            tracing::info!(%payment_id, "duplicate payment prevented by ledger constraint");
            return Ok(PaymentOutcome::AlreadyProcessed);
        }
        return Err(err.into());
    }

    keys::deactivate_keys(&mut tx, tenant_id).await?;
    let api_key = keys::mint_key(&mut tx, tenant_id, plan, true, None).await?;

    tx.commit().await?;

    tracing::info!(%payment_id, %tenant_id, %plan, "payment finalized, entitlement rotated");
    Ok(PaymentOutcome::Issued { api_key })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Verify the checkout callback signature:
/// HMAC-SHA256(key_secret, "order_id|payment_id"), hex-encoded.
///
/// `Mac::verify_slice` compares in constant time.
pub fn verify_checkout_signature(
    key_secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> bool {
    let Ok(decoded) = hex::decode(signature) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(key_secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    mac.verify_slice(&decoded).is_ok()
}

/// Verify a webhook delivery signature: HMAC-SHA256(secret, raw body),
/// hex-encoded, compared in constant time.
pub fn verify_webhook_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(decoded) = hex::decode(signature) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(body);
    mac.verify_slice(&decoded).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, message: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(message);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn checkout_signature_accepts_genuine_and_rejects_tampered() {
        let signature = sign("secret", b"order_1|pay_1");
        assert!(verify_checkout_signature("secret", "order_1", "pay_1", &signature));
        assert!(!verify_checkout_signature("secret", "order_2", "pay_1", &signature));
        assert!(!verify_checkout_signature("other", "order_1", "pay_1", &signature));
        assert!(!verify_checkout_signature("secret", "order_1", "pay_1", "zz-not-hex"));
    }

    #[test]
    fn webhook_signature_covers_raw_body() {
        let body = br#"{"event":"payment.captured"}"#;
        let signature = sign("whsec", body);
        assert!(verify_webhook_signature("whsec", body, &signature));

        let tampered = br#"{"event":"payment.captured" }"#;
        assert!(!verify_webhook_signature("whsec", tampered, &signature));
    }

    #[test]
    fn event_allow_list() {
        assert!(is_supported_event("payment.captured"));
        assert!(is_supported_event("order.paid"));
        assert!(!is_supported_event("payment.failed"));
        assert!(!is_supported_event("refund.created"));
    }
}
