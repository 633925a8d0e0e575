//! Payment ledger model and payment processor wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A finalized payment, recorded exactly once.
///
/// Maps to the `payments` table. `payment_id` is the processor's identifier
/// and carries a UNIQUE constraint: the ledger is the idempotency boundary
/// that deduplicates the verify and webhook delivery paths.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub tenant_id: String,
    pub payment_id: String,
    pub order_id: Option<String>,
    pub amount: Option<i64>,
    pub plan: String,
    pub recorded_at: DateTime<Utc>,
}

/// Request to create a checkout order.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default = "default_plan")]
    pub plan: String,
}

fn default_plan() -> String {
    "monthly".to_string()
}

/// Response for order creation, consumed by the frontend checkout widget.
#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub razorpay_key: String,
}

/// Client-reported checkout result, as posted back by the payment widget.
#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub razorpay_payment_id: String,
    pub razorpay_order_id: String,
    pub razorpay_signature: String,
}

/// A payment entity as reported by the processor, either fetched from its
/// API or embedded in a webhook delivery.
///
/// `notes` is the metadata attached at order creation; the tenant id and
/// plan ride in it.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEntity {
    pub id: String,
    pub order_id: Option<String>,
    pub amount: Option<i64>,
    pub status: Option<String>,
    #[serde(default)]
    pub notes: HashMap<String, String>,
}

impl PaymentEntity {
    pub fn tenant_id(&self) -> Option<&str> {
        self.notes.get("tenant_id").map(String::as_str)
    }

    pub fn plan(&self) -> &str {
        self.notes.get("plan").map_or("paid", String::as_str)
    }
}

/// Webhook delivery envelope.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    pub payment: Option<WebhookPaymentWrapper>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPaymentWrapper {
    pub entity: PaymentEntity,
}
