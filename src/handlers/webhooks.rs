//! Inbound payment processor webhook (cloud mode only).
//!
//! `POST /v1/webhooks/razorpay` - the asynchronous delivery path into the
//! payment reconciler. Deliveries are at-least-once and unordered, and may
//! race the client's verify call for the same payment; the ledger inside
//! `finalize_payment` makes the outcome exactly-once.
//!
//! # Response policy
//!
//! The processor retries anything that does not come back 2xx, so:
//! - unsupported event types are acknowledged and ignored
//! - malformed payloads (missing payment id or tenant id) are logged and
//!   acknowledged, never retried into a storm
//! - genuine internal failures return 500 so the delivery IS retried
//!
//! The raw secret minted here is discarded: the webhook has no user to
//! return it to, and no caller may ever see a secret twice.

use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use serde_json::{Value, json};

use crate::{
    error::AppError,
    models::payment::WebhookEvent,
    services::payments::{self, PaymentOutcome},
    state::AppState,
};

const SIGNATURE_HEADER: &str = "X-Razorpay-Signature";
const EVENT_ID_HEADER: &str = "X-Razorpay-Event-Id";

pub async fn razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let cloud = state.cloud()?;

    let event_id = headers
        .get(EVENT_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown");

    // Signature over the raw body, before any parsing
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!(%event_id, "webhook rejected: missing signature");
            AppError::Validation("Missing signature".to_string())
        })?;

    if !payments::verify_webhook_signature(&cloud.webhook_secret, &body, signature) {
        tracing::warn!(%event_id, "invalid webhook signature");
        return Err(AppError::SignatureInvalid);
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|_| AppError::Validation("Invalid JSON payload".to_string()))?;

    // Allow-list: everything else is acknowledged without side effects
    if !payments::is_supported_event(&event.event) {
        tracing::info!(event = %event.event, %event_id, "webhook event ignored");
        return Ok(Json(json!({ "status": "ignored" })));
    }

    let Some(payment) = event.payload.payment.map(|p| p.entity) else {
        tracing::error!(%event_id, "webhook missing payment entity");
        return Ok(Json(json!({
            "status": "error",
            "message": "Missing payment metadata",
        })));
    };

    // Malformed notifications are acknowledged, not raised: a 4xx/5xx here
    // would put the processor's redelivery loop into a storm.
    let Some(tenant_id) = payment.tenant_id().map(str::to_string) else {
        tracing::error!(%event_id, payment_id = %payment.id, "webhook missing tenant metadata");
        return Ok(Json(json!({
            "status": "error",
            "message": "Missing payment metadata",
        })));
    };

    let outcome = payments::finalize_payment(
        &state.pool,
        &tenant_id,
        &payment.id,
        payment.order_id.as_deref(),
        payment.amount,
        payment.plan(),
    )
    .await?;

    match outcome {
        PaymentOutcome::Issued { .. } => {
            tracing::info!(
                payment_id = %payment.id,
                %tenant_id,
                event = %event.event,
                "webhook processed"
            );
            Ok(Json(json!({ "status": "success" })))
        }
        PaymentOutcome::AlreadyProcessed => {
            Ok(Json(json!({ "status": "already_processed" })))
        }
    }
}
