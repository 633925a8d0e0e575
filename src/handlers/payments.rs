//! Payment endpoints (cloud mode only).
//!
//! - `POST /v1/payments/create-order` - open a checkout order
//! - `POST /v1/payments/verify` - client-reported checkout result
//!
//! Verify is one of the two delivery paths into the reconciler (the other
//! is the webhook). It never trusts client-supplied amount or plan: after
//! the signature check it re-fetches the authoritative payment from the
//! processor and cross-checks order, tenant, and capture status.

use axum::{Json, extract::State, http::HeaderMap};
use serde_json::{Value, json};

use crate::{
    error::AppError,
    handlers::require_identity,
    models::payment::{CreateOrderRequest, CreateOrderResponse, VerifyPaymentRequest},
    services::payments::{self, PaymentOutcome},
    state::AppState,
};

/// Checkout amounts per plan, in the smallest currency unit (INR paise).
fn plan_amount(plan: &str) -> Option<i64> {
    match plan {
        "monthly" => Some(49_900),
        "yearly" => Some(499_900),
        _ => None,
    }
}

/// Create a checkout order carrying the tenant id and plan as processor
/// metadata, so later delivery paths can attribute the payment without
/// trusting the client.
pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, AppError> {
    let identity = require_identity(&state, &headers).await?;
    let cloud = state.cloud()?;

    let amount = plan_amount(&request.plan)
        .ok_or_else(|| AppError::Validation(format!("Invalid plan: {}", request.plan)))?;

    let order = cloud
        .gateway
        .create_order(amount, "INR", &identity.subject_id, &request.plan)
        .await?;

    Ok(Json(CreateOrderResponse {
        order_id: order.order_id,
        amount: order.amount,
        currency: order.currency,
        razorpay_key: cloud.checkout_key_id.clone(),
    }))
}

/// Verify a client-reported payment and rotate the tenant's entitlement.
///
/// # Flow
///
/// 1. Identity token establishes the caller's tenant id
/// 2. Checkout signature check (constant-time); failure is 401, no state change
/// 3. Authoritative re-fetch from the processor; the reported order id,
///    the payment's tenant note, and the capture status must all line up.
///    A tenant mismatch is treated as a possible cross-tenant replay.
/// 4. Finalize through the idempotency ledger; a replay reports
///    "already processed" as success and never re-issues a secret
pub async fn verify_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let identity = require_identity(&state, &headers).await?;
    let cloud = state.cloud()?;

    if request.razorpay_payment_id.is_empty()
        || request.razorpay_order_id.is_empty()
        || request.razorpay_signature.is_empty()
    {
        return Err(AppError::Validation("Missing payment fields".to_string()));
    }

    if !payments::verify_checkout_signature(
        &cloud.checkout_secret,
        &request.razorpay_order_id,
        &request.razorpay_payment_id,
        &request.razorpay_signature,
    ) {
        tracing::warn!(
            payment_id = %request.razorpay_payment_id,
            "checkout signature verification failed"
        );
        return Err(AppError::SignatureInvalid);
    }

    // Never trust client-reported amount/plan: re-fetch the authoritative
    // payment state from the processor.
    let payment = cloud
        .gateway
        .fetch_payment(&request.razorpay_payment_id)
        .await?;

    if payment.order_id.as_deref() != Some(request.razorpay_order_id.as_str()) {
        return Err(AppError::Validation(
            "Order does not match payment".to_string(),
        ));
    }

    if payment.tenant_id() != Some(identity.subject_id.as_str()) {
        tracing::warn!(
            payment_id = %payment.id,
            tenant_id = %identity.subject_id,
            "payment tenant mismatch on verify"
        );
        return Err(AppError::Unauthorized(
            "Payment does not belong to this user".to_string(),
        ));
    }

    if payment.status.as_deref() != Some("captured") {
        return Err(AppError::Validation("Payment is not captured".to_string()));
    }

    let outcome = payments::finalize_payment(
        &state.pool,
        &identity.subject_id,
        &payment.id,
        payment.order_id.as_deref(),
        payment.amount,
        payment.plan(),
    )
    .await?;

    match outcome {
        PaymentOutcome::Issued { api_key } => Ok(Json(json!({
            "api_key": api_key,
            "message": "Payment successful. API key generated.",
        }))),
        PaymentOutcome::AlreadyProcessed => Ok(Json(json!({
            "status": "already_processed",
            "message": "Payment was already processed.",
        }))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_amounts() {
        assert_eq!(plan_amount("monthly"), Some(49_900));
        assert_eq!(plan_amount("yearly"), Some(499_900));
        assert_eq!(plan_amount("weekly"), None);
    }
}
