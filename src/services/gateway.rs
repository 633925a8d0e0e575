//! Payment processor client.
//!
//! Wraps the processor's REST API behind a trait so the reconciler can be
//! tested against a mock. Two calls matter:
//!
//! - **create_order**: opens a checkout order carrying the tenant id and
//!   plan as metadata, so every later delivery path can attribute the
//!   payment without trusting the client.
//! - **fetch_payment**: re-reads the authoritative payment state. The
//!   verify path never trusts client-supplied amount or plan fields.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::{error::AppError, models::payment::PaymentEntity};

/// An order as returned by the processor.
#[derive(Debug, Clone)]
pub struct GatewayOrder {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
}

/// Boundary to the external payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        tenant_id: &str,
        plan: &str,
    ) -> Result<GatewayOrder, AppError>;

    /// Fetch the authoritative state of a payment by the processor's id.
    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentEntity, AppError>;
}

/// Razorpay REST client with basic-auth credentials.
pub struct RazorpayGateway {
    client: reqwest::Client,
    base_url: Url,
    key_id: String,
    key_secret: String,
}

const DEFAULT_BASE_URL: &str = "https://api.razorpay.com/v1/";

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    amount: i64,
    currency: String,
}

impl RazorpayGateway {
    pub fn new(key_id: String, key_secret: String) -> anyhow::Result<Self> {
        Self::with_base_url(key_id, key_secret, DEFAULT_BASE_URL)
    }

    /// Point the client at a different API root. Used by tests.
    pub fn with_base_url(
        key_id: String,
        key_secret: String,
        base_url: &str,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            key_id,
            key_secret,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|err| AppError::Internal(format!("bad payment endpoint {path}: {err}")))
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        tenant_id: &str,
        plan: &str,
    ) -> Result<GatewayOrder, AppError> {
        let body = json!({
            "amount": amount,
            "currency": currency,
            "receipt": format!("orbmem_{tenant_id}"),
            "notes": {
                "tenant_id": tenant_id,
                "plan": plan,
            }
        });

        let response = self
            .client
            .post(self.endpoint("orders")?)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|err| AppError::Internal(format!("payment provider unreachable: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(%status, "order creation rejected by payment provider");
            return Err(AppError::Internal(format!(
                "payment provider returned {status}"
            )));
        }

        let order: OrderResponse = response
            .json()
            .await
            .map_err(|err| AppError::Internal(format!("malformed order response: {err}")))?;

        Ok(GatewayOrder {
            order_id: order.id,
            amount: order.amount,
            currency: order.currency,
        })
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentEntity, AppError> {
        let response = self
            .client
            .get(self.endpoint(&format!("payments/{payment_id}"))?)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await
            .map_err(|err| AppError::Internal(format!("payment provider unreachable: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(%status, %payment_id, "payment lookup rejected by provider");
            return Err(AppError::Internal(format!(
                "payment provider returned {status}"
            )));
        }

        response
            .json::<PaymentEntity>()
            .await
            .map_err(|err| AppError::Internal(format!("malformed payment response: {err}")))
    }
}
