//! Shared application state.
//!
//! Everything a handler needs is injected here once at startup: the pool,
//! the resolved configuration (including the deployment mode), the tenant
//! router, and, in cloud mode, the identity and payment provider clients.

use std::sync::Arc;

use crate::{
    config::{Config, Mode},
    db::DbPool,
    error::AppError,
    services::{
        gateway::{PaymentGateway, RazorpayGateway},
        identity::{FirebaseVerifier, IdentityVerifier},
    },
    tenant::TenantRouter,
};

/// Provider clients and secrets that only exist in cloud mode.
pub struct CloudServices {
    pub identity: Arc<dyn IdentityVerifier>,
    pub gateway: Arc<dyn PaymentGateway>,

    /// Public key id handed to the frontend checkout widget.
    pub checkout_key_id: String,
    /// Shared secret that signs checkout callbacks.
    pub checkout_secret: String,
    /// Shared secret that signs webhook deliveries.
    pub webhook_secret: String,
}

impl CloudServices {
    /// Build the cloud provider clients from a validated cloud-mode config.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let firebase_api_key = config
            .firebase_api_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("FIREBASE_API_KEY missing"))?;
        let key_id = config
            .razorpay_key_id
            .clone()
            .ok_or_else(|| anyhow::anyhow!("RAZORPAY_KEY_ID missing"))?;
        let key_secret = config
            .razorpay_key_secret
            .clone()
            .ok_or_else(|| anyhow::anyhow!("RAZORPAY_KEY_SECRET missing"))?;
        let webhook_secret = config
            .razorpay_webhook_secret
            .clone()
            .ok_or_else(|| anyhow::anyhow!("RAZORPAY_WEBHOOK_SECRET missing"))?;

        let identity = FirebaseVerifier::new(firebase_api_key)?;
        let gateway = RazorpayGateway::new(key_id.clone(), key_secret.clone())?;

        Ok(Self {
            identity: Arc::new(identity),
            gateway: Arc::new(gateway),
            checkout_key_id: key_id,
            checkout_secret: key_secret,
            webhook_secret,
        })
    }
}

/// State shared with every handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub tenants: Arc<TenantRouter>,
    pub cloud: Option<Arc<CloudServices>>,
}

impl AppState {
    /// Cloud provider services, present only when `deployment_mode = cloud`.
    ///
    /// Routes that need these are only mounted in cloud mode, so a miss here
    /// is a wiring bug rather than a client error.
    pub fn cloud(&self) -> Result<&CloudServices, AppError> {
        self.cloud
            .as_deref()
            .ok_or_else(|| AppError::Internal("cloud services are not configured".to_string()))
    }

    pub fn mode(&self) -> Mode {
        self.config.deployment_mode
    }
}
