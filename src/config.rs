//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.
//!
//! The deployment mode is resolved exactly once here, at process start, and
//! injected into the rest of the system through shared state. Nothing else
//! reads `DEPLOYMENT_MODE` after startup.

use serde::Deserialize;

/// Deployment mode, fixed for the lifetime of the process.
///
/// - `Local`: offline / self-hosted operation. Authentication is bypassed
///   entirely and the entitlement surface (keys, payments, webhooks) is not
///   mounted.
/// - `Cloud`: multi-tenant operation. Every data-plane request needs an
///   identity token and an API key; payments drive entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Local,
    Cloud,
}

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DEPLOYMENT_MODE` (optional): `local` (default) or `cloud`
/// - `OWNER_TENANT_ID` (optional): namespace used for local-mode data
/// - `FIREBASE_API_KEY` (cloud): identity provider project key
/// - `RAZORPAY_KEY_ID` / `RAZORPAY_KEY_SECRET` (cloud): payment processor
///   credentials; the secret also signs checkout callbacks
/// - `RAZORPAY_WEBHOOK_SECRET` (cloud): shared secret for webhook signatures
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default)]
    pub deployment_mode: Mode,

    pub owner_tenant_id: Option<String>,

    pub firebase_api_key: Option<String>,
    pub razorpay_key_id: Option<String>,
    pub razorpay_key_secret: Option<String>,
    pub razorpay_webhook_secret: Option<String>,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables, deserializes them into a Config
    /// struct, and validates mode-dependent completeness.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    /// - Cloud mode is selected without identity or payment credentials
    /// - Razorpay credentials are only partially configured
    pub fn from_env() -> anyhow::Result<Self> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Parse environment variables into Config struct
        // Field names are automatically converted: database_url -> DATABASE_URL
        let config = envy::from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the selected mode has everything it needs to run.
    ///
    /// A half-configured payment processor is rejected in any mode: either
    /// both halves of the credential pair are present or neither is.
    fn validate(&self) -> anyhow::Result<()> {
        if self.razorpay_key_id.is_some() != self.razorpay_key_secret.is_some() {
            anyhow::bail!(
                "Razorpay partially configured: need both RAZORPAY_KEY_ID and RAZORPAY_KEY_SECRET"
            );
        }

        if self.deployment_mode == Mode::Cloud {
            if self.firebase_api_key.is_none() {
                anyhow::bail!("cloud mode requires FIREBASE_API_KEY");
            }
            if self.razorpay_key_id.is_none() {
                anyhow::bail!("cloud mode requires RAZORPAY_KEY_ID and RAZORPAY_KEY_SECRET");
            }
            if self.razorpay_webhook_secret.is_none() {
                anyhow::bail!("cloud mode requires RAZORPAY_WEBHOOK_SECRET");
            }
        }

        Ok(())
    }

    /// Namespace used by the tenant router when running in local mode.
    pub fn local_tenant_id(&self) -> String {
        self.owner_tenant_id
            .clone()
            .unwrap_or_else(|| "local".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(mode: Mode) -> Config {
        Config {
            database_url: "postgres://localhost/orbmem".to_string(),
            server_port: 3000,
            deployment_mode: mode,
            owner_tenant_id: None,
            firebase_api_key: None,
            razorpay_key_id: None,
            razorpay_key_secret: None,
            razorpay_webhook_secret: None,
        }
    }

    #[test]
    fn local_mode_needs_no_credentials() {
        assert!(base_config(Mode::Local).validate().is_ok());
    }

    #[test]
    fn cloud_mode_requires_identity_and_payment_credentials() {
        let mut config = base_config(Mode::Cloud);
        assert!(config.validate().is_err());

        config.firebase_api_key = Some("fk".to_string());
        config.razorpay_key_id = Some("rzp_test_key".to_string());
        config.razorpay_key_secret = Some("secret".to_string());
        config.razorpay_webhook_secret = Some("whsec".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_razorpay_credentials_are_rejected_even_locally() {
        let mut config = base_config(Mode::Local);
        config.razorpay_key_id = Some("rzp_test_key".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn local_tenant_defaults_when_owner_unset() {
        let mut config = base_config(Mode::Local);
        assert_eq!(config.local_tenant_id(), "local");
        config.owner_tenant_id = Some("owner-1".to_string());
        assert_eq!(config.local_tenant_id(), "owner-1");
    }
}
