//! Identity assertion verification.
//!
//! Cloud-mode requests carry an identity-provider bearer token that is
//! verified out-of-process. The verifier is stateless and holds no local
//! persistence; it is a trait so the auth gate can be tested against a mock.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AppError;

/// A verified identity assertion.
#[derive(Debug, Clone)]
pub struct Identity {
    /// The identity provider's subject id; doubles as the tenant id.
    pub subject_id: String,
    pub email: Option<String>,
}

/// Verifies an opaque bearer token against a trusted identity provider.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Returns the verified identity or `Unauthorized` for any invalid,
    /// expired, or unverifiable token.
    async fn verify(&self, token: &str) -> Result<Identity, AppError>;
}

/// Firebase ID token verifier.
///
/// Delegates verification to the Identity Toolkit `accounts:lookup`
/// endpoint rather than validating JWTs locally, so key rotation and
/// revocation stay the provider's problem.
pub struct FirebaseVerifier {
    client: reqwest::Client,
    api_key: String,
}

const LOOKUP_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:lookup";

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
struct LookupUser {
    #[serde(rename = "localId")]
    local_id: String,
    email: Option<String>,
}

impl FirebaseVerifier {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self { client, api_key })
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AppError> {
        let response = self
            .client
            .post(format!("{LOOKUP_URL}?key={}", self.api_key))
            .json(&serde_json::json!({ "idToken": token }))
            .send()
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "identity provider unreachable");
                AppError::Unauthorized("Invalid identity token".to_string())
            })?;

        if !response.status().is_success() {
            return Err(AppError::Unauthorized("Invalid identity token".to_string()));
        }

        let lookup: LookupResponse = response.json().await.map_err(|err| {
            tracing::warn!(error = %err, "identity provider returned malformed response");
            AppError::Unauthorized("Invalid identity token".to_string())
        })?;

        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Unauthorized("Invalid identity token".to_string()))?;

        Ok(Identity {
            subject_id: user.local_id,
            email: user.email,
        })
    }
}
