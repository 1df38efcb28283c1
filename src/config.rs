// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Shared secret the cron scheduler and admin tooling present on
    /// `/tasks/*` requests
    pub cron_secret: String,
    /// Base URL of the blob store bucket proof images are uploaded to.
    /// None disables uploads (tests, offline development).
    pub proof_bucket_url: Option<String>,
    /// Bearer token for the blob store
    pub proof_bucket_token: Option<String>,
    /// URL of the push-notification gateway. None disables pushes.
    pub push_gateway_url: Option<String>,
    /// Server key for the push gateway
    pub push_gateway_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            cron_secret: env::var("CRON_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("CRON_SECRET"))?,
            proof_bucket_url: env::var("PROOF_BUCKET_URL").ok(),
            proof_bucket_token: env::var("PROOF_BUCKET_TOKEN").ok(),
            push_gateway_url: env::var("PUSH_GATEWAY_URL").ok(),
            push_gateway_key: env::var("PUSH_GATEWAY_KEY").ok(),
        })
    }

    /// Default config for tests.
    pub fn test_default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            frontend_url: "http://localhost:3000".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            cron_secret: "test_cron_secret".to_string(),
            proof_bucket_url: None,
            proof_bucket_token: None,
            push_gateway_url: None,
            push_gateway_key: None,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
