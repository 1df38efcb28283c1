// SPDX-License-Identifier: MIT

//! Cron/admin authentication for `/tasks/*` routes.
//!
//! These endpoints are invoked by the scheduler (daily scan) and by
//! operators (history repair), never by end users. Callers present the
//! shared secret in an `x-cron-secret` header.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// Require the shared cron secret on `/tasks/*` routes.
pub async fn require_cron_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let presented = request
        .headers()
        .get(CRON_SECRET_HEADER)
        .and_then(|h| h.to_str().ok());

    match presented {
        Some(secret) if secrets_match(secret, &state.config.cron_secret) => {
            Ok(next.run(request).await)
        }
        _ => {
            tracing::warn!("Blocked tasks request with missing or invalid cron secret");
            Err(StatusCode::FORBIDDEN)
        }
    }
}

/// Constant-time string comparison.
fn secrets_match(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a.bytes()
            .zip(b.bytes())
            .fold(0u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secrets_match() {
        assert!(secrets_match("abc123", "abc123"));
        assert!(!secrets_match("abc123", "abc124"));
        assert!(!secrets_match("abc123", "abc12"));
        assert!(!secrets_match("", "abc123"));
        assert!(secrets_match("", ""));
    }
}
