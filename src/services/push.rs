// SPDX-License-Identifier: MIT

//! Push-notification gateway client.
//!
//! Best-effort only: a failed push is logged and never fails the
//! operation that triggered it. Unconfigured (no gateway URL) means
//! notifications are silently dropped, which is the test and offline
//! default.

use serde::Serialize;

#[derive(Serialize)]
struct PushMessage<'a> {
    to: &'a str,
    title: &'a str,
    body: &'a str,
}

/// Client for the external push gateway.
#[derive(Clone)]
pub struct PushService {
    client: reqwest::Client,
    gateway_url: Option<String>,
    server_key: Option<String>,
}

impl PushService {
    pub fn new(gateway_url: Option<String>, server_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            gateway_url,
            server_key,
        }
    }

    /// Disabled client (tests, offline mode).
    pub fn disabled() -> Self {
        Self::new(None, None)
    }

    /// Send a notification to a user. Never fails the caller.
    pub async fn notify(&self, user_id: &str, title: &str, body: &str) {
        let Some(url) = &self.gateway_url else {
            tracing::debug!(user_id, title, "Push gateway disabled, dropping notification");
            return;
        };

        let message = PushMessage {
            to: user_id,
            title,
            body,
        };

        let mut request = self.client.post(url).json(&message);
        if let Some(key) = &self.server_key {
            request = request.bearer_auth(key);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(user_id, title, "Push notification sent");
            }
            Ok(response) => {
                tracing::warn!(
                    user_id,
                    status = %response.status(),
                    "Push gateway rejected notification"
                );
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Push notification failed");
            }
        }
    }
}
