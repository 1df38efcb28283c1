// SPDX-License-Identifier: MIT

//! Proof-image storage seam.
//!
//! Check-ins carry a photo as proof. The upload must succeed *before* the
//! ledger is touched: a failed upload leaves points and streaks exactly
//! as they were. The blob store itself is an external collaborator
//! reached over HTTP; tests use the in-memory implementation.

use crate::dates::CalendarDay;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Abstraction over the blob store holding proof images.
#[async_trait]
pub trait ProofStore: Send + Sync {
    /// Store a proof image and return its URL.
    async fn store_proof(
        &self,
        challenge_id: &str,
        user_id: &str,
        date: CalendarDay,
        image: &[u8],
    ) -> Result<String>;
}

/// HTTP-backed blob store client (bucket API with bearer auth).
pub struct HttpProofStore {
    client: reqwest::Client,
    bucket_url: String,
    token: Option<String>,
}

impl HttpProofStore {
    pub fn new(bucket_url: &str, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            bucket_url: bucket_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn object_path(challenge_id: &str, user_id: &str, date: CalendarDay) -> String {
        format!(
            "proofs/{}/{}/{}.jpg",
            urlencoding::encode(challenge_id),
            urlencoding::encode(user_id),
            date
        )
    }
}

#[async_trait]
impl ProofStore for HttpProofStore {
    async fn store_proof(
        &self,
        challenge_id: &str,
        user_id: &str,
        date: CalendarDay,
        image: &[u8],
    ) -> Result<String> {
        let path = Self::object_path(challenge_id, user_id, date);
        let url = format!("{}/{}", self.bucket_url, path);

        let mut request = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(image.to_vec());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Proof upload failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Storage(format!(
                "Proof upload rejected: HTTP {}",
                response.status()
            )));
        }

        tracing::debug!(challenge_id, user_id, date = %date, "Proof uploaded");
        Ok(url)
    }
}

/// In-memory proof store for tests and offline mode.
///
/// Can be told to fail every upload, which is how tests exercise the
/// "no ledger mutation on upload failure" invariant.
#[derive(Default)]
pub struct MemoryProofStore {
    fail_uploads: bool,
    stored: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryProofStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_uploads: true,
            stored: Mutex::new(HashMap::new()),
        }
    }

    pub async fn stored_count(&self) -> usize {
        self.stored.lock().await.len()
    }
}

#[async_trait]
impl ProofStore for MemoryProofStore {
    async fn store_proof(
        &self,
        challenge_id: &str,
        user_id: &str,
        date: CalendarDay,
        image: &[u8],
    ) -> Result<String> {
        if self.fail_uploads {
            return Err(AppError::Storage("Simulated upload failure".to_string()));
        }
        let path = HttpProofStore::object_path(challenge_id, user_id, date);
        self.stored
            .lock()
            .await
            .insert(path.clone(), image.to_vec());
        Ok(format!("memory://{}", path))
    }
}
