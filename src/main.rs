// SPDX-License-Identifier: MIT

//! Challengers API Server
//!
//! Backend for the Challengers accountability app: challenge membership,
//! photo/location verified daily check-ins, the points/streak ledger,
//! and the scheduled missed-day scan.

use challengers_api::{
    config::Config,
    db::FirestoreDb,
    services::{HttpProofStore, MemoryProofStore, ProofStore, PushService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Challengers API");

    // Initialize Firestore database
    let store = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Proof image storage; without a bucket URL uploads stay in memory
    // (local development only)
    let proofs: Arc<dyn ProofStore> = match &config.proof_bucket_url {
        Some(url) => {
            tracing::info!(bucket = %url, "Proof store initialized");
            Arc::new(HttpProofStore::new(url, config.proof_bucket_token.clone()))
        }
        None => {
            tracing::warn!("PROOF_BUCKET_URL not set, storing proofs in memory");
            Arc::new(MemoryProofStore::new())
        }
    };

    // Push gateway (disabled when unconfigured)
    let push = PushService::new(
        config.push_gateway_url.clone(),
        config.push_gateway_key.clone(),
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        store: Arc::new(store),
        proofs,
        push,
    });

    // Build router
    let app = challengers_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("challengers_api=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
