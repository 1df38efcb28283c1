// SPDX-License-Identifier: MIT

//! Challengers: accountability challenges with daily verified check-ins.
//!
//! This crate provides the backend API for the points/streak ledger,
//! the daily missed-day scan, and the challenge membership flows.

pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::LedgerStore;
use services::{ProofStore, PushService};
use std::sync::Arc;

/// Shared application state.
///
/// The store and proof-store are capability interfaces so handlers and
/// batch jobs can be exercised against in-memory backends in tests.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn LedgerStore>,
    pub proofs: Arc<dyn ProofStore>,
    pub push: PushService,
}
