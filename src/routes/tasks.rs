// SPDX-License-Identifier: MIT

//! Task routes: the daily missed-day scan and the one-off history
//! repair. Called by the cron scheduler and by operators, never by end
//! users; both are behind the cron-secret middleware (see routes/mod.rs).
//!
//! Both operations are re-entrant: re-running them cannot double-charge
//! a day or re-remove an entry, so a retry after a partial failure is
//! always safe.

use crate::dates::CalendarDay;
use crate::error::Result;
use crate::services::repair::{run_repair, RepairReport};
use crate::services::scanner::{run_scan, ScanReport};
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use std::sync::Arc;

/// Task handler routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tasks/scan-missed", post(scan_missed))
        .route("/tasks/repair-history", post(repair_history))
}

/// Run the daily missed-day scan.
///
/// Partial failures are reported in the body, not as an error status:
/// the run itself completed and is safe to re-invoke.
async fn scan_missed(State(state): State<Arc<AppState>>) -> Result<Json<ScanReport>> {
    let report = run_scan(state.store.as_ref(), &state.push, CalendarDay::today()).await?;
    Ok(Json(report))
}

/// Scan all histories for duplicate missed entries and repair them.
async fn repair_history(State(state): State<Arc<AppState>>) -> Result<Json<RepairReport>> {
    let report = run_repair(state.store.as_ref()).await?;
    Ok(Json(report))
}
