// SPDX-License-Identifier: MIT

//! History repair tool.
//!
//! Scanner double-runs before the transactional guard existed left some
//! histories with duplicate `missed` entries for the same day. This tool
//! scans every participant and profile, drops the duplicates (first
//! occurrence wins), and recomputes the running totals from the repaired
//! history. Best-effort batch semantics: failures are collected, the run
//! continues.

use crate::db::LedgerStore;
use crate::error::Result;
use crate::models::history::{self, PointsEntry};
use crate::models::ledger::MISS_PENALTY;
use serde::Serialize;

/// Summary of one repair run.
#[derive(Debug, Default, Serialize)]
pub struct RepairReport {
    pub participants_scanned: u32,
    pub participants_repaired: u32,
    pub profiles_scanned: u32,
    pub profiles_repaired: u32,
    pub entries_removed: u32,
    pub failures: Vec<String>,
}

/// Repair all participant and profile histories.
pub async fn run_repair<S>(store: &S) -> Result<RepairReport>
where
    S: LedgerStore + ?Sized,
{
    let mut report = RepairReport::default();

    for mut participant in store.list_all_participants().await? {
        report.participants_scanned += 1;

        let Some(repaired) = repair_history(&participant.points_history) else {
            continue;
        };

        participant.current_points = history::corrected_points(&repaired.entries)
            .unwrap_or(participant.current_points);
        participant.points_history = repaired.entries;
        participant.updated_at = chrono::Utc::now().to_rfc3339();

        match store.save_participant(&participant).await {
            Ok(()) => {
                report.participants_repaired += 1;
                report.entries_removed += repaired.removed as u32;
                tracing::info!(
                    challenge_id = %participant.challenge_id,
                    user_id = %participant.user_id,
                    removed = repaired.removed,
                    corrected_points = participant.current_points,
                    "Repaired participant history"
                );
            }
            Err(e) => {
                tracing::error!(
                    challenge_id = %participant.challenge_id,
                    user_id = %participant.user_id,
                    error = %e,
                    "Failed to save repaired participant, continuing"
                );
                report.failures.push(format!(
                    "participant {}/{}: {}",
                    participant.challenge_id, participant.user_id, e
                ));
            }
        }
    }

    for mut profile in store.list_profiles().await? {
        report.profiles_scanned += 1;

        let Some(repaired) = repair_history(&profile.points_history) else {
            continue;
        };

        profile.current_points =
            history::corrected_points(&repaired.entries).unwrap_or(profile.current_points);
        // Each dropped duplicate had charged a full penalty against the
        // lifetime loss counter
        profile.total_lost = (profile.total_lost - repaired.removed as i64 * MISS_PENALTY).max(0);
        profile.points_history = repaired.entries;
        profile.updated_at = chrono::Utc::now().to_rfc3339();

        match store.upsert_profile(&profile).await {
            Ok(()) => {
                report.profiles_repaired += 1;
                report.entries_removed += repaired.removed as u32;
                tracing::info!(
                    user_id = %profile.user_id,
                    removed = repaired.removed,
                    corrected_points = profile.current_points,
                    "Repaired profile history"
                );
            }
            Err(e) => {
                tracing::error!(
                    user_id = %profile.user_id,
                    error = %e,
                    "Failed to save repaired profile, continuing"
                );
                report.failures.push(format!("profile {}: {}", profile.user_id, e));
            }
        }
    }

    tracing::info!(
        participants_repaired = report.participants_repaired,
        profiles_repaired = report.profiles_repaired,
        entries_removed = report.entries_removed,
        failures = report.failures.len(),
        "History repair complete"
    );

    Ok(report)
}

struct RepairedHistory {
    entries: Vec<PointsEntry>,
    removed: usize,
}

/// Dedupe and date-sort a history. None when nothing needed repair.
fn repair_history(entries: &[PointsEntry]) -> Option<RepairedHistory> {
    let result = history::dedupe_missed(entries);
    if result.removed == 0 {
        return None;
    }
    let mut entries = result.entries;
    // Stable sort: entries sharing a date keep their append order
    entries.sort_by_key(|e| e.date);
    Some(RepairedHistory {
        entries,
        removed: result.removed,
    })
}
