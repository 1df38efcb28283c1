// SPDX-License-Identifier: MIT

//! Missed-day scanner: the daily batch job.
//!
//! For every active participant of every active challenge, decides
//! whether yesterday was a scheduled day with no completion, and if so
//! applies a miss through the ledger. Deliberately narrow: it only looks
//! at yesterday, never a backlog, which bounds the worst case to one
//! penalty per participant per run.
//!
//! The scanner is re-entrant. The in-loop skip checks are a fast path;
//! the authoritative idempotency guard runs inside the store transaction,
//! so a double-run (or a run racing a manual check-in) cannot
//! double-deduct. One participant's failure never aborts the run.

use crate::dates::CalendarDay;
use crate::db::{ApplyOutcome, LedgerEvent, LedgerStore};
use crate::error::Result;
use crate::models::history;
use crate::models::ledger::MISS_PENALTY;
use crate::services::push::PushService;
use serde::Serialize;

/// Summary of one scanner run.
#[derive(Debug, Default, Serialize)]
pub struct ScanReport {
    pub challenges_scanned: u32,
    pub participants_scanned: u32,
    pub misses_applied: u32,
    pub skipped: u32,
    pub failures: Vec<ScanFailure>,
}

/// One participant the scanner could not process.
#[derive(Debug, Serialize)]
pub struct ScanFailure {
    pub challenge_id: String,
    pub user_id: String,
    pub error: String,
}

/// Run the missed-day scan for `today` (charging misses for yesterday).
pub async fn run_scan<S>(store: &S, push: &PushService, today: CalendarDay) -> Result<ScanReport>
where
    S: LedgerStore + ?Sized,
{
    let yesterday = today.pred();
    let mut report = ScanReport::default();

    let challenges = store.list_active_challenges().await?;

    for challenge in challenges {
        report.challenges_scanned += 1;

        // Yesterday outside the challenge's date range: nobody to charge
        if yesterday < challenge.start_date || yesterday > challenge.end_date {
            tracing::debug!(
                challenge_id = %challenge.challenge_id,
                yesterday = %yesterday,
                "Challenge out of range, skipping"
            );
            continue;
        }
        if challenge.is_rest_day(yesterday) {
            tracing::debug!(
                challenge_id = %challenge.challenge_id,
                yesterday = %yesterday,
                "Rest day, skipping challenge"
            );
            continue;
        }

        let participants = match store.list_participants(&challenge.challenge_id).await {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(
                    challenge_id = %challenge.challenge_id,
                    error = %e,
                    "Failed to list participants, skipping challenge"
                );
                report.failures.push(ScanFailure {
                    challenge_id: challenge.challenge_id.clone(),
                    user_id: String::new(),
                    error: e.to_string(),
                });
                continue;
            }
        };

        for participant in participants {
            report.participants_scanned += 1;

            // Joined after yesterday: nothing was scheduled yet
            if yesterday < participant.joined_date {
                report.skipped += 1;
                continue;
            }
            // Fast-path idempotency check; the transaction re-checks
            if history::has_entry_for(&participant.points_history, yesterday) {
                report.skipped += 1;
                continue;
            }

            let log = match store
                .get_daily_log(&challenge.challenge_id, &participant.user_id, yesterday)
                .await
            {
                Ok(log) => log,
                Err(e) => {
                    record_failure(&mut report, &participant.challenge_id, &participant.user_id, e);
                    continue;
                }
            };
            // Any log, completed or missed, already accounts for the day
            if log.is_some() {
                report.skipped += 1;
                continue;
            }

            let event = LedgerEvent::Miss {
                challenge_id: challenge.challenge_id.clone(),
                user_id: participant.user_id.clone(),
                date: yesterday,
                penalty: MISS_PENALTY,
            };

            match store.apply_event(&event).await {
                Ok(ApplyOutcome::Applied(applied)) => {
                    report.misses_applied += 1;
                    tracing::info!(
                        challenge_id = %challenge.challenge_id,
                        user_id = %participant.user_id,
                        date = %yesterday,
                        points = applied.participant.current_points,
                        "Missed day recorded"
                    );
                    push.notify(
                        &participant.user_id,
                        "Missed a day",
                        &format!(
                            "You missed {} in \"{}\" and lost {} points.",
                            yesterday, challenge.title, MISS_PENALTY
                        ),
                    )
                    .await;
                }
                Ok(ApplyOutcome::Skipped(reason)) => {
                    // Raced a check-in or a concurrent scanner run
                    tracing::debug!(
                        challenge_id = %challenge.challenge_id,
                        user_id = %participant.user_id,
                        ?reason,
                        "Miss skipped by transaction guard"
                    );
                    report.skipped += 1;
                }
                Err(e) => {
                    record_failure(&mut report, &participant.challenge_id, &participant.user_id, e);
                }
            }
        }
    }

    tracing::info!(
        challenges = report.challenges_scanned,
        participants = report.participants_scanned,
        misses = report.misses_applied,
        skipped = report.skipped,
        failures = report.failures.len(),
        "Missed-day scan complete"
    );

    Ok(report)
}

fn record_failure(
    report: &mut ScanReport,
    challenge_id: &str,
    user_id: &str,
    error: crate::error::AppError,
) {
    tracing::error!(
        challenge_id,
        user_id,
        error = %error,
        "Failed to process participant, continuing"
    );
    report.failures.push(ScanFailure {
        challenge_id: challenge_id.to_string(),
        user_id: user_id.to_string(),
        error: error.to_string(),
    });
}
