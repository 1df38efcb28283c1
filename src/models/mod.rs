// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod challenge;
pub mod daily_log;
pub mod history;
pub mod ledger;
pub mod participant;
pub mod profile;

pub use challenge::{Challenge, ChallengeStatus, GeoFence};
pub use daily_log::{DailyLog, GeoPoint, LogStatus};
pub use history::{PointsEntry, TaskStatus};
pub use participant::ChallengeParticipant;
pub use profile::Profile;
