// SPDX-License-Identifier: MIT

//! Database layer: the `LedgerStore` trait and its backends.

pub mod firestore;
pub mod memory;
pub mod store;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;
pub use store::{ApplyOutcome, AppliedEvent, LedgerEvent, LedgerStore, SkipReason};

/// Collection names as constants.
pub mod collections {
    pub const PROFILES: &str = "profiles";
    pub const CHALLENGES: &str = "challenges";
    pub const PARTICIPANTS: &str = "challenge_participants";
    pub const DAILY_LOGS: &str = "daily_logs";
}
