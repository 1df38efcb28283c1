// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod checkin;
pub mod projection;
pub mod proof;
pub mod push;
pub mod repair;
pub mod scanner;

pub use checkin::{check_in, CheckInClock, CheckInRequest, CheckInResult};
pub use projection::{project_timeline, TimelineRow};
pub use proof::{HttpProofStore, MemoryProofStore, ProofStore};
pub use push::PushService;
pub use repair::{run_repair, RepairReport};
pub use scanner::{run_scan, ScanReport};
