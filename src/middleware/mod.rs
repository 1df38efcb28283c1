// SPDX-License-Identifier: MIT

//! HTTP middleware.

pub mod auth;
pub mod cron_auth;
pub mod security;
