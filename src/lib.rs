// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! strava-sync: incremental Strava activity sync engine.
//!
//! Pulls an athlete's activity history from the Strava v3 API and persists
//! it to an upsert-capable store and flat-file backups, without duplicates,
//! surviving token rotation, rate limits, and transient network failures.

pub mod config;
pub mod error;
pub mod models;
pub mod retry;
pub mod services;
pub mod sinks;
pub mod store;

pub use config::Config;
pub use error::{Result, SyncError};
