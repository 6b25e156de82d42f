// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - the sync engine's working parts.

pub mod fetcher;
pub mod strava;
pub mod sync;
pub mod token;

pub use fetcher::{ActivityFetcher, FetcherConfig};
pub use strava::{StravaClient, TokenResponse};
pub use sync::{RunState, RunSummary, SyncOptions, SyncOrchestrator};
pub use token::TokenManager;
