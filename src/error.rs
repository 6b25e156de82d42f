// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error taxonomy for the sync engine.
//!
//! Transient conditions (rate limits, network failures) are retried
//! internally and only escalate once a bounded retry budget is exhausted.
//! `NotFound` degrades to "no enrichment available". Only credential failure
//! and total persistence failure are fatal for a run.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limited by provider")]
    RateLimited { retry_after: Option<Duration> },

    #[error("network error: {0}")]
    Network(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("Strava API error: {0}")]
    Api(String),

    #[error("sink write failed: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl SyncError {
    /// True for conditions worth re-attempting after a backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::RateLimited { .. } | SyncError::Network(_))
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, SyncError::Auth(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound(_))
    }

    /// Provider-supplied wait hint from a 429 response, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SyncError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::Network(e.to_string())
    }
}

/// Result type alias used throughout the engine.
pub type Result<T> = std::result::Result<T, SyncError>;
