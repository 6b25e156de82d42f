// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Paginated, rate-limit-aware activity fetching.
//!
//! Pagination stops authoritatively on an empty page; a short page is taken
//! as a fast-path stop only after its records are collected. A 429 re-issues
//! the *same* page after the provider's Retry-After hint (or a fixed wait);
//! a 401 mid-fetch re-acquires the access token exactly once, and a second
//! consecutive 401 is fatal.

use crate::error::{Result, SyncError};
use crate::models::{ActivityDetail, ActivitySummary};
use crate::retry::RetryPolicy;
use crate::services::strava::StravaClient;
use crate::services::token::TokenManager;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

/// Pacing and budget knobs for the fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Page size; the provider maximum, to minimize request count.
    pub per_page: u32,
    /// How many 429 responses to tolerate per request before giving up.
    pub max_rate_limit_retries: u32,
    /// Wait after a 429 without a Retry-After hint.
    pub rate_limit_wait: Duration,
    /// Pause between successive detail calls (burst quota).
    pub detail_pause: Duration,
    /// Budget for transient network failures per request.
    pub network_retry: RetryPolicy,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            per_page: 200,
            max_rate_limit_retries: 5,
            rate_limit_wait: Duration::from_secs(60),
            detail_pause: Duration::from_millis(500),
            network_retry: RetryPolicy::default(),
        }
    }
}

/// Fetches activity records under the token manager's credential.
pub struct ActivityFetcher {
    client: StravaClient,
    tokens: TokenManager,
    config: FetcherConfig,
    /// Many activities share the same equipment; one lookup per gear id.
    gear_cache: HashMap<String, Option<String>>,
}

impl ActivityFetcher {
    pub fn new(client: StravaClient, tokens: TokenManager, config: FetcherConfig) -> Self {
        Self {
            client,
            tokens,
            config,
            gear_cache: HashMap::new(),
        }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Acquire a credential up front so auth failures surface before any
    /// list call is attempted.
    pub async fn authenticate(&mut self) -> Result<()> {
        self.tokens.get_access_token().await.map(|_| ())
    }

    /// Fetch all activities with start_date strictly after `after`.
    ///
    /// Restartable: always begins at page 1.
    pub async fn fetch_since(
        &mut self,
        after: Option<DateTime<Utc>>,
    ) -> Result<Vec<ActivitySummary>> {
        let after_ts = after.map(|t| t.timestamp());
        let per_page = self.config.per_page;
        let mut activities = Vec::new();
        let mut page = 1u32;

        loop {
            let batch = self
                .request(|client, token| async move {
                    client
                        .list_activities(&token, after_ts, page, per_page)
                        .await
                })
                .await?;

            tracing::debug!(page, count = batch.len(), "Fetched activity page");

            if batch.is_empty() {
                break;
            }
            let count = batch.len();
            activities.extend(batch);
            if (count as u32) < per_page {
                // Short page: nothing left beyond this one.
                break;
            }
            page += 1;
        }

        tracing::info!(total = activities.len(), "Activity fetch complete");
        Ok(activities)
    }

    /// Fetch the detail record for one activity.
    ///
    /// Returns `Ok(None)` when the record is deleted or inaccessible (404).
    pub async fn fetch_detail(&mut self, activity_id: u64) -> Result<Option<ActivityDetail>> {
        let result = self
            .request(|client, token| async move { client.get_activity(&token, activity_id).await })
            .await;

        match result {
            Ok(detail) => Ok(Some(detail)),
            Err(e) if e.is_not_found() => {
                tracing::debug!(activity_id, "Activity detail not accessible");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve a gear id to its display name, with an in-run cache.
    pub async fn gear_name(&mut self, gear_id: &str) -> Result<Option<String>> {
        if let Some(cached) = self.gear_cache.get(gear_id) {
            return Ok(cached.clone());
        }

        let id = gear_id.to_string();
        let result = self
            .request(move |client, token| {
                let id = id.clone();
                async move { client.get_gear(&token, &id).await }
            })
            .await;

        let name = match result {
            Ok(gear) => Some(gear.name),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        self.gear_cache.insert(gear_id.to_string(), name.clone());
        Ok(name)
    }

    /// Pause applied between successive detail calls.
    pub async fn detail_pause(&self) {
        if !self.config.detail_pause.is_zero() {
            tokio::time::sleep(self.config.detail_pause).await;
        }
    }

    /// Issue one API request with the recovery protocol: bounded same-request
    /// retries for 429 (honoring the provider hint) and transient network
    /// failures, plus a single token re-acquisition on 401.
    async fn request<T, F, Fut>(&mut self, mut call: F) -> Result<T>
    where
        F: FnMut(StravaClient, String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut rate_limit_retries = 0u32;
        let mut network_retries = 0u32;
        let mut reauthorized = false;

        loop {
            let token = self.tokens.get_access_token().await?;
            let err = match call(self.client.clone(), token).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            match &err {
                SyncError::RateLimited { .. } => {
                    if rate_limit_retries >= self.config.max_rate_limit_retries {
                        return Err(err);
                    }
                    rate_limit_retries += 1;
                    let wait = err.retry_after().unwrap_or(self.config.rate_limit_wait);
                    tracing::warn!(
                        wait_ms = wait.as_millis() as u64,
                        retry = rate_limit_retries,
                        "Rate limited, waiting before re-issuing the same request"
                    );
                    tokio::time::sleep(wait).await;
                }
                SyncError::Auth(_) if !reauthorized => {
                    reauthorized = true;
                    tracing::info!("Access token rejected mid-fetch, re-acquiring once");
                    self.tokens.invalidate();
                }
                SyncError::Network(_) => {
                    if network_retries >= self.config.network_retry.max_retries {
                        return Err(err);
                    }
                    network_retries += 1;
                    tokio::time::sleep(self.config.network_retry.delay).await;
                }
                _ => return Err(err),
            }
        }
    }
}
