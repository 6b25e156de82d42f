// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Top-level sync control loop.
//!
//! One run: acquire credential, determine the fetch watermark from the
//! sinks' durable state, fetch, enrich, merge, persist, report. A run that
//! fetched zero new records still completes as a successful no-op. Sink
//! failures are independent; the run only fails when every sink fails.

use crate::error::{Result, SyncError};
use crate::models::{ActivityDetail, ActivityRecord, ActivitySummary};
use crate::services::fetcher::ActivityFetcher;
use crate::sinks::Sink;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};

/// Run lifecycle, in order. `Failed` is reachable from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    AuthAcquired,
    Fetching,
    Merging,
    Persisting,
    Done,
    Failed,
}

/// What a run did, for reporting.
#[derive(Debug)]
pub struct RunSummary {
    /// Records returned by the provider.
    pub fetched: usize,
    /// Records written, per sink.
    pub written: Vec<(String, usize)>,
    /// Sink failures encountered (sink name, error).
    pub sink_errors: Vec<(String, String)>,
    /// Watermark after this run.
    pub watermark: Option<DateTime<Utc>>,
}

/// Options for one orchestrated run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Lookback window when no sink has a watermark yet.
    pub lookback_days: i64,
    /// Enrich each activity with a per-record detail call.
    pub fetch_details: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            fetch_details: false,
        }
    }
}

pub struct SyncOrchestrator {
    fetcher: ActivityFetcher,
    sinks: Vec<Box<dyn Sink>>,
    options: SyncOptions,
    state: RunState,
}

impl SyncOrchestrator {
    pub fn new(fetcher: ActivityFetcher, sinks: Vec<Box<dyn Sink>>, options: SyncOptions) -> Self {
        Self {
            fetcher,
            sinks,
            options,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!(from = ?self.state, to = ?next, "Run state transition");
        self.state = next;
    }

    /// Execute one full sync run.
    pub async fn run(&mut self) -> Result<RunSummary> {
        match self.run_inner().await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                self.transition(RunState::Failed);
                Err(e)
            }
        }
    }

    async fn run_inner(&mut self) -> Result<RunSummary> {
        // Credential first; an auth failure aborts before any fetch.
        self.fetcher.authenticate().await?;
        self.transition(RunState::AuthAcquired);

        // Watermark and dedup state come from the sinks' durable content.
        let watermark = self.load_watermark().await;
        let after = watermark
            .unwrap_or_else(|| Utc::now() - Duration::days(self.options.lookback_days));
        tracing::info!(after = %after, "Sync window determined");

        self.transition(RunState::Fetching);
        let summaries = self.fetcher.fetch_since(Some(after)).await?;
        let fetched = summaries.len();

        let details = if self.options.fetch_details {
            self.fetch_details(&summaries).await?
        } else {
            HashMap::new()
        };
        let gear_names = self.resolve_gear(&summaries).await?;

        self.transition(RunState::Merging);
        let records = merge_records(summaries, &details, &gear_names);
        let new_watermark = advance_watermark(watermark, &records);

        // Always proceed; an empty result set is a valid no-op run.
        self.transition(RunState::Persisting);
        let mut written = Vec::new();
        let mut sink_errors = Vec::new();
        for sink in &self.sinks {
            match sink.write(&records).await {
                Ok(count) => written.push((sink.name().to_string(), count)),
                Err(e) => {
                    tracing::error!(sink = sink.name(), error = %e, "Sink write failed");
                    sink_errors.push((sink.name().to_string(), e.to_string()));
                }
            }
        }

        if !self.sinks.is_empty() && written.is_empty() {
            return Err(SyncError::Storage(format!(
                "all {} sinks failed",
                self.sinks.len()
            )));
        }

        self.transition(RunState::Done);
        Ok(RunSummary {
            fetched,
            written,
            sink_errors,
            watermark: new_watermark,
        })
    }

    /// The fetch bound: the minimum watermark across sinks, so no sink
    /// misses records another sink already has. A sink whose state cannot
    /// be read is treated as having none; its write failure, if the sink is
    /// really down, is collected later without blocking the other sinks.
    async fn load_watermark(&self) -> Option<DateTime<Utc>> {
        let mut watermark: Option<DateTime<Utc>> = None;
        for sink in &self.sinks {
            let state = match sink.load_state().await {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(
                        sink = sink.name(),
                        error = %e,
                        "Sink state unavailable, falling back to the lookback window"
                    );
                    return None;
                }
            };
            match state.watermark {
                Some(w) => {
                    watermark = Some(watermark.map_or(w, |current| current.min(w)));
                }
                // A sink with no state yet needs the full lookback window.
                None => return None,
            }
        }
        watermark
    }

    /// Detail enrichment, degrading per record: a detail call that fails
    /// after its retries are spent falls back to the summary alone.
    async fn fetch_details(
        &mut self,
        summaries: &[ActivitySummary],
    ) -> Result<HashMap<u64, ActivityDetail>> {
        let mut details = HashMap::new();
        for (index, summary) in summaries.iter().enumerate() {
            if index > 0 {
                self.fetcher.detail_pause().await;
            }
            match self.fetcher.fetch_detail(summary.id).await {
                Ok(Some(detail)) => {
                    details.insert(summary.id, detail);
                }
                Ok(None) => {}
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        activity_id = summary.id,
                        error = %e,
                        "Detail fetch failed, falling back to summary"
                    );
                }
            }
        }
        Ok(details)
    }

    /// Gear-name resolution. Lookup failures degrade to no name.
    async fn resolve_gear(
        &mut self,
        summaries: &[ActivitySummary],
    ) -> Result<HashMap<String, String>> {
        let gear_ids: HashSet<&String> = summaries.iter().filter_map(|s| s.gear_id.as_ref()).collect();

        let mut names = HashMap::new();
        for gear_id in gear_ids {
            match self.fetcher.gear_name(gear_id).await {
                Ok(Some(name)) => {
                    names.insert(gear_id.clone(), name);
                }
                Ok(None) => {}
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    tracing::warn!(gear_id = %gear_id, error = %e, "Gear lookup failed");
                }
            }
        }
        Ok(names)
    }
}

/// Combine summaries with their optional details and gear names into the
/// flattened persistence shape: batch-level dedup by id (pages may repeat a
/// record near boundaries), detail-over-summary precedence, ordered by
/// start_date.
pub fn merge_records(
    summaries: Vec<ActivitySummary>,
    details: &HashMap<u64, ActivityDetail>,
    gear_names: &HashMap<String, String>,
) -> Vec<ActivityRecord> {
    let mut seen = HashSet::new();
    let mut records: Vec<ActivityRecord> = summaries
        .iter()
        .filter(|s| seen.insert(s.id))
        .map(|summary| {
            let gear_name = summary
                .gear_id
                .as_ref()
                .and_then(|id| gear_names.get(id))
                .cloned();
            ActivityRecord::from_parts(summary, details.get(&summary.id), gear_name)
        })
        .collect();
    records.sort_by_key(|r| r.start_date);
    records
}

/// Advance the watermark monotonically; it never regresses.
pub fn advance_watermark(
    current: Option<DateTime<Utc>>,
    records: &[ActivityRecord],
) -> Option<DateTime<Utc>> {
    let newest = records.iter().map(|r| r.start_date).max();
    match (current, newest) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}
