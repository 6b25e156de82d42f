// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Upsert-capable REST store sink (PostgREST-style interface).
//!
//! One batched POST per run with `on_conflict=id` and merge-duplicates
//! preference, so repeating the same record set converges to the same
//! destination state. The sink assumes the destination table already has
//! the correct shape; rejected writes surface as `Storage` errors rather
//! than being patched around.

use crate::error::{Result, SyncError};
use crate::models::ActivityRecord;
use crate::sinks::{Sink, SinkState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub struct StoreSink {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
}

/// Minimal row shape used to rebuild sink state.
#[derive(Debug, Deserialize)]
struct StoredRow {
    id: u64,
    start_date: DateTime<Utc>,
}

impl StoreSink {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            table: table.into(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }
}

#[async_trait]
impl Sink for StoreSink {
    fn name(&self) -> &'static str {
        "store"
    }

    async fn load_state(&self) -> Result<SinkState> {
        let response = self
            .http
            .get(self.table_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&[("select", "id,start_date")])
            .send()
            .await
            .map_err(|e| SyncError::Storage(format!("store state query failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Storage(format!(
                "store state query failed: HTTP {}: {}",
                status, body
            )));
        }

        let rows: Vec<StoredRow> = response
            .json()
            .await
            .map_err(|e| SyncError::Storage(format!("store state parse error: {}", e)))?;

        let mut state = SinkState::default();
        for row in rows {
            state.observe(row.id, row.start_date);
        }
        tracing::debug!(rows = state.seen_ids.len(), "Loaded store sink state");
        Ok(state)
    }

    async fn write(&self, records: &[ActivityRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let response = self
            .http
            .post(self.table_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .query(&[("on_conflict", "id")])
            .json(records)
            .send()
            .await
            .map_err(|e| SyncError::Storage(format!("store upsert failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Storage(format!(
                "store upsert failed: HTTP {}: {}",
                status, body
            )));
        }

        tracing::info!(count = records.len(), "Upserted records to store");
        Ok(records.len())
    }
}
