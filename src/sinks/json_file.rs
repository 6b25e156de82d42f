// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JSON-array backup sink.
//!
//! One file holding every record ever synced. Append is a whole-file
//! read-modify-write with an atomic rename, deduplicated by id against the
//! file's own content.

use crate::error::{Result, SyncError};
use crate::models::ActivityRecord;
use crate::sinks::{Sink, SinkState};
use async_trait::async_trait;
use std::path::PathBuf;

pub struct JsonSink {
    path: PathBuf,
}

impl JsonSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_existing(&self) -> Result<Vec<ActivityRecord>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(SyncError::Storage(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        match serde_json::from_str(&raw) {
            Ok(records) => Ok(records),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "JSON backup is unreadable, starting over"
                );
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl Sink for JsonSink {
    fn name(&self) -> &'static str {
        "json"
    }

    async fn load_state(&self) -> Result<SinkState> {
        let mut state = SinkState::default();
        for record in self.read_existing()? {
            state.observe(record.id, record.start_date);
        }
        Ok(state)
    }

    async fn write(&self, records: &[ActivityRecord]) -> Result<usize> {
        let mut existing = self.read_existing()?;
        let seen: std::collections::HashSet<u64> = existing.iter().map(|r| r.id).collect();

        let mut appended = 0usize;
        for record in records {
            if seen.contains(&record.id) {
                continue;
            }
            existing.push(record.clone());
            appended += 1;
        }

        if appended == 0 {
            tracing::debug!(path = %self.path.display(), "No new records for JSON sink");
            return Ok(0);
        }

        let json = serde_json::to_string(&existing)
            .map_err(|e| SyncError::Storage(format!("JSON encode failed: {}", e)))?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| SyncError::Storage(format!("failed to write {}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            SyncError::Storage(format!("failed to replace {}: {}", self.path.display(), e))
        })?;

        tracing::info!(
            path = %self.path.display(),
            appended,
            total = existing.len(),
            "JSON backup updated"
        );
        Ok(appended)
    }
}
