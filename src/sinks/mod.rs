//! Persistence sinks.
//!
//! Every sink derives its own durable state (`SinkState`) from its backing
//! storage at the start of a run; no in-memory progress is trusted across
//! runs. Upsert-capable sinks accept already-seen ids so provider-side edits
//! propagate; append-only sinks filter them to prevent literal duplication.

pub mod csv_file;
pub mod json_file;
pub mod store;

pub use csv_file::CsvSink;
pub use json_file::JsonSink;
pub use store::StoreSink;

use crate::error::Result;
use crate::models::ActivityRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Durable state re-derived from a sink's backing storage.
#[derive(Debug, Clone, Default)]
pub struct SinkState {
    /// Ids already persisted in this sink.
    pub seen_ids: HashSet<u64>,
    /// Max start_date among persisted records.
    pub watermark: Option<DateTime<Utc>>,
}

impl SinkState {
    /// Record one persisted id and advance the watermark monotonically.
    pub fn observe(&mut self, id: u64, start_date: DateTime<Utc>) {
        self.seen_ids.insert(id);
        self.watermark = Some(match self.watermark {
            Some(current) => current.max(start_date),
            None => start_date,
        });
    }
}

/// An idempotent persistence destination.
#[async_trait]
pub trait Sink: Send + Sync {
    fn name(&self) -> &'static str;

    /// Rebuild seen ids and watermark from the sink's durable content.
    async fn load_state(&self) -> Result<SinkState>;

    /// Persist the record set. Returns the number of records written
    /// (appended for append-only sinks, upserted for upsert sinks).
    /// Calling twice with the same input must leave the destination in the
    /// same final state as calling once.
    async fn write(&self, records: &[ActivityRecord]) -> Result<usize>;
}
