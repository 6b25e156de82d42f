// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Append-only CSV backup sink.
//!
//! The file itself is the durable truth for this sink: before appending,
//! the existing content is rescanned to rebuild the set of ids already
//! present, and a row is never appended twice for the same id. Values are
//! converted to human-friendly units (km, minutes, km/h) for inspection.

use crate::error::{Result, SyncError};
use crate::models::ActivityRecord;
use crate::sinks::{Sink, SinkState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Fixed header naming the exported columns.
const HEADER: [&str; 12] = [
    "id",
    "name",
    "start_date",
    "type",
    "distance_km",
    "moving_time_min",
    "elapsed_time_min",
    "elevation_gain_m",
    "average_speed_kmh",
    "max_speed_kmh",
    "average_heartrate",
    "max_heartrate",
];

pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn scan(&self) -> Result<SinkState> {
        let mut state = SinkState::default();
        if !self.path.exists() {
            return Ok(state);
        }

        let mut reader = csv::Reader::from_path(&self.path)
            .map_err(|e| SyncError::Storage(format!("failed to open {}: {}", self.path.display(), e)))?;

        for row in reader.records() {
            let row = row
                .map_err(|e| SyncError::Storage(format!("bad CSV row in {}: {}", self.path.display(), e)))?;
            let id = match row.get(0).and_then(|v| v.parse::<u64>().ok()) {
                Some(id) => id,
                None => continue,
            };
            match row.get(2).and_then(|v| v.parse::<DateTime<Utc>>().ok()) {
                Some(start_date) => state.observe(id, start_date),
                None => {
                    state.seen_ids.insert(id);
                }
            }
        }
        Ok(state)
    }

    fn row(record: &ActivityRecord) -> Vec<String> {
        vec![
            record.id.to_string(),
            record.name.clone(),
            record.start_date.to_rfc3339(),
            record.activity_type.clone(),
            format!("{:.2}", record.distance / 1000.0),
            format!("{:.1}", record.moving_time as f64 / 60.0),
            format!("{:.1}", record.elapsed_time as f64 / 60.0),
            format!("{:.0}", record.total_elevation_gain),
            format!("{:.1}", record.average_speed * 3.6),
            format!("{:.1}", record.max_speed * 3.6),
            record
                .average_heartrate
                .map(|v| format!("{:.0}", v))
                .unwrap_or_default(),
            record
                .max_heartrate
                .map(|v| format!("{:.0}", v))
                .unwrap_or_default(),
        ]
    }
}

#[async_trait]
impl Sink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn load_state(&self) -> Result<SinkState> {
        self.scan()
    }

    async fn write(&self, records: &[ActivityRecord]) -> Result<usize> {
        // Rescan at write time; the file may have rows persisted by an
        // earlier run with the same timestamps as this batch.
        let state = self.scan()?;
        let new_records: Vec<&ActivityRecord> = records
            .iter()
            .filter(|r| !state.seen_ids.contains(&r.id))
            .collect();

        if new_records.is_empty() {
            tracing::debug!(path = %self.path.display(), "No new rows for CSV sink");
            return Ok(0);
        }

        // An absent or zero-byte file both need the header; checking only
        // existence would append headerless rows to an empty file.
        let needs_header = std::fs::metadata(&self.path)
            .map(|meta| meta.len() == 0)
            .unwrap_or(true);
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SyncError::Storage(format!("failed to open {}: {}", self.path.display(), e)))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer
                .write_record(HEADER)
                .map_err(|e| SyncError::Storage(format!("CSV header write failed: {}", e)))?;
        }
        for record in &new_records {
            writer
                .write_record(Self::row(record))
                .map_err(|e| SyncError::Storage(format!("CSV row write failed: {}", e)))?;
        }
        writer
            .flush()
            .map_err(|e| SyncError::Storage(format!("CSV flush failed: {}", e)))?;

        tracing::info!(
            path = %self.path.display(),
            appended = new_records.len(),
            "Appended rows to CSV backup"
        );
        Ok(new_records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, start_date: &str) -> ActivityRecord {
        ActivityRecord {
            id,
            name: format!("Activity {}", id),
            activity_type: "Run".to_string(),
            start_date: start_date.parse().unwrap(),
            distance: 10_000.0,
            moving_time: 3_000,
            elapsed_time: 3_100,
            total_elevation_gain: 50.0,
            average_speed: 3.3,
            max_speed: 4.5,
            average_heartrate: Some(150.0),
            max_heartrate: None,
            start_latitude: None,
            start_longitude: None,
            end_latitude: None,
            end_longitude: None,
            timezone: None,
            utc_offset: None,
            kudos_count: 0,
            comment_count: 0,
            gear_id: None,
            gear_name: None,
            trainer: false,
            commute: false,
            private: false,
            description: None,
            calories: None,
            average_watts: None,
            kilojoules: None,
            suffer_score: None,
            device_name: None,
            polyline: None,
        }
    }

    #[tokio::test]
    async fn creates_file_with_header_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("out.csv"));

        let written = sink
            .write(&[record(1, "2026-03-01T08:00:00Z")])
            .await
            .unwrap();
        assert_eq!(written, 1);

        let content = std::fs::read_to_string(dir.path().join("out.csv")).unwrap();
        assert!(content.starts_with("id,name,start_date"));
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn empty_file_gets_a_header_before_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "").unwrap();

        let sink = CsvSink::new(&path);
        sink.write(&[record(5, "2026-03-01T08:00:00Z")]).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("id,name,start_date"));

        // The row is visible to a rescan, so it is never appended twice.
        let state = sink.load_state().await.unwrap();
        assert!(state.seen_ids.contains(&5));
    }

    #[tokio::test]
    async fn never_appends_a_seen_id_again() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("out.csv"));

        sink.write(&[record(42, "2026-03-01T08:00:00Z")]).await.unwrap();
        let written = sink
            .write(&[
                record(42, "2026-03-01T08:00:00Z"),
                record(43, "2026-03-02T08:00:00Z"),
            ])
            .await
            .unwrap();

        assert_eq!(written, 1);
        let content = std::fs::read_to_string(dir.path().join("out.csv")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3); // header + 2 rows
        assert_eq!(lines.iter().filter(|l| l.starts_with("42,")).count(), 1);
    }

    #[tokio::test]
    async fn state_is_rederived_from_file_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let sink = CsvSink::new(&path);

        sink.write(&[
            record(1, "2026-03-01T08:00:00Z"),
            record(2, "2026-03-05T08:00:00Z"),
        ])
        .await
        .unwrap();

        // A fresh sink over the same file sees the same state.
        let state = CsvSink::new(&path).load_state().await.unwrap();
        assert_eq!(state.seen_ids.len(), 2);
        assert_eq!(
            state.watermark,
            Some("2026-03-05T08:00:00Z".parse().unwrap())
        );
    }

    #[tokio::test]
    async fn missing_file_has_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("absent.csv"));
        let state = sink.load_state().await.unwrap();
        assert!(state.seen_ids.is_empty());
        assert!(state.watermark.is_none());
    }
}
