// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava activity models.
//!
//! `ActivitySummary` is the list-endpoint shape, `ActivityDetail` the richer
//! per-record shape, and `ActivityRecord` the flattened form that sinks
//! persist. When both a summary and a detail exist for the same id, the
//! detail value wins field-by-field when present; otherwise the summary
//! value is kept.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary activity from the list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivitySummary {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    /// Sport type (Ride, Run, Hike, etc.)
    #[serde(rename = "type", default)]
    pub activity_type: String,
    pub start_date: DateTime<Utc>,
    /// Distance in meters
    #[serde(default)]
    pub distance: f64,
    /// Moving time in seconds
    #[serde(default)]
    pub moving_time: i64,
    /// Elapsed time in seconds
    #[serde(default)]
    pub elapsed_time: i64,
    #[serde(default)]
    pub total_elevation_gain: f64,
    /// Average speed in m/s
    #[serde(default)]
    pub average_speed: f64,
    #[serde(default)]
    pub max_speed: f64,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    #[serde(default)]
    pub kudos_count: i64,
    #[serde(default)]
    pub comment_count: i64,
    pub gear_id: Option<String>,
    #[serde(default)]
    pub trainer: bool,
    #[serde(default)]
    pub commute: bool,
    #[serde(default)]
    pub private: bool,
    /// [lat, lon] pair, when the activity has GPS data
    pub start_latlng: Option<Vec<f64>>,
    pub end_latlng: Option<Vec<f64>>,
    pub timezone: Option<String>,
    pub utc_offset: Option<f64>,
    pub description: Option<String>,
}

/// Detailed activity from the per-record endpoint.
///
/// Only carries the fields that either override the summary or exist solely
/// at detail level; everything else comes from the summary unchanged.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityDetail {
    pub id: u64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub gear_id: Option<String>,
    pub kudos_count: Option<i64>,
    pub comment_count: Option<i64>,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub calories: Option<f64>,
    pub average_watts: Option<f64>,
    pub kilojoules: Option<f64>,
    pub suffer_score: Option<f64>,
    pub device_name: Option<String>,
    pub map: Option<ActivityMap>,
}

impl ActivityDetail {
    /// Get the detailed polyline, falling back to summary if not available.
    pub fn polyline(&self) -> Option<&str> {
        self.map.as_ref().and_then(|m| {
            m.polyline
                .as_deref()
                .or(m.summary_polyline.as_deref())
        })
    }
}

/// Activity map data with polylines.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityMap {
    pub polyline: Option<String>,
    pub summary_polyline: Option<String>,
}

/// Gear (bike, shoes) looked up by id.
#[derive(Debug, Clone, Deserialize)]
pub struct Gear {
    pub id: String,
    pub name: String,
}

/// Flattened persistence shape shared by all sinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub start_date: DateTime<Utc>,
    pub distance: f64,
    pub moving_time: i64,
    pub elapsed_time: i64,
    pub total_elevation_gain: f64,
    pub average_speed: f64,
    pub max_speed: f64,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub start_latitude: Option<f64>,
    pub start_longitude: Option<f64>,
    pub end_latitude: Option<f64>,
    pub end_longitude: Option<f64>,
    pub timezone: Option<String>,
    pub utc_offset: Option<f64>,
    pub kudos_count: i64,
    pub comment_count: i64,
    pub gear_id: Option<String>,
    pub gear_name: Option<String>,
    pub trainer: bool,
    pub commute: bool,
    pub private: bool,
    pub description: Option<String>,
    pub calories: Option<f64>,
    pub average_watts: Option<f64>,
    pub kilojoules: Option<f64>,
    pub suffer_score: Option<f64>,
    pub device_name: Option<String>,
    pub polyline: Option<String>,
}

impl ActivityRecord {
    /// Flatten a summary, an optional detail, and an optional resolved gear
    /// name into the persistence shape. Detail values take precedence over
    /// summary values for overlapping fields when present.
    pub fn from_parts(
        summary: &ActivitySummary,
        detail: Option<&ActivityDetail>,
        gear_name: Option<String>,
    ) -> Self {
        let (start_latitude, start_longitude) = split_latlng(summary.start_latlng.as_deref());
        let (end_latitude, end_longitude) = split_latlng(summary.end_latlng.as_deref());

        Self {
            id: summary.id,
            name: detail
                .and_then(|d| d.name.clone())
                .unwrap_or_else(|| summary.name.clone()),
            activity_type: summary.activity_type.clone(),
            start_date: summary.start_date,
            distance: summary.distance,
            moving_time: summary.moving_time,
            elapsed_time: summary.elapsed_time,
            total_elevation_gain: summary.total_elevation_gain,
            average_speed: summary.average_speed,
            max_speed: summary.max_speed,
            average_heartrate: detail
                .and_then(|d| d.average_heartrate)
                .or(summary.average_heartrate),
            max_heartrate: detail
                .and_then(|d| d.max_heartrate)
                .or(summary.max_heartrate),
            start_latitude,
            start_longitude,
            end_latitude,
            end_longitude,
            timezone: summary.timezone.clone(),
            utc_offset: summary.utc_offset,
            kudos_count: detail
                .and_then(|d| d.kudos_count)
                .unwrap_or(summary.kudos_count),
            comment_count: detail
                .and_then(|d| d.comment_count)
                .unwrap_or(summary.comment_count),
            gear_id: detail
                .and_then(|d| d.gear_id.clone())
                .or_else(|| summary.gear_id.clone()),
            gear_name,
            trainer: summary.trainer,
            commute: summary.commute,
            private: summary.private,
            description: detail
                .and_then(|d| d.description.clone())
                .or_else(|| summary.description.clone()),
            calories: detail.and_then(|d| d.calories),
            average_watts: detail.and_then(|d| d.average_watts),
            kilojoules: detail.and_then(|d| d.kilojoules),
            suffer_score: detail.and_then(|d| d.suffer_score),
            device_name: detail.and_then(|d| d.device_name.clone()),
            polyline: detail.and_then(|d| d.polyline().map(str::to_string)),
        }
    }
}

fn split_latlng(pair: Option<&[f64]>) -> (Option<f64>, Option<f64>) {
    match pair {
        Some([lat, lon, ..]) => (Some(*lat), Some(*lon)),
        _ => (None, None),
    }
}
