// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

mod common;

use common::{activity_json, static_token_fetcher};
use strava_sync::services::{RunState, SyncOptions, SyncOrchestrator};
use strava_sync::sinks::{CsvSink, JsonSink, Sink, StoreSink};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn file_sinks(dir: &tempfile::TempDir) -> Vec<Box<dyn Sink>> {
    vec![
        Box::new(CsvSink::new(dir.path().join("activities.csv"))),
        Box::new(JsonSink::new(dir.path().join("activities.json"))),
    ]
}

fn options() -> SyncOptions {
    SyncOptions {
        lookback_days: 30,
        fetch_details: false,
    }
}

async fn mount_activities(server: &MockServer, activities: Vec<serde_json::Value>) {
    // Non-empty batch is shorter than a full page, so one list call per run.
    Mock::given(method("GET"))
        .and(path("/athlete/activities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(activities))
        .mount(server)
        .await;
}

#[tokio::test]
async fn running_twice_yields_identical_destination_state() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_activities(
        &server,
        vec![
            activity_json(1, "2026-05-01T08:00:00Z"),
            activity_json(2, "2026-05-02T08:00:00Z"),
        ],
    )
    .await;

    let mut first = SyncOrchestrator::new(static_token_fetcher(&server, &dir), file_sinks(&dir), options());
    first.run().await.unwrap();

    let csv_after_one = std::fs::read_to_string(dir.path().join("activities.csv")).unwrap();
    let json_after_one = std::fs::read_to_string(dir.path().join("activities.json")).unwrap();

    // A fresh orchestrator re-derives all state from the sinks themselves.
    let mut second = SyncOrchestrator::new(static_token_fetcher(&server, &dir), file_sinks(&dir), options());
    let summary = second.run().await.unwrap();

    let csv_after_two = std::fs::read_to_string(dir.path().join("activities.csv")).unwrap();
    let json_after_two = std::fs::read_to_string(dir.path().join("activities.json")).unwrap();

    assert_eq!(csv_after_one, csv_after_two);
    assert_eq!(json_after_one, json_after_two);
    assert_eq!(summary.written, vec![("csv".to_string(), 0), ("json".to_string(), 0)]);
}

#[tokio::test]
async fn zero_new_records_is_a_successful_noop_run() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_activities(&server, vec![]).await;

    let mut orchestrator =
        SyncOrchestrator::new(static_token_fetcher(&server, &dir), file_sinks(&dir), options());
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.fetched, 0);
    assert!(summary.sink_errors.is_empty());
    assert_eq!(orchestrator.state(), RunState::Done);
}

#[tokio::test]
async fn watermark_is_newest_start_date_regardless_of_input_order() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_activities(
        &server,
        vec![
            activity_json(2, "2026-05-02T08:00:00Z"),
            activity_json(3, "2026-05-03T08:00:00Z"),
            activity_json(1, "2026-05-01T08:00:00Z"),
        ],
    )
    .await;

    let mut orchestrator =
        SyncOrchestrator::new(static_token_fetcher(&server, &dir), file_sinks(&dir), options());
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(
        summary.watermark,
        Some("2026-05-03T08:00:00Z".parse().unwrap())
    );
}

#[tokio::test]
async fn auth_failure_aborts_before_any_fetch() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    // Token endpoint rejects the refresh grant; no bootstrap code configured.
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut orchestrator = SyncOrchestrator::new(
        common::refresh_token_fetcher(&server, &dir),
        file_sinks(&dir),
        options(),
    );
    let err = orchestrator.run().await.unwrap_err();

    assert!(err.is_auth());
    assert_eq!(orchestrator.state(), RunState::Failed);
    // No list call was ever made.
    let list_calls = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/athlete/activities")
        .count();
    assert_eq!(list_calls, 0);
}

#[tokio::test]
async fn seen_id_is_upserted_but_never_reappended() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_activities(&server, vec![activity_json(42, "2026-05-01T08:00:00Z")]).await;

    // Store sink: already holds id 42, accepts the upsert.
    Mock::given(method("GET"))
        .and(path("/rest/v1/strava_activities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": 42, "start_date": "2026-04-20T08:00:00Z" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/strava_activities"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    // CSV sink: pre-seed the file with id 42 from an earlier run.
    let csv_path = dir.path().join("activities.csv");
    let seeded: strava_sync::models::ActivitySummary =
        serde_json::from_value(activity_json(42, "2026-04-20T08:00:00Z")).unwrap();
    let seeded = strava_sync::services::sync::merge_records(
        vec![seeded],
        &std::collections::HashMap::new(),
        &std::collections::HashMap::new(),
    );
    CsvSink::new(&csv_path).write(&seeded).await.unwrap();

    let sinks: Vec<Box<dyn Sink>> = vec![
        Box::new(StoreSink::new(server.uri(), "key", "strava_activities")),
        Box::new(CsvSink::new(&csv_path)),
    ];

    let mut orchestrator =
        SyncOrchestrator::new(static_token_fetcher(&server, &dir), sinks, options());
    let summary = orchestrator.run().await.unwrap();

    // The upsert sink received id 42; the append-only sink did not grow.
    assert!(summary.written.contains(&("store".to_string(), 1)));
    assert!(summary.written.contains(&("csv".to_string(), 0)));

    let csv_content = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(
        csv_content.lines().filter(|l| l.starts_with("42,")).count(),
        1
    );
}

#[tokio::test]
async fn one_failing_sink_does_not_abort_the_others() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_activities(&server, vec![activity_json(1, "2026-05-01T08:00:00Z")]).await;

    // The store is down; the file sinks must still be written.
    Mock::given(method("GET"))
        .and(path("/rest/v1/strava_activities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/strava_activities"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut sinks: Vec<Box<dyn Sink>> =
        vec![Box::new(StoreSink::new(server.uri(), "key", "strava_activities"))];
    sinks.extend(file_sinks(&dir));

    let mut orchestrator =
        SyncOrchestrator::new(static_token_fetcher(&server, &dir), sinks, options());
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.sink_errors.len(), 1);
    assert_eq!(summary.sink_errors[0].0, "store");
    assert!(summary.written.contains(&("csv".to_string(), 1)));
    assert!(summary.written.contains(&("json".to_string(), 1)));
    assert_eq!(orchestrator.state(), RunState::Done);
}

#[tokio::test]
async fn unreadable_store_state_does_not_block_file_backups() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_activities(&server, vec![activity_json(1, "2026-05-01T08:00:00Z")]).await;

    // The store is down for both the state query and the upsert. The file
    // backups must still be written from the lookback window.
    Mock::given(method("GET"))
        .and(path("/rest/v1/strava_activities"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/strava_activities"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut sinks: Vec<Box<dyn Sink>> =
        vec![Box::new(StoreSink::new(server.uri(), "key", "strava_activities"))];
    sinks.extend(file_sinks(&dir));

    let mut orchestrator =
        SyncOrchestrator::new(static_token_fetcher(&server, &dir), sinks, options());
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.sink_errors.len(), 1);
    assert_eq!(summary.sink_errors[0].0, "store");
    assert!(summary.written.contains(&("csv".to_string(), 1)));
    assert!(summary.written.contains(&("json".to_string(), 1)));
    assert!(dir.path().join("activities.csv").exists());
    assert!(dir.path().join("activities.json").exists());
    assert_eq!(orchestrator.state(), RunState::Done);
}

#[tokio::test]
async fn all_sinks_failing_fails_the_run() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_activities(&server, vec![activity_json(1, "2026-05-01T08:00:00Z")]).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/strava_activities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/strava_activities"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let sinks: Vec<Box<dyn Sink>> =
        vec![Box::new(StoreSink::new(server.uri(), "key", "strava_activities"))];

    let mut orchestrator =
        SyncOrchestrator::new(static_token_fetcher(&server, &dir), sinks, options());
    let err = orchestrator.run().await.unwrap_err();

    assert!(matches!(err, strava_sync::SyncError::Storage(_)));
    assert_eq!(orchestrator.state(), RunState::Failed);
}

#[tokio::test]
async fn details_enrich_records_and_missing_details_degrade() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_activities(
        &server,
        vec![
            activity_json(1, "2026-05-01T08:00:00Z"),
            activity_json(2, "2026-05-02T08:00:00Z"),
        ],
    )
    .await;

    // Detail exists for id 1 only; id 2 falls back to its summary.
    Mock::given(method("GET"))
        .and(path("/activities/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 1,
            "calories": 512.0,
            "device_name": "Garmin Edge 530"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/activities/2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let json_path = dir.path().join("activities.json");
    let sinks: Vec<Box<dyn Sink>> = vec![Box::new(JsonSink::new(&json_path))];

    let mut orchestrator = SyncOrchestrator::new(
        static_token_fetcher(&server, &dir),
        sinks,
        SyncOptions {
            lookback_days: 30,
            fetch_details: true,
        },
    );
    orchestrator.run().await.unwrap();

    let records: Vec<strava_sync::models::ActivityRecord> =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();

    let enriched = records.iter().find(|r| r.id == 1).unwrap();
    assert_eq!(enriched.calories, Some(512.0));
    assert_eq!(enriched.device_name.as_deref(), Some("Garmin Edge 530"));

    let degraded = records.iter().find(|r| r.id == 2).unwrap();
    assert_eq!(degraded.name, "Activity 2");
    assert!(degraded.calories.is_none());
}
