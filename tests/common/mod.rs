// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use strava_sync::retry::RetryPolicy;
use strava_sync::services::{ActivityFetcher, FetcherConfig, StravaClient, TokenManager};
use strava_sync::store::FileCredentialStore;
use wiremock::MockServer;

/// A Strava client pointed at the mock server.
#[allow(dead_code)]
pub fn test_client(server: &MockServer) -> StravaClient {
    StravaClient::new("client-id".to_string(), "client-secret".to_string())
        .with_base_urls(server.uri(), format!("{}/oauth/token", server.uri()))
}

/// Fetcher pacing suitable for tests: no long sleeps.
#[allow(dead_code)]
pub fn test_fetcher_config() -> FetcherConfig {
    FetcherConfig {
        per_page: 200,
        max_rate_limit_retries: 3,
        rate_limit_wait: Duration::from_millis(5),
        detail_pause: Duration::ZERO,
        network_retry: RetryPolicy {
            max_retries: 2,
            delay: Duration::from_millis(1),
        },
    }
}

/// Fetcher with a directly-supplied access token (no token endpoint calls).
#[allow(dead_code)]
pub fn static_token_fetcher(server: &MockServer, dir: &tempfile::TempDir) -> ActivityFetcher {
    let client = test_client(server);
    let store = Arc::new(FileCredentialStore::new(dir.path().join("tokens.json")));
    let tokens = TokenManager::new(client.clone(), store)
        .with_static_access_token(Some("test-token".to_string()));
    ActivityFetcher::new(client, tokens, test_fetcher_config())
}

/// Fetcher that authenticates through the mock token endpoint.
#[allow(dead_code)]
pub fn refresh_token_fetcher(server: &MockServer, dir: &tempfile::TempDir) -> ActivityFetcher {
    let client = test_client(server);
    let store = Arc::new(FileCredentialStore::new(dir.path().join("tokens.json")));
    let tokens = TokenManager::new(client.clone(), store)
        .with_seed_refresh_token(Some("rt-seed".to_string()))
        .with_retry_policy(RetryPolicy {
            max_retries: 2,
            delay: Duration::from_millis(1),
        });
    ActivityFetcher::new(client, tokens, test_fetcher_config())
}

/// Minimal activity JSON as returned by the list endpoint.
#[allow(dead_code)]
pub fn activity_json(id: u64, start_date: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Activity {}", id),
        "type": "Ride",
        "start_date": start_date,
        "distance": 12_345.0,
        "moving_time": 2_400,
        "elapsed_time": 2_500,
        "total_elevation_gain": 120.0,
        "average_speed": 5.1,
        "max_speed": 11.3,
        "kudos_count": 2,
        "comment_count": 0,
        "trainer": false,
        "commute": false,
        "private": false
    })
}

/// A full page of `count` activities with sequential ids.
#[allow(dead_code)]
pub fn activity_page(start_id: u64, count: usize) -> Vec<Value> {
    (0..count as u64)
        .map(|offset| {
            let id = start_id + offset;
            // Spread start dates one minute apart.
            let minute = id % 60;
            let hour = (id / 60) % 24;
            activity_json(id, &format!("2026-05-10T{:02}:{:02}:00Z", hour, minute))
        })
        .collect()
}
