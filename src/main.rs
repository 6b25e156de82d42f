// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! strava-sync CLI.
//!
//! One invocation performs one sync run: acquire a credential, fetch new
//! activities, merge, persist to the configured sinks, report. Exits
//! nonzero only on run-fatal conditions (bad configuration, credential
//! failure, every sink failing).

use std::process::ExitCode;
use std::sync::Arc;
use strava_sync::config::Config;
use strava_sync::error::Result;
use strava_sync::services::{
    ActivityFetcher, FetcherConfig, RunSummary, StravaClient, SyncOptions, SyncOrchestrator,
    TokenManager,
};
use strava_sync::sinks::{CsvSink, JsonSink, Sink, StoreSink};
use strava_sync::store::FileCredentialStore;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Configuration error");
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(summary) => {
            report(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Sync run failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<RunSummary> {
    let client = StravaClient::new(config.client_id.clone(), config.client_secret.clone());

    let credential_store = Arc::new(FileCredentialStore::new(&config.token_file));
    let tokens = TokenManager::new(client.clone(), credential_store)
        .with_seed_refresh_token(config.refresh_token.clone())
        .with_auth_code(config.auth_code.clone(), config.redirect_uri.clone())
        .with_static_access_token(config.access_token.clone());

    let fetcher = ActivityFetcher::new(client, tokens, FetcherConfig::default());

    let mut sinks: Vec<Box<dyn Sink>> = Vec::new();
    if let (Some(url), Some(key)) = (&config.store_url, &config.store_api_key) {
        sinks.push(Box::new(StoreSink::new(url, key, &config.store_table)));
    } else {
        tracing::info!("Store sink not configured, writing file backups only");
    }
    sinks.push(Box::new(CsvSink::new(&config.csv_file)));
    sinks.push(Box::new(JsonSink::new(&config.json_file)));

    let options = SyncOptions {
        lookback_days: config.days_back,
        fetch_details: config.fetch_details,
    };

    let mut orchestrator = SyncOrchestrator::new(fetcher, sinks, options);
    orchestrator.run().await
}

fn report(summary: &RunSummary) {
    for (sink, count) in &summary.written {
        tracing::info!(sink = %sink, written = count, "Sink updated");
    }
    for (sink, error) in &summary.sink_errors {
        tracing::warn!(sink = %sink, error = %error, "Sink failed");
    }
    tracing::info!(
        fetched = summary.fetched,
        watermark = ?summary.watermark,
        "Sync complete"
    );
}

/// Compact structured logging; `RUST_LOG` overrides the default level.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("strava_sync=debug,info")),
        )
        .with_target(false)
        .init();
}
