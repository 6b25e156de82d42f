// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client.
//!
//! Raw HTTP layer: one method per endpoint, plus response classification
//! into the engine's error taxonomy (429 with Retry-After hint, 401, 404,
//! 5xx vs other failures). Retry and token handling live one layer up.

use crate::error::{Result, SyncError};
use crate::models::{ActivityDetail, ActivitySummary, Gear};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://www.strava.com/api/v3";
const DEFAULT_TOKEN_URL: &str = "https://www.strava.com/oauth/token";

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    api_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    /// Create a new Strava client with OAuth credentials.
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: DEFAULT_API_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client_id,
            client_secret,
        }
    }

    /// Point the client at different endpoints (local mock servers).
    pub fn with_base_urls(mut self, api_url: impl Into<String>, token_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self.token_url = token_url.into();
        self
    }

    /// List activities, newest page first (paginated).
    ///
    /// `after` is an exclusive unix-timestamp lower bound on start_date.
    pub async fn list_activities(
        &self,
        access_token: &str,
        after: Option<i64>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ActivitySummary>> {
        let url = format!("{}/athlete/activities", self.api_url);

        let mut query = vec![
            ("page".to_string(), page.to_string()),
            ("per_page".to_string(), per_page.to_string()),
        ];
        if let Some(after) = after {
            query.push(("after".to_string(), after.to_string()));
        }

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await?;

        self.check_response_json(response).await
    }

    /// Get a detailed activity by ID.
    pub async fn get_activity(&self, access_token: &str, activity_id: u64) -> Result<ActivityDetail> {
        let url = format!("{}/activities/{}", self.api_url, activity_id);
        self.get_json(&url, access_token).await
    }

    /// Look up gear by its id.
    pub async fn get_gear(&self, access_token: &str, gear_id: &str) -> Result<Gear> {
        let url = format!("{}/gear/{}", self.api_url, gear_id);
        self.get_json(&url, access_token).await
    }

    /// Exchange a refresh token for a fresh access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        self.check_response_json(response).await
    }

    /// Exchange a one-time authorization code for an initial token pair.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<TokenResponse> {
        let mut form = vec![
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ];
        if let Some(uri) = redirect_uri {
            form.push(("redirect_uri", uri));
        }

        let response = self.http.post(&self.token_url).form(&form).send().await?;

        self.check_response_json(response).await
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T> {
        let response = self.http.get(url).bearer_auth(access_token).send().await?;
        self.check_response_json(response).await
    }

    /// Classify the response status and parse the JSON body on success.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 429 {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);
                tracing::warn!(?retry_after, "Strava rate limit hit (429)");
                return Err(SyncError::RateLimited { retry_after });
            }

            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 => SyncError::Auth(format!("HTTP 401: {}", body)),
                404 => SyncError::NotFound(body),
                500..=599 => SyncError::Network(format!("HTTP {}: {}", status, body)),
                _ => SyncError::Api(format!("HTTP {}: {}", status, body)),
            });
        }

        response
            .json()
            .await
            .map_err(|e| SyncError::Api(format!("JSON parse error: {}", e)))
    }
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix expiry timestamp; Strava sends both forms, either may be absent.
    pub expires_at: Option<i64>,
    pub expires_in: Option<i64>,
}
