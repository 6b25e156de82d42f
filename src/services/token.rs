// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth token lifecycle.
//!
//! Obtains a valid access token from, in order of preference:
//! 1. a directly-supplied access token (bootstrap/test escape hatch),
//! 2. the refresh-token grant, using the stored or seed refresh token,
//! 3. a one-time authorization-code exchange when the refresh token is
//!    rejected and a bootstrap code is configured.
//!
//! A rotated refresh token is persisted before the access token is handed
//! to the caller, so a crash between acquisition and use never loses the
//! new credential.

use crate::error::{Result, SyncError};
use crate::retry::{retry_with_backoff, Attempt, RetryPolicy};
use crate::services::strava::{StravaClient, TokenResponse};
use crate::store::{Credential, CredentialStore};
use std::sync::Arc;

pub struct TokenManager {
    client: StravaClient,
    store: Arc<dyn CredentialStore>,
    /// Seed refresh token from the environment, used when the store is empty.
    seed_refresh_token: Option<String>,
    /// One-time bootstrap authorization code.
    auth_code: Option<String>,
    redirect_uri: Option<String>,
    /// Directly-supplied token; returned unchanged when set.
    static_access_token: Option<String>,
    retry: RetryPolicy,
    /// Access token acquired earlier in this run, if still trusted.
    cached: Option<String>,
    auth_code_spent: bool,
}

impl TokenManager {
    pub fn new(client: StravaClient, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            client,
            store,
            seed_refresh_token: None,
            auth_code: None,
            redirect_uri: None,
            static_access_token: None,
            retry: RetryPolicy::default(),
            cached: None,
            auth_code_spent: false,
        }
    }

    pub fn with_seed_refresh_token(mut self, token: Option<String>) -> Self {
        self.seed_refresh_token = token;
        self
    }

    pub fn with_auth_code(mut self, code: Option<String>, redirect_uri: Option<String>) -> Self {
        self.auth_code = code;
        self.redirect_uri = redirect_uri;
        self
    }

    pub fn with_static_access_token(mut self, token: Option<String>) -> Self {
        self.static_access_token = token;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Drop the cached access token so the next call performs a fresh
    /// exchange. Used after a 401 mid-fetch.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Obtain a valid access token for this run.
    pub async fn get_access_token(&mut self) -> Result<String> {
        if let Some(token) = &self.static_access_token {
            return Ok(token.clone());
        }
        if let Some(token) = &self.cached {
            return Ok(token.clone());
        }

        let refresh_token = match self.store.load()? {
            Some(credential) => Some(credential.refresh_token),
            None => self.seed_refresh_token.clone(),
        };

        let access_token = match refresh_token {
            Some(refresh_token) => match self.refresh_grant(&refresh_token).await {
                Ok(token) => token,
                Err(e) if e.is_auth() => {
                    tracing::warn!("Refresh token rejected, attempting bootstrap code exchange");
                    self.bootstrap_grant().await?
                }
                Err(e) => return Err(e),
            },
            None => {
                tracing::info!("No stored or seed refresh token, attempting bootstrap code exchange");
                self.bootstrap_grant().await?
            }
        };

        self.cached = Some(access_token.clone());
        Ok(access_token)
    }

    /// Refresh-token grant with bounded retry on transient failures.
    async fn refresh_grant(&mut self, refresh_token: &str) -> Result<String> {
        let client = self.client.clone();
        let response = retry_with_backoff(self.retry, |_| {
            let client = client.clone();
            let refresh_token = refresh_token.to_string();
            async move { Attempt::from_result(client.refresh_token(&refresh_token).await) }
        })
        .await?;

        self.persist_rotation(&response, Some(refresh_token))?;
        Ok(response.access_token)
    }

    /// One-time authorization-code exchange, persisting the minted pair.
    async fn bootstrap_grant(&mut self) -> Result<String> {
        let code = match (&self.auth_code, self.auth_code_spent) {
            (Some(code), false) => code.clone(),
            _ => return Err(SyncError::Auth("no valid credential".to_string())),
        };
        self.auth_code_spent = true;

        let client = self.client.clone();
        let redirect_uri = self.redirect_uri.clone();
        let response = retry_with_backoff(self.retry, |_| {
            let client = client.clone();
            let code = code.clone();
            let redirect_uri = redirect_uri.clone();
            async move {
                Attempt::from_result(client.exchange_code(&code, redirect_uri.as_deref()).await)
            }
        })
        .await
        .map_err(|e| {
            if e.is_auth() {
                SyncError::Auth("no valid credential".to_string())
            } else {
                e
            }
        })?;

        self.persist_rotation(&response, None)?;
        tracing::info!("Bootstrap code exchanged for a fresh token pair");
        Ok(response.access_token)
    }

    /// Persist the refresh token when it differs from the one we sent.
    /// Exactly one store write per rotation.
    fn persist_rotation(&self, response: &TokenResponse, sent: Option<&str>) -> Result<()> {
        if sent == Some(response.refresh_token.as_str()) {
            return Ok(());
        }

        let credential = Credential {
            access_token: Some(response.access_token.clone()),
            refresh_token: response.refresh_token.clone(),
            expires_at: response.expires_at,
        };
        self.store.save(&credential)?;
        tracing::info!("Rotated refresh token persisted");
        Ok(())
    }
}
