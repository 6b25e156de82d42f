// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistent storage for the rotating OAuth credential pair.
//!
//! The provider may issue a new refresh token on every refresh call,
//! invalidating the old one. Losing the rotated value means the process can
//! no longer re-authenticate non-interactively, so `save` overwrites the
//! file atomically (write to a temp file, then rename).

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The OAuth credential pair as persisted on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Short-lived access token; cached only as a convenience, a run never
    /// relies on it being present or valid.
    pub access_token: Option<String>,
    /// Long-lived refresh token; always reflects the most recent rotation.
    pub refresh_token: String,
    /// Unix timestamp of access token expiry, when the provider reported one.
    pub expires_at: Option<i64>,
}

impl Credential {
    pub fn new(refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: None,
            refresh_token: refresh_token.into(),
            expires_at: None,
        }
    }
}

/// Storage contract for the credential pair.
///
/// `load` returning `None` is a degraded mode, not an error: the caller
/// falls back to an environment-supplied seed refresh token.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<Credential>>;
    fn save(&self, credential: &Credential) -> Result<()>;
}

/// File-backed credential store (JSON).
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credential>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SyncError::Storage(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        match serde_json::from_str(&raw) {
            Ok(credential) => Ok(Some(credential)),
            Err(e) => {
                // Unreadable state is treated as absent so a seed credential
                // can take over; the file is rewritten on the next rotation.
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Credential file is not valid JSON, ignoring"
                );
                Ok(None)
            }
        }
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        let json = serde_json::to_string_pretty(credential)
            .map_err(|e| SyncError::Storage(format!("failed to encode credential: {}", e)))?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(|e| {
            SyncError::Storage(format!("failed to write {}: {}", tmp.display(), e))
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            SyncError::Storage(format!(
                "failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })?;

        tracing::debug!(path = %self.path.display(), "Credential persisted");
        Ok(())
    }
}
