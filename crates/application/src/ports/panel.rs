//! Panel store port
//!
//! Whole-record CRUD against the remote panel. Implementations are plain
//! transports: they know nothing about slot prefixes or compaction.

use std::fmt;

use async_trait::async_trait;
use qrslot_domain::{NewRecord, Record, RecordId};

/// Errors that can occur talking to the panel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PanelError {
    /// Base URL, client id or client secret is missing.
    #[error("panel is not configured, missing: {}", .0.join(", "))]
    Misconfigured(Vec<&'static str>),

    /// The panel could not be reached.
    #[error("cannot reach panel: {0}")]
    Unreachable(String),

    /// The request deadline passed.
    #[error("panel request timed out")]
    Timeout,

    /// The panel answered but reported a failure.
    #[error("panel rejected the request: {0}")]
    Rejected(String),

    /// The panel answered with a payload that could not be normalized.
    #[error("malformed panel response: {0}")]
    MalformedResponse(String),
}

/// Bearer token for panel calls.
#[derive(Clone, PartialEq, Eq)]
pub struct PanelToken(String);

impl PanelToken {
    /// Wraps a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for PanelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PanelToken(<redacted>)")
    }
}

/// Port for the panel's record API.
#[async_trait]
pub trait PanelStore: Send + Sync {
    /// Exchanges client credentials for a token.
    ///
    /// # Errors
    /// [`PanelError::Misconfigured`] without any network call when a
    /// setting is empty; transport errors otherwise.
    async fn acquire_token(&self) -> Result<PanelToken, PanelError>;

    /// Lists records, optionally filtered by the panel's search.
    ///
    /// # Errors
    /// Transport errors, [`PanelError::Rejected`] or
    /// [`PanelError::MalformedResponse`].
    async fn list_records(
        &self,
        token: &PanelToken,
        search: Option<&str>,
    ) -> Result<Vec<Record>, PanelError>;

    /// Creates records.
    ///
    /// # Errors
    /// Transport errors or [`PanelError::Rejected`].
    async fn create_records(
        &self,
        token: &PanelToken,
        records: &[NewRecord],
    ) -> Result<(), PanelError>;

    /// Overwrites the record selected by `record.id`, including its name.
    ///
    /// # Errors
    /// Transport errors or [`PanelError::Rejected`].
    async fn update_record(&self, token: &PanelToken, record: &Record) -> Result<(), PanelError>;

    /// Deletes records by id.
    ///
    /// # Errors
    /// Transport errors or [`PanelError::Rejected`].
    async fn delete_records(&self, token: &PanelToken, ids: &[RecordId]) -> Result<(), PanelError>;
}
