//! Issuer transport port
//!
//! Raw calls against the QR login issuer. The poll loop, cookie merging
//! and timing live in [`IssuerClient`](crate::IssuerClient); adapters only
//! translate one HTTP exchange into one typed reply.

use async_trait::async_trait;
use qrslot_domain::{Credential, PollStatus};

/// Errors surfaced by the handshake layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IssuerError {
    /// Network failure, 5xx, or a refused challenge request.
    #[error("issuer unavailable: {0}")]
    Unavailable(String),

    /// The issuer expired the challenge.
    #[error("QR code expired")]
    Expired,

    /// The poll budget ran out before the login was confirmed.
    #[error("timed out waiting for the QR code to be confirmed")]
    Timeout,

    /// The issuer answered with an unexpected payload.
    #[error("malformed issuer response: {0}")]
    MalformedResponse(String),

    /// The challenge payload could not be turned into an artifact.
    #[error("failed to render challenge: {0}")]
    Render(String),

    /// The caller abandoned the handshake.
    #[error("handshake cancelled")]
    Cancelled,
}

/// A freshly issued challenge, before it is stamped and rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeGrant {
    /// Opaque poll key.
    pub key: String,
    /// Payload to encode into the QR code.
    pub url: String,
}

/// One status query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReply {
    /// Interpreted status.
    pub status: PollStatus,
    /// Cookies the issuer set on this response.
    pub cookies: Credential,
}

impl PollReply {
    /// A reply that set no cookies.
    #[must_use]
    pub fn status(status: PollStatus) -> Self {
        Self {
            status,
            cookies: Credential::new(),
        }
    }
}

/// Port for the issuer's HTTP API.
#[async_trait]
pub trait IssuerApi: Send + Sync {
    /// Requests a new challenge.
    ///
    /// # Errors
    /// [`IssuerError::Unavailable`] on transport failure or a non-zero code,
    /// [`IssuerError::MalformedResponse`] if the payload lacks key or url.
    async fn request_challenge(&self) -> Result<ChallengeGrant, IssuerError>;

    /// Queries the status of the challenge identified by `key`.
    ///
    /// # Errors
    /// [`IssuerError::Unavailable`] on transport failure,
    /// [`IssuerError::MalformedResponse`] on an unreadable payload.
    async fn query_status(&self, key: &str) -> Result<PollReply, IssuerError>;

    /// Visits the landing page with `session` attached and returns the
    /// cookies it sets.
    ///
    /// # Errors
    /// [`IssuerError::Unavailable`] on transport failure.
    async fn complement(&self, session: &Credential) -> Result<Credential, IssuerError>;
}
