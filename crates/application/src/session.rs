//! Login and identity-verification sessions.
//!
//! An [`AuthSession`] is one handshake: it holds the issued challenge until
//! [`AuthSession::run`] polls it to a terminal result. Nothing is persisted.

use std::fmt;

use qrslot_domain::{Challenge, Credential, CredentialError, OwnerId, PollPolicy};
use thiserror::Error;

use crate::issuer_client::{IssuerClient, PendingChallenge};
use crate::ports::{
    CancellationReceiver, ChallengeRenderer, IssuerApi, IssuerError, RenderedChallenge,
};

/// Why a handshake is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPurpose {
    /// Obtain a credential to store.
    Login,
    /// Prove control of an account before a destructive action.
    Verify,
}

impl fmt::Display for SessionPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login => f.write_str("login"),
            Self::Verify => f.write_str("verification"),
        }
    }
}

/// Handshake failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The issuer side failed, expired, timed out or was cancelled.
    #[error(transparent)]
    Issuer(#[from] IssuerError),

    /// The completed credential did not pass validation.
    #[error("invalid credential: {0}")]
    InvalidCredential(#[from] CredentialError),

    /// Someone else scanned the code.
    #[error("QR code was confirmed by {}, expected {expected}", .actual.as_deref().unwrap_or("an unknown account"))]
    OwnerMismatch {
        /// Owner the session was started for.
        expected: OwnerId,
        /// Owner id found in the credential, if any.
        actual: Option<String>,
    },
}

/// Starts handshakes with a fixed poll policy.
pub struct Authenticator<A, R> {
    issuer: IssuerClient<A, R>,
    policy: PollPolicy,
}

impl<A: IssuerApi, R: ChallengeRenderer> Authenticator<A, R> {
    /// Creates an authenticator.
    pub const fn new(issuer: IssuerClient<A, R>, policy: PollPolicy) -> Self {
        Self { issuer, policy }
    }

    /// The poll policy every session uses.
    pub const fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Issues a challenge for `owner`.
    ///
    /// # Errors
    /// The issuer or renderer failure.
    pub async fn begin(
        &self,
        purpose: SessionPurpose,
        owner: &OwnerId,
    ) -> Result<AuthSession<'_, A, R>, SessionError> {
        let pending = self.issuer.generate_challenge().await?;
        tracing::info!(%purpose, %owner, "handshake started");
        Ok(AuthSession {
            authenticator: self,
            purpose,
            owner: owner.clone(),
            pending,
        })
    }
}

/// One in-flight handshake.
pub struct AuthSession<'a, A, R> {
    authenticator: &'a Authenticator<A, R>,
    purpose: SessionPurpose,
    owner: OwnerId,
    pending: PendingChallenge,
}

impl<A: IssuerApi, R: ChallengeRenderer> AuthSession<'_, A, R> {
    /// Why this session runs.
    pub const fn purpose(&self) -> SessionPurpose {
        self.purpose
    }

    /// The issued challenge.
    pub const fn challenge(&self) -> &Challenge {
        &self.pending.challenge
    }

    /// The scannable artifact.
    pub const fn artifact(&self) -> &RenderedChallenge {
        &self.pending.artifact
    }

    /// Polls the challenge to completion and checks the result.
    ///
    /// Login sessions validate the credential shape; both purposes require
    /// the credential to belong to the requested owner. The artifact is
    /// released when this returns.
    ///
    /// # Errors
    /// - [`SessionError::Issuer`] for expiry, timeout, cancellation or transport failures
    /// - [`SessionError::InvalidCredential`] for a login credential that fails validation
    /// - [`SessionError::OwnerMismatch`] if another account confirmed the code
    pub async fn run(self, cancel: &CancellationReceiver) -> Result<Credential, SessionError> {
        let Self {
            authenticator,
            purpose,
            owner,
            pending,
        } = self;
        let credential = authenticator
            .issuer
            .poll_challenge(&pending.challenge, authenticator.policy, cancel)
            .await?;
        drop(pending);

        if purpose == SessionPurpose::Login {
            credential.validate().inspect_err(|e| {
                tracing::warn!(%owner, reason = %e, "credential rejected");
            })?;
        }
        if credential.owner_id() != Some(owner.as_str()) {
            let actual = credential.owner_id().map(ToString::to_string);
            tracing::warn!(%owner, ?actual, "QR code confirmed by another account");
            return Err(SessionError::OwnerMismatch {
                expected: owner,
                actual,
            });
        }
        tracing::info!(%purpose, %owner, "handshake completed");
        Ok(credential)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedIssuer, TextRenderer};
    use qrslot_domain::PollStatus;

    fn authenticator(issuer: ScriptedIssuer) -> Authenticator<ScriptedIssuer, TextRenderer> {
        Authenticator::new(IssuerClient::new(issuer, TextRenderer), PollPolicy::default())
    }

    fn owner() -> OwnerId {
        OwnerId::from(123)
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_returns_validated_credential() {
        let auth = authenticator(ScriptedIssuer::confirming("123"));
        let session = auth.begin(SessionPurpose::Login, &owner()).await.unwrap();
        assert_eq!(session.artifact().payload(), session.challenge().url);

        let credential = session.run(&CancellationReceiver::never()).await.unwrap();

        assert_eq!(credential.owner_id(), Some("123"));
        assert!(credential.validate().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_rejects_short_secret() {
        let issuer = ScriptedIssuer::confirming("123").with_cookie("SESSDATA", "short");
        let auth = authenticator(issuer);
        let session = auth.begin(SessionPurpose::Login, &owner()).await.unwrap();

        let result = session.run(&CancellationReceiver::never()).await;

        assert_eq!(
            result,
            Err(SessionError::InvalidCredential(
                CredentialError::ShortSessionSecret { len: 5 }
            ))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_verify_skips_shape_validation() {
        let issuer = ScriptedIssuer::confirming("123").with_cookie("bili_jct", "x");
        let auth = authenticator(issuer);
        let session = auth.begin(SessionPurpose::Verify, &owner()).await.unwrap();

        assert!(session.run(&CancellationReceiver::never()).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_owner_mismatch() {
        for purpose in [SessionPurpose::Login, SessionPurpose::Verify] {
            let auth = authenticator(ScriptedIssuer::confirming("999"));
            let session = auth.begin(purpose, &owner()).await.unwrap();
            let result = session.run(&CancellationReceiver::never()).await;
            assert_eq!(
                result,
                Err(SessionError::OwnerMismatch {
                    expected: owner(),
                    actual: Some("999".to_string()),
                })
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_passes_through() {
        let auth = authenticator(ScriptedIssuer::new([PollStatus::Expired]));
        let session = auth.begin(SessionPurpose::Login, &owner()).await.unwrap();

        let result = session.run(&CancellationReceiver::never()).await;

        assert_eq!(result, Err(SessionError::Issuer(IssuerError::Expired)));
    }
}
