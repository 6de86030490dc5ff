//! QR login handshake driver.
//!
//! Wraps an [`IssuerApi`] transport with challenge stamping/rendering and
//! the timed poll loop. Each call to [`IssuerClient::poll_challenge`]
//! collects its own session cookies, so concurrent handshakes never share
//! state.

use std::future::Future;

use chrono::Utc;
use qrslot_domain::{Challenge, Credential, PollPolicy, PollStatus};
use tokio::time::Instant;

use crate::ports::{
    CancellationReceiver, ChallengeRenderer, IssuerApi, IssuerError, RenderedChallenge,
};

/// A challenge ready to be shown and polled.
#[derive(Debug)]
pub struct PendingChallenge {
    /// The challenge as issued.
    pub challenge: Challenge,
    /// Its scannable rendering; dropping it releases any backing resource.
    pub artifact: RenderedChallenge,
}

/// Drives the issuer side of a handshake.
pub struct IssuerClient<A, R> {
    api: A,
    renderer: R,
}

impl<A: IssuerApi, R: ChallengeRenderer> IssuerClient<A, R> {
    /// Creates a new client.
    pub const fn new(api: A, renderer: R) -> Self {
        Self { api, renderer }
    }

    /// Requests a new challenge and renders it.
    ///
    /// # Errors
    /// [`IssuerError::Unavailable`] or [`IssuerError::MalformedResponse`]
    /// from the transport, [`IssuerError::Render`] from the renderer.
    pub async fn generate_challenge(&self) -> Result<PendingChallenge, IssuerError> {
        let grant = self.api.request_challenge().await?;
        let challenge = Challenge::new(grant.key, grant.url, Utc::now());
        let artifact = self.renderer.render(&challenge)?;
        tracing::debug!(issued_at = %challenge.issued_at, "challenge issued");
        Ok(PendingChallenge {
            challenge,
            artifact,
        })
    }

    /// Polls `challenge` until it resolves.
    ///
    /// Queries the issuer every `policy.interval()`. On confirmation the
    /// cookies gathered from poll responses are complemented by a landing
    /// page visit and returned merged. The loop is not restartable: a new
    /// handshake needs a new challenge.
    ///
    /// # Errors
    /// - [`IssuerError::Expired`] as soon as the issuer reports expiry
    /// - [`IssuerError::Timeout`] once `policy.budget()` has elapsed
    /// - [`IssuerError::Cancelled`] within one interval of cancellation
    /// - transport errors from any query, without retry
    pub async fn poll_challenge(
        &self,
        challenge: &Challenge,
        policy: PollPolicy,
        cancel: &CancellationReceiver,
    ) -> Result<Credential, IssuerError> {
        let started = Instant::now();
        let mut session = Credential::new();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            let reply = until_cancelled(cancel, self.api.query_status(&challenge.key)).await??;
            session.merge(reply.cookies);

            match reply.status {
                PollStatus::Confirmed => {
                    let landing = until_cancelled(cancel, self.api.complement(&session)).await??;
                    tracing::debug!(
                        added = ?landing.names().collect::<Vec<_>>(),
                        "complemented session cookies"
                    );
                    session.merge(landing);
                    tracing::info!(attempts, "QR login confirmed");
                    return Ok(session);
                }
                PollStatus::Expired => {
                    tracing::warn!(attempts, "QR code expired");
                    return Err(IssuerError::Expired);
                }
                status => tracing::debug!(?status, attempts, "challenge pending"),
            }

            until_cancelled(cancel, tokio::time::sleep(policy.interval())).await?;

            if started.elapsed() >= policy.budget() {
                tracing::warn!(attempts, budget = ?policy.budget(), "QR login timed out");
                return Err(IssuerError::Timeout);
            }
        }
    }
}

/// Races `future` against cancellation.
async fn until_cancelled<F: Future>(
    cancel: &CancellationReceiver,
    future: F,
) -> Result<F::Output, IssuerError> {
    if cancel.is_cancelled() {
        return Err(IssuerError::Cancelled);
    }
    tokio::select! {
        output = future => Ok(output),
        () = cancel.cancelled() => {
            tracing::info!("handshake cancelled by caller");
            Err(IssuerError::Cancelled)
        }
    }
}
