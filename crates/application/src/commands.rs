//! Operator commands.
//!
//! The only layer that turns typed failures into operator-facing outcomes.
//! Each command acquires its own panel token; a login handshake can take
//! minutes, so the token used to store its result is acquired afterwards.

use std::fmt;

use qrslot_domain::{AppConfig, DomainError, EnvMapping, EnvMappingEntry, OwnerId};
use thiserror::Error;

use crate::issuer_client::IssuerClient;
use crate::ports::{
    CancellationReceiver, ChallengePresenter, ChallengeRenderer, IssuerApi, PanelError,
    PanelStore, PanelToken,
};
use crate::session::{Authenticator, SessionError, SessionPurpose};
use crate::slot_store::{SlotError, SlotStore, UpsertAction};

/// Command failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The handshake did not produce an acceptable credential.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The slot pool refused the operation.
    #[error(transparent)]
    Slot(#[from] SlotError),

    /// The panel could not be reached or refused a request.
    #[error(transparent)]
    Panel(#[from] PanelError),

    /// Test mode stopped the command before its handshake.
    #[error("test mode is on, {0} handshake skipped")]
    TestMode(SessionPurpose),
}

/// Outcome of a mutating command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReport {
    /// What happened.
    pub summary: String,
    /// Slots in use afterwards, if known.
    pub count: Option<usize>,
    /// Configured maximum.
    pub capacity: usize,
}

impl fmt::Display for CommandReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary)?;
        if let Some(count) = self.count {
            write!(f, " ({count}/{})", self.capacity)?;
        }
        Ok(())
    }
}

/// Current pool usage and mapped panel variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Slots in use.
    pub count: usize,
    /// Configured maximum.
    pub capacity: usize,
    /// Each mapped variable with its current panel value.
    pub settings: Vec<(EnvMappingEntry, Option<String>)>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slots: {}/{}", self.count, self.capacity)?;
        for (entry, value) in &self.settings {
            write!(
                f,
                "\n{} ({}): {}",
                entry.description,
                entry.variable,
                value.as_deref().unwrap_or("unset")
            )?;
        }
        Ok(())
    }
}

/// Create, verify, remove and status commands over one slot pool.
pub struct CredentialService<A, R, P> {
    authenticator: Authenticator<A, R>,
    slots: SlotStore<P>,
    env_mapping: EnvMapping,
    verify_before_remove: bool,
    test_mode: bool,
}

impl<A, R, P> CredentialService<A, R, P>
where
    A: IssuerApi,
    R: ChallengeRenderer,
    P: PanelStore,
{
    /// Wires the service from configuration.
    ///
    /// # Errors
    /// [`DomainError::InvalidEnvMapping`] if any mapping line is malformed.
    pub fn new(issuer: IssuerClient<A, R>, panel: P, config: &AppConfig) -> Result<Self, DomainError> {
        Ok(Self {
            authenticator: Authenticator::new(issuer, config.polling),
            slots: SlotStore::new(panel, &config.slots),
            env_mapping: EnvMapping::parse(&config.env_mapping, true)?,
            verify_before_remove: config.slots.verify_before_remove,
            test_mode: config.slots.test_mode,
        })
    }

    /// The slot store.
    pub const fn slots(&self) -> &SlotStore<P> {
        &self.slots
    }

    /// Logs `owner` in with a QR handshake and stores the credential.
    ///
    /// Refuses before any handshake when the pool is full and the owner
    /// holds no slot.
    ///
    /// # Errors
    /// Any [`CommandError`]; nothing is stored on failure.
    pub async fn create(
        &self,
        owner: &OwnerId,
        presenter: &dyn ChallengePresenter,
        cancel: &CancellationReceiver,
    ) -> Result<CommandReport, CommandError> {
        let token = self.token().await?;
        self.slots.ensure_room_for(&token, owner).await?;
        if self.test_mode {
            return Err(CommandError::TestMode(SessionPurpose::Login));
        }

        let session = self.authenticator.begin(SessionPurpose::Login, owner).await?;
        presenter.present(SessionPurpose::Login, owner, session.artifact());
        let credential = session.run(cancel).await?;

        let token = self.token().await?;
        let outcome = self.slots.upsert(&token, owner, &credential).await?;
        let verb = match outcome.action {
            UpsertAction::Created => "stored in new slot",
            UpsertAction::Updated => "refreshed in slot",
        };
        Ok(CommandReport {
            summary: format!("credential for {owner} {verb} {}", outcome.name),
            count: self.count_after(&token).await,
            capacity: self.slots.capacity(),
        })
    }

    /// Removes `owner`'s slot after proving control of the account.
    ///
    /// Without `verify_before_remove` this is [`Self::remove`].
    ///
    /// # Errors
    /// [`SlotError::NotFound`] before any handshake when the owner holds
    /// no slot, otherwise any [`CommandError`].
    pub async fn verify_then_remove(
        &self,
        owner: &OwnerId,
        presenter: &dyn ChallengePresenter,
        cancel: &CancellationReceiver,
    ) -> Result<CommandReport, CommandError> {
        if !self.verify_before_remove {
            return self.remove(owner).await;
        }
        let token = self.token().await?;
        if self.slots.find(&token, owner).await?.is_none() {
            return Err(SlotError::NotFound(owner.clone()).into());
        }
        if self.test_mode {
            return Err(CommandError::TestMode(SessionPurpose::Verify));
        }

        let session = self.authenticator.begin(SessionPurpose::Verify, owner).await?;
        presenter.present(SessionPurpose::Verify, owner, session.artifact());
        session.run(cancel).await?;

        self.remove(owner).await
    }

    /// Removes `owner`'s slot without a handshake.
    ///
    /// # Errors
    /// Any [`SlotError`] or a token failure.
    pub async fn remove(&self, owner: &OwnerId) -> Result<CommandReport, CommandError> {
        let token = self.token().await?;
        let outcome = self.slots.remove(&token, owner).await?;
        Ok(CommandReport {
            summary: outcome.to_string(),
            count: outcome.remaining,
            capacity: self.slots.capacity(),
        })
    }

    /// Reports pool usage and the mapped panel variables.
    ///
    /// # Errors
    /// A panel failure.
    pub async fn status(&self) -> Result<StatusReport, CommandError> {
        let token = self.token().await?;
        let count = self.slots.occupancy(&token).await?;
        let settings = if self.env_mapping.is_empty() {
            Vec::new()
        } else {
            let records = self.slots.panel().list_records(&token, None).await?;
            self.env_mapping
                .entries()
                .iter()
                .map(|entry| {
                    let value = records
                        .iter()
                        .find(|r| r.name == entry.variable)
                        .map(|r| r.value.clone());
                    (entry.clone(), value)
                })
                .collect()
        };
        Ok(StatusReport {
            count,
            capacity: self.slots.capacity(),
            settings,
        })
    }

    async fn token(&self) -> Result<PanelToken, PanelError> {
        self.slots.panel().acquire_token().await.inspect_err(|e| {
            tracing::error!(error = %e, "panel token request failed");
        })
    }

    async fn count_after(&self, token: &PanelToken) -> Option<usize> {
        match self.slots.occupancy(token).await {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!(error = %e, "slot recount failed");
                None
            }
        }
    }
}
