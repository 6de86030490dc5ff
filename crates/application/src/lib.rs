//! QrSlot Application - Use cases and ports
//!
//! This crate defines the application layer with:
//! - Port traits for the issuer transport, the panel store and challenge rendering
//! - The QR handshake poll engine and login/verification sessions
//! - The dense slot allocator over panel records
//! - Operator commands and their typed failures

pub mod commands;
pub mod issuer_client;
pub mod ports;
pub mod session;
pub mod slot_store;

#[cfg(test)]
mod testing;

pub use commands::{CommandError, CommandReport, CredentialService, StatusReport};
pub use issuer_client::{IssuerClient, PendingChallenge};
pub use ports::{
    CancellationReceiver, CancellationToken, ChallengeGrant, ChallengePresenter,
    ChallengeRenderer, IssuerApi, IssuerError, PanelError, PanelStore, PanelToken, PollReply,
    RenderedChallenge,
};
pub use session::{AuthSession, Authenticator, SessionError, SessionPurpose};
pub use slot_store::{RemoveOutcome, SlotError, SlotStore, UpsertAction, UpsertOutcome};
