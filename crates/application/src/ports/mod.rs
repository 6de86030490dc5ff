//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the application core and external systems.
//! Each port is a trait that can be implemented by adapters in the infrastructure layer.

mod cancellation;
mod issuer;
mod panel;
mod renderer;

pub use cancellation::{CancellationReceiver, CancellationToken};
pub use issuer::{ChallengeGrant, IssuerApi, IssuerError, PollReply};
pub use panel::{PanelError, PanelStore, PanelToken};
pub use renderer::{ChallengePresenter, ChallengeRenderer, RenderedChallenge};
