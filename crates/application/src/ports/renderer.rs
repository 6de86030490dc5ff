//! Challenge rendering and presentation ports

use std::fmt;
use std::path::{Path, PathBuf};

use qrslot_domain::{Challenge, OwnerId};

use super::IssuerError;
use crate::session::SessionPurpose;

/// A challenge turned into something a person can scan.
///
/// May own a temporary resource (a file, a buffer handed to a chat
/// layer); it is released when the value is dropped.
pub struct RenderedChallenge {
    payload: String,
    location: Option<PathBuf>,
    _resource: Option<Box<dyn Send + Sync>>,
}

impl RenderedChallenge {
    /// An artifact with no backing resource.
    #[must_use]
    pub fn inline(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            location: None,
            _resource: None,
        }
    }

    /// An artifact stored at `location`, kept alive by `resource`.
    #[must_use]
    pub fn stored<G>(payload: impl Into<String>, location: PathBuf, resource: G) -> Self
    where
        G: Send + Sync + 'static,
    {
        Self {
            payload: payload.into(),
            location: Some(location),
            _resource: Some(Box::new(resource)),
        }
    }

    /// The encoded payload (the login URI).
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Where the artifact is stored, if anywhere.
    #[must_use]
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }
}

impl fmt::Debug for RenderedChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderedChallenge")
            .field("payload", &self.payload)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// Port for turning a challenge into a scannable artifact.
pub trait ChallengeRenderer: Send + Sync {
    /// Renders `challenge`.
    ///
    /// # Errors
    /// [`IssuerError::Render`] if the artifact cannot be produced.
    fn render(&self, challenge: &Challenge) -> Result<RenderedChallenge, IssuerError>;
}

/// Port for showing a rendered challenge to the person who must scan it.
pub trait ChallengePresenter: Send + Sync {
    /// Called once per handshake, before polling starts.
    fn present(&self, purpose: SessionPurpose, owner: &OwnerId, challenge: &RenderedChallenge);
}
