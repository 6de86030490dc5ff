//! Challenge artifacts stored as temporary files.

use std::io::Write;
use std::path::PathBuf;

use qrslot_application::{ChallengeRenderer, IssuerError, RenderedChallenge};
use qrslot_domain::Challenge;
use tempfile::Builder;

/// Writes each challenge payload to its own temporary file.
///
/// The file lives as long as the returned [`RenderedChallenge`] and is
/// deleted when the handshake ends, however it ends.
#[derive(Debug, Clone, Default)]
pub struct TempFileRenderer {
    dir: Option<PathBuf>,
}

impl TempFileRenderer {
    /// Renderer using the system temporary directory.
    #[must_use]
    pub const fn new() -> Self {
        Self { dir: None }
    }

    /// Renderer writing into `dir`.
    #[must_use]
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }
}

impl ChallengeRenderer for TempFileRenderer {
    fn render(&self, challenge: &Challenge) -> Result<RenderedChallenge, IssuerError> {
        let mut builder = Builder::new();
        builder.prefix("qrslot-challenge-").suffix(".txt");
        let created = match &self.dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        let mut file = created.map_err(|e| IssuerError::Render(e.to_string()))?;
        writeln!(file, "{}", challenge.url).map_err(|e| IssuerError::Render(e.to_string()))?;
        file.flush().map_err(|e| IssuerError::Render(e.to_string()))?;

        let location = file.path().to_path_buf();
        tracing::debug!(path = %location.display(), "challenge artifact written");
        Ok(RenderedChallenge::stored(challenge.url.clone(), location, file))
    }
}
