//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during parsing or validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An owner identifier is empty or not purely numeric.
    #[error("invalid owner identifier: {0:?}")]
    InvalidOwnerId(String),

    /// The environment mapping text contains malformed lines.
    #[error("invalid env mapping, bad lines: {}", format_bad_lines(.0))]
    InvalidEnvMapping(Vec<(usize, String)>),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

fn format_bad_lines(lines: &[(usize, String)]) -> String {
    lines
        .iter()
        .map(|(number, content)| format!("line {number}: {content:?}"))
        .collect::<Vec<_>>()
        .join("; ")
}
