//! Operator-configured list of panel variables shown by `status`.
//!
//! One entry per line, `description;VARIABLE_NAME`. Blank lines are ignored.

use crate::error::DomainError;

/// A single mapped panel variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvMappingEntry {
    /// Panel variable name.
    pub variable: String,
    /// Human-readable description.
    pub description: String,
}

/// Ordered list of mapped panel variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvMapping {
    entries: Vec<EnvMappingEntry>,
}

impl EnvMapping {
    /// Parses mapping text.
    ///
    /// In strict mode any malformed line fails the whole parse; otherwise
    /// malformed lines are dropped. A repeated variable keeps its first
    /// position and takes the last description.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidEnvMapping`] listing every bad line
    /// (1-based) when `strict` is set.
    pub fn parse(raw: &str, strict: bool) -> Result<Self, DomainError> {
        let mut mapping = Self::default();
        let mut bad_lines = Vec::new();

        for (number, line) in raw.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let parsed = trimmed
                .split_once(';')
                .map(|(desc, var)| (desc.trim(), var.trim()))
                .filter(|(desc, var)| !desc.is_empty() && !var.is_empty());
            match parsed {
                Some((description, variable)) => mapping.insert(variable, description),
                None => bad_lines.push((number + 1, line.to_string())),
            }
        }

        if strict && !bad_lines.is_empty() {
            return Err(DomainError::InvalidEnvMapping(bad_lines));
        }
        Ok(mapping)
    }

    fn insert(&mut self, variable: &str, description: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.variable == variable) {
            entry.description = description.to_string();
        } else {
            self.entries.push(EnvMappingEntry {
                variable: variable.to_string(),
                description: description.to_string(),
            });
        }
    }

    /// Entries in configuration order.
    #[must_use]
    pub fn entries(&self) -> &[EnvMappingEntry] {
        &self.entries
    }

    /// True if nothing is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
