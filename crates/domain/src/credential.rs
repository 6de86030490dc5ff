//! Session credentials collected from the issuer.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::owner::is_numeric;

/// Attribute carrying the numeric account id.
pub const OWNER_ID_ATTR: &str = "DedeUserID";
/// Attribute carrying the session secret.
pub const SESSION_SECRET_ATTR: &str = "SESSDATA";
/// Attribute carrying the anti-forgery token.
pub const CSRF_TOKEN_ATTR: &str = "bili_jct";

/// Attributes a credential must carry to be trusted.
pub const REQUIRED_ATTRS: [&str; 3] = [OWNER_ID_ATTR, SESSION_SECRET_ATTR, CSRF_TOKEN_ATTR];

/// Minimum length of the session secret.
pub const MIN_SESSION_SECRET_LEN: usize = 20;
/// Exact length of the anti-forgery token.
pub const CSRF_TOKEN_LEN: usize = 32;

/// Attribute name to value mapping extracted from an authenticated session.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential {
    attributes: BTreeMap<String, String>,
}

impl Credential {
    /// Creates an empty credential.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a credential from name/value pairs; later pairs win.
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut credential = Self::new();
        for (name, value) in pairs {
            credential.insert(name, value);
        }
        credential
    }

    /// Sets an attribute, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Removes an attribute.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.attributes.remove(name)
    }

    /// Merges `other` into `self`; attributes in `other` win.
    pub fn merge(&mut self, other: Self) {
        self.attributes.extend(other.attributes);
    }

    /// Gets an attribute value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// True if the attribute is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// The owner id attribute, if present.
    #[must_use]
    pub fn owner_id(&self) -> Option<&str> {
        self.get(OWNER_ID_ATTR)
    }

    /// Attribute names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// True if there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Serializes to `name=value; name=value`, the form stored in a slot.
    #[must_use]
    pub fn to_cookie_header(&self) -> String {
        self.attributes
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Checks the credential's shape before it is trusted.
    ///
    /// # Errors
    /// Returns the first violated rule, in this order: missing required
    /// attributes (all of them listed), non-numeric owner id, short session
    /// secret, wrong-length anti-forgery token.
    pub fn validate(&self) -> Result<(), CredentialError> {
        let missing: Vec<String> = REQUIRED_ATTRS
            .iter()
            .filter(|name| !self.contains(name))
            .map(|name| (*name).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(CredentialError::MissingFields(missing));
        }

        let owner = self.get(OWNER_ID_ATTR).unwrap_or_default();
        if !is_numeric(owner) {
            return Err(CredentialError::NonNumericOwnerId);
        }

        let secret_len = self.get(SESSION_SECRET_ATTR).map_or(0, |v| v.chars().count());
        if secret_len < MIN_SESSION_SECRET_LEN {
            return Err(CredentialError::ShortSessionSecret { len: secret_len });
        }

        let token_len = self.get(CSRF_TOKEN_ATTR).map_or(0, |v| v.chars().count());
        if token_len != CSRF_TOKEN_LEN {
            return Err(CredentialError::TokenLength { len: token_len });
        }

        Ok(())
    }
}

// Values are session secrets; only names are printed.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("attributes", &self.attributes.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Why a credential was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// One or more required attributes are absent.
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    /// The owner id attribute is not numeric.
    #[error("DedeUserID is not numeric")]
    NonNumericOwnerId,

    /// The session secret is too short.
    #[error("SESSDATA too short ({len} < 20)")]
    ShortSessionSecret {
        /// Observed length.
        len: usize,
    },

    /// The anti-forgery token does not have the expected length.
    #[error("bili_jct has length {len}, expected 32")]
    TokenLength {
        /// Observed length.
        len: usize,
    },
}

/// Validates a credential. See [`Credential::validate`].
///
/// # Errors
/// Returns the violated rule.
pub fn validate(credential: &Credential) -> Result<(), CredentialError> {
    credential.validate()
}
