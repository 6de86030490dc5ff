//! Process configuration.
//!
//! Built once at startup and handed to each component's constructor.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Issuer endpoints and request settings.
    pub issuer: IssuerConfig,
    /// Panel connection settings.
    pub panel: PanelConfig,
    /// Slot pool settings.
    pub slots: SlotConfig,
    /// Handshake poll cadence.
    pub polling: PollPolicy,
    /// `description;VARIABLE` lines reported by `status`.
    pub env_mapping: String,
}

impl AppConfig {
    /// Checks value ranges that serde cannot express.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidConfig`] describing the first bad value.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.slots.prefix.is_empty() {
            return Err(DomainError::InvalidConfig(
                "slots.prefix must not be empty".to_string(),
            ));
        }
        if self.slots.owner_tag_prefix.is_empty() {
            return Err(DomainError::InvalidConfig(
                "slots.owner_tag_prefix must not be empty".to_string(),
            ));
        }
        if self.polling.interval_secs == 0 {
            return Err(DomainError::InvalidConfig(
                "polling.interval_secs must be positive".to_string(),
            ));
        }
        if self.polling.budget_secs < self.polling.interval_secs {
            return Err(DomainError::InvalidConfig(format!(
                "polling.budget_secs ({}) is shorter than one interval ({})",
                self.polling.budget_secs, self.polling.interval_secs
            )));
        }
        Ok(())
    }
}

/// Issuer endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuerConfig {
    /// Challenge generation endpoint.
    pub generate_url: String,
    /// Challenge status endpoint.
    pub poll_url: String,
    /// Landing page visited after login to collect remaining cookies.
    pub landing_url: String,
    /// `User-Agent` sent with every issuer request.
    pub user_agent: String,
    /// Per-request deadline in seconds.
    pub request_timeout_secs: u64,
}

impl IssuerConfig {
    /// Per-request deadline.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            generate_url: "https://passport.bilibili.com/x/passport-login/web/qrcode/generate"
                .to_string(),
            poll_url: "https://passport.bilibili.com/x/passport-login/web/qrcode/poll".to_string(),
            landing_url: "https://www.bilibili.com/".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            request_timeout_secs: 15,
        }
    }
}

/// Panel connection settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Base URL, e.g. `http://127.0.0.1:5700`.
    pub url: String,
    /// Application client id.
    pub client_id: String,
    /// Application client secret.
    pub client_secret: String,
    /// Per-request deadline in seconds.
    pub request_timeout_secs: u64,
}

impl PanelConfig {
    /// True when url, client id and client secret are all non-empty.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [&self.url, &self.client_id, &self.client_secret]
            .iter()
            .all(|value| !value.trim().is_empty())
    }

    /// Names of the settings that are empty.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("panel.url", &self.url),
            ("panel.client_id", &self.client_id),
            ("panel.client_secret", &self.client_secret),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Per-request deadline.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            request_timeout_secs: 15,
        }
    }
}

impl fmt::Debug for PanelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelConfig")
            .field("url", &self.url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Slot pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotConfig {
    /// Record-name prefix shared by all slots.
    pub prefix: String,
    /// Prefix of the owner tag stored in remarks.
    pub owner_tag_prefix: String,
    /// Maximum number of slots.
    pub capacity: usize,
    /// Require a verification handshake before a self-service removal.
    pub verify_before_remove: bool,
    /// Stop before any handshake; used to check panel wiring.
    pub test_mode: bool,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            prefix: "Ray_BiliBiliCookies__".to_string(),
            owner_tag_prefix: "owner-".to_string(),
            capacity: 10,
            verify_before_remove: true,
            test_mode: false,
        }
    }
}

/// Poll cadence for a handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    /// Pause between status queries, in seconds.
    pub interval_secs: u64,
    /// Total time allowed for a handshake, in seconds.
    pub budget_secs: u64,
}

impl PollPolicy {
    /// Creates a policy from whole seconds.
    #[must_use]
    pub const fn new(interval_secs: u64, budget_secs: u64) -> Self {
        Self {
            interval_secs,
            budget_secs,
        }
    }

    /// Pause between status queries.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Total time allowed.
    #[must_use]
    pub const fn budget(&self) -> Duration {
        Duration::from_secs(self.budget_secs)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(2, 120)
    }
}
