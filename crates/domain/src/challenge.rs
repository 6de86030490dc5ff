//! QR login challenges and the issuer's poll status codes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inner status: login confirmed, session cookies are set.
pub const STATUS_CONFIRMED: i64 = 0;
/// Inner status: the challenge has expired.
pub const STATUS_EXPIRED: i64 = 86038;
/// Inner status: scanned, waiting for confirmation on the device.
pub const STATUS_SCANNED: i64 = 86090;
/// Inner status: not scanned yet.
pub const STATUS_AWAITING_SCAN: i64 = 86101;

/// A login challenge issued by the issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// Opaque key used to poll the challenge.
    pub key: String,
    /// Presentable payload, encoded into the QR code.
    pub url: String,
    /// When the challenge was obtained.
    pub issued_at: DateTime<Utc>,
}

impl Challenge {
    /// Creates a new challenge.
    #[must_use]
    pub fn new(key: impl Into<String>, url: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            url: url.into(),
            issued_at,
        }
    }
}

/// Interpreted result of one status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// Login confirmed.
    Confirmed,
    /// The issuer expired the challenge.
    Expired,
    /// Scanned, awaiting confirmation.
    Scanned,
    /// Waiting for a scan.
    AwaitingScan,
    /// Any other code; polling continues.
    Pending(Option<i64>),
}

impl PollStatus {
    /// Interprets the outer envelope code and the inner `data.code`.
    ///
    /// A non-zero outer code only counts as expiry when the inner code
    /// says so; every other failure keeps the challenge alive.
    #[must_use]
    pub const fn from_codes(outer: i64, inner: Option<i64>) -> Self {
        if outer != 0 {
            return match inner {
                Some(STATUS_EXPIRED) => Self::Expired,
                other => Self::Pending(other),
            };
        }
        match inner {
            Some(STATUS_CONFIRMED) => Self::Confirmed,
            Some(STATUS_EXPIRED) => Self::Expired,
            Some(STATUS_SCANNED) => Self::Scanned,
            Some(STATUS_AWAITING_SCAN) => Self::AwaitingScan,
            other => Self::Pending(other),
        }
    }
}
