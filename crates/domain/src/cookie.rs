//! `Set-Cookie` parsing.
//!
//! The issuer hands out session attributes as cookies, first on the
//! confirming poll response and then on the landing page visit. Only the
//! name/value pair ends up in a [`Credential`](crate::Credential); the
//! attributes are parsed so that cookies the server is clearing can be
//! told apart from cookies it is setting.

use chrono::{DateTime, Utc};

/// A single parsed `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// `Expires` attribute.
    pub expires: Option<DateTime<Utc>>,
    /// `Max-Age` attribute in seconds.
    pub max_age: Option<i64>,
}

impl SetCookie {
    /// Parse from a `Set-Cookie` header value.
    ///
    /// Returns `None` when the first segment is not a `name=value` pair or
    /// the name is empty.
    #[must_use]
    pub fn parse(header: &str) -> Option<Self> {
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Self {
            name: name.to_string(),
            value: value.trim().trim_matches('"').to_string(),
            expires: None,
            max_age: None,
        };

        for part in parts {
            let Some((attr, val)) = part.trim().split_once('=') else {
                // Flags such as HttpOnly / Secure carry nothing we keep.
                continue;
            };
            let val = val.trim();
            match attr.trim().to_ascii_lowercase().as_str() {
                "expires" => {
                    cookie.expires = DateTime::parse_from_rfc2822(val)
                        .ok()
                        .map(|exp| exp.with_timezone(&Utc));
                }
                "max-age" => cookie.max_age = val.parse::<i64>().ok(),
                _ => {}
            }
        }

        Some(cookie)
    }

    /// True when the header asks the client to drop the cookie.
    ///
    /// `Max-Age` takes precedence over `Expires`, as in RFC 6265.
    #[must_use]
    pub fn is_removal(&self, now: DateTime<Utc>) -> bool {
        if let Some(max_age) = self.max_age {
            return max_age <= 0;
        }
        self.expires.is_some_and(|exp| exp <= now)
    }
}
