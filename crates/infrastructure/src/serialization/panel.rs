//! Panel payload normalization.
//!
//! Panel versions disagree on response shapes: record lists arrive bare or
//! wrapped in `{code, data}` envelopes (with or without `items`), and
//! `id`/`name`/`remarks` are sometimes serialized as byte arrays. Everything
//! is normalized to [`Record`] here; nothing past this module sees raw JSON.

use qrslot_application::{PanelError, PanelToken};
use qrslot_domain::{Record, RecordId};
use serde::Deserialize;
use serde_json::Value;

/// Code the panel uses for success.
pub const PANEL_OK: i64 = 200;

/// A string field that may have been sent as raw bytes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Text {
    Text(String),
    Bytes(Vec<u8>),
}

impl Text {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Bytes(b) => String::from_utf8_lossy(&b).into_owned(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
    Bytes(Vec<u8>),
}

impl From<RawId> for RecordId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Number(n) => Self::Number(n),
            RawId::Text(s) => Self::Text(s),
            RawId::Bytes(b) => Self::Text(String::from_utf8_lossy(&b).into_owned()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    id: RawId,
    name: Text,
    #[serde(default)]
    value: Option<Text>,
    #[serde(default)]
    remarks: Option<Text>,
}

impl From<RawRecord> for Record {
    fn from(raw: RawRecord) -> Self {
        Self {
            id: raw.id.into(),
            name: raw.name.into_string(),
            value: raw.value.map(Text::into_string).unwrap_or_default(),
            remarks: raw.remarks.map(Text::into_string).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    code: Option<i64>,
    #[serde(default, alias = "msg")]
    message: Option<String>,
    #[serde(default)]
    data: Value,
}

impl Envelope {
    fn parse(body: &[u8]) -> Result<Self, PanelError> {
        serde_json::from_slice(body).map_err(|e| PanelError::MalformedResponse(e.to_string()))
    }

    fn ensure_ok(self) -> Result<Value, PanelError> {
        if self.code == Some(PANEL_OK) {
            return Ok(self.data);
        }
        Err(PanelError::Rejected(self.message.unwrap_or_else(|| {
            self.code
                .map_or_else(|| "missing status code".to_string(), |c| format!("code {c}"))
        })))
    }
}

/// Parses a record listing.
///
/// # Errors
/// [`PanelError::Rejected`] for a non-200 envelope,
/// [`PanelError::MalformedResponse`] for anything unrecognizable.
pub fn parse_record_list(body: &[u8]) -> Result<Vec<Record>, PanelError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| PanelError::MalformedResponse(e.to_string()))?;
    let items = match value {
        Value::Array(_) => value,
        Value::Object(_) => {
            let envelope: Envelope = serde_json::from_value(value)
                .map_err(|e| PanelError::MalformedResponse(e.to_string()))?;
            match envelope.ensure_ok()? {
                Value::Object(mut data) => data.remove("items").unwrap_or(Value::Array(Vec::new())),
                list @ Value::Array(_) => list,
                Value::Null => Value::Array(Vec::new()),
                other => {
                    return Err(PanelError::MalformedResponse(format!(
                        "unexpected data payload: {other}"
                    )));
                }
            }
        }
        other => {
            return Err(PanelError::MalformedResponse(format!(
                "expected a record list, got {other}"
            )));
        }
    };
    let raw: Vec<RawRecord> =
        serde_json::from_value(items).map_err(|e| PanelError::MalformedResponse(e.to_string()))?;
    Ok(raw.into_iter().map(Record::from).collect())
}

/// Parses a token response `{code: 200, data: {token}}`.
///
/// # Errors
/// [`PanelError::Rejected`] unless the envelope succeeded with a token.
pub fn parse_token(body: &[u8]) -> Result<PanelToken, PanelError> {
    let data = Envelope::parse(body)?.ensure_ok()?;
    data.get("token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(PanelToken::new)
        .ok_or_else(|| PanelError::Rejected("token missing from response".to_string()))
}

/// Checks a mutation acknowledgement `{code: 200, ...}`.
///
/// # Errors
/// [`PanelError::Rejected`] with the panel's message otherwise.
pub fn parse_ack(body: &[u8]) -> Result<(), PanelError> {
    Envelope::parse(body)?.ensure_ok().map(drop)
}
