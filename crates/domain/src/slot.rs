//! Panel records and the slot naming convention layered on top of them.
//!
//! A slot is a panel record named `<prefix><index>` whose remarks carry the
//! owner tag `<tag prefix><owner id>`. The naming rules live here so that
//! nothing outside the slot store has to know them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::owner::OwnerId;

/// Sort key given to names whose suffix is not an integer.
pub const UNPARSED_INDEX: usize = usize::MAX;

/// Identifier the panel assigns to a record.
///
/// Depending on the panel version this is a number or a string; it is
/// echoed back in the same shape it arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    /// Numeric id.
    Number(i64),
    /// String id.
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

/// A stored panel record, already normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Panel-assigned id.
    pub id: RecordId,
    /// Record name.
    pub name: String,
    /// Stored value.
    pub value: String,
    /// Free-form remarks.
    #[serde(default)]
    pub remarks: String,
}

/// A record to be created; the panel assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    /// Record name.
    pub name: String,
    /// Stored value.
    pub value: String,
    /// Free-form remarks.
    pub remarks: String,
}

/// Naming rules for slot records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotNaming {
    prefix: String,
    owner_tag_prefix: String,
}

impl SlotNaming {
    /// Creates naming rules from a record-name prefix and an owner-tag prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>, owner_tag_prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            owner_tag_prefix: owner_tag_prefix.into(),
        }
    }

    /// The record-name prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Record name for the slot at `index`.
    #[must_use]
    pub fn name_for(&self, index: usize) -> String {
        format!("{}{index}", self.prefix)
    }

    /// True if the record name belongs to the slot pool.
    #[must_use]
    pub fn is_slot_name(&self, name: &str) -> bool {
        name.starts_with(&self.prefix)
    }

    /// Decodes the index from a slot record name.
    ///
    /// Returns `None` when the name lacks the prefix or the suffix is not a
    /// non-negative integer.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        name.strip_prefix(&self.prefix)?.parse().ok()
    }

    /// Remarks value tagging a record as owned by `owner`.
    #[must_use]
    pub fn owner_tag(&self, owner: &OwnerId) -> String {
        format!("{}{owner}", self.owner_tag_prefix)
    }
}

/// A slot record together with its decoded index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// Decoded index, `None` when the name suffix did not parse.
    pub index: Option<usize>,
    /// The underlying record.
    pub record: Record,
}

impl Slot {
    /// Wraps a record, decoding its index with `naming`.
    #[must_use]
    pub fn from_record(record: Record, naming: &SlotNaming) -> Self {
        Self {
            index: naming.index_of(&record.name),
            record,
        }
    }

    /// Index used for ordering; unparsed names sort last.
    #[must_use]
    pub fn sort_key(&self) -> usize {
        self.index.unwrap_or(UNPARSED_INDEX)
    }

    /// True when the slot's remarks carry exactly `tag`.
    #[must_use]
    pub fn is_tagged(&self, tag: &str) -> bool {
        self.record.remarks == tag
    }
}
