//! Wire-format normalization.
//!
//! Remote payloads are decoded into domain types here and nowhere else.

pub mod panel;

pub use panel::{parse_ack, parse_record_list, parse_token};
