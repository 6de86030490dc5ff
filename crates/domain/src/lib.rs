//! QrSlot Domain - Core types
//!
//! This crate defines the domain model for the credential slot manager:
//! session credentials and their validation rules, login challenges, the
//! slot naming convention over panel records, and configuration.
//! All types here are pure Rust with no I/O dependencies.

pub mod challenge;
pub mod config;
pub mod cookie;
pub mod credential;
pub mod env_mapping;
pub mod error;
pub mod owner;
pub mod slot;

pub use challenge::{Challenge, PollStatus};
pub use config::{AppConfig, IssuerConfig, PanelConfig, PollPolicy, SlotConfig};
pub use cookie::SetCookie;
pub use credential::{Credential, CredentialError, validate};
pub use env_mapping::{EnvMapping, EnvMappingEntry};
pub use error::DomainError;
pub use owner::OwnerId;
pub use slot::{NewRecord, Record, RecordId, Slot, SlotNaming};
