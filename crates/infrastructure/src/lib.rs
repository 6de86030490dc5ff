//! QrSlot Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer: reqwest clients for the QR login
//! issuer and the panel, temporary-file challenge artifacts, panel payload
//! normalization and configuration loading.

pub mod adapters;
pub mod config;
pub mod serialization;

pub use adapters::{HttpIssuerApi, HttpPanelClient, TempFileRenderer};
pub use crate::config::{ConfigError, load_config};
