//! Shared ambient layer for the OTA trust primitives.
//!
//! This crate holds the pieces every other crate in the workspace leans on:
//! typed configuration loaded from TOML, structured logging bootstrap, and
//! the error type used while loading them.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CertificateConfig, DigestConfig, KeygenConfig, ProviderConfig, TrustConfig};
pub use error::{Error, Result};
