//! Storefront Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports defined in the
//! application layer, plus configuration loading and log setup for binaries.

pub mod adapters;
pub mod config;
pub mod error;
pub mod logging;
pub mod persistence;

pub use adapters::{ReqwestTransport, SystemClock};
pub use config::{AppConfig, LogFormat, LoggingConfig};
pub use error::InfraError;
pub use persistence::{FileCredentialStorage, InMemoryCredentialStorage};
