//! Storefront Application - Authenticated client core
//!
//! This crate holds the token store, the authenticated request client and
//! the ports it depends on. Transport and storage adapters live in the
//! infrastructure crate.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod ports;

#[cfg(test)]
mod test_support;

pub use auth::{Credentials, SessionState, TokenPolicy, TokenStore};
pub use client::AuthenticatedClient;
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, ClientResult, ErrorCategory};
pub use ports::{
    Clock, CredentialStorage, HttpTransport, StorageError, StoredCredentials, TransportError,
};
