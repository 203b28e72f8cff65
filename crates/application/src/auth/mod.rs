//! Token lifecycle for the authenticated client.
//!
//! This module provides:
//! - The shared token store with expiry evaluation and persistence
//! - Session state derived from the held pair

mod session;
mod token_store;

pub use session::SessionState;
pub use token_store::{Credentials, TokenPolicy, TokenStore};
