//! Storefront Domain - Core types
//!
//! This crate defines the data exchanged with the storefront backend and
//! the token pair the client holds. All types here are pure Rust with no
//! I/O dependencies.

pub mod auth;
pub mod catalog;
pub mod error;
pub mod request;
pub mod response;

pub use auth::{
    LoginCredentials, LogoutRequest, RefreshRequest, Registration, TokenClaims, TokenDecodeError,
    TokenPair, TokenResponse, User, decode_claims, is_expired_at, token_preview,
};
pub use catalog::{CartItemRequest, Product};
pub use error::{DomainError, DomainResult};
pub use request::{ApiRequest, HttpMethod, RequestOptions, endpoint_url};
pub use response::{ApiErrorBody, ApiResponse, StatusCode};
