//! Authentication domain types

mod payload;
mod token;

pub use payload::{
    LoginCredentials, LogoutRequest, RefreshRequest, Registration, TokenResponse, User,
};
pub use token::{TokenClaims, TokenDecodeError, TokenPair, decode_claims, is_expired_at, token_preview};
