//! Authenticated client for the storefront backend.

mod account;
mod background;
mod request_client;

pub use request_client::AuthenticatedClient;

#[cfg(test)]
mod tests;
