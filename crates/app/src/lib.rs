//! Storefront CLI - wiring between the command line and the client.

pub mod cli;
pub mod commands;

pub use cli::{Cli, Command};
pub use commands::{CliError, connect, execute};
