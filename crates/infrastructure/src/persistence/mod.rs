//! Credential storage adapters.

mod file_storage;
mod memory_storage;

pub use file_storage::FileCredentialStorage;
pub use memory_storage::InMemoryCredentialStorage;
