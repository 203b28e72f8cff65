//! JSON file credential storage.
//!
//! The record lives in one file, by default
//! `<config dir>/storefront/credentials.json`:
//! ```json
//! {
//!   "access_token": "eyJhbGciOi...",
//!   "refresh_token": "eyJhbGciOi...",
//!   "saved_at": "2026-03-01T12:00:00Z"
//! }
//! ```
//! Writes go to a sibling temp file first and are renamed into place, so a
//! crash mid-write leaves the previous pair intact.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use storefront_application::ports::{CredentialStorage, StorageError, StoredCredentials};
use tokio::fs;
use tokio::sync::watch;
use tracing::warn;

const FILE_NAME: &str = "credentials.json";

/// Credential storage in a JSON file.
#[derive(Debug)]
pub struct FileCredentialStorage {
    path: PathBuf,
    revision: watch::Sender<u64>,
}

impl FileCredentialStorage {
    /// Creates storage backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            path: path.into(),
            revision,
        }
    }

    /// Default location under the user's configuration directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("storefront").join(FILE_NAME))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r = r.wrapping_add(1));
    }
}

/// Two-space indented JSON with a trailing newline.
fn to_json_pretty<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"  ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    buffer.push(b'\n');
    Ok(buffer)
}

fn io_error(path: &Path, e: &std::io::Error) -> StorageError {
    StorageError::Io(format!("{}: {e}", path.display()))
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<(), StorageError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .map_err(|e| io_error(path, &e))
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<(), StorageError> {
    Ok(())
}

#[async_trait]
impl CredentialStorage for FileCredentialStorage {
    async fn load(&self) -> Result<Option<StoredCredentials>, StorageError> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&self.path, &e)),
        };

        match serde_json::from_slice::<StoredCredentials>(&content) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable credentials file");
                Ok(None)
            }
        }
    }

    async fn save(&self, credentials: &StoredCredentials) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, &e))?;
        }

        let content = to_json_pretty(credentials)?;
        let temp = self.temp_path();
        fs::write(&temp, &content)
            .await
            .map_err(|e| io_error(&temp, &e))?;
        restrict_permissions(&temp).await?;
        fs::rename(&temp, &self.path)
            .await
            .map_err(|e| io_error(&self.path, &e))?;

        self.bump();
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(&self.path, &e)),
        }
        self.bump();
        Ok(())
    }

    fn watch(&self) -> Option<watch::Receiver<u64>> {
        Some(self.revision.subscribe())
    }
}
