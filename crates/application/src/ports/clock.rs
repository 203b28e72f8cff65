//! Clock port for token expiry checks

use chrono::{DateTime, Utc};

/// Port for getting the current time.
///
/// Token expiry is evaluated against this clock so tests can move time
/// without waiting.
pub trait Clock: Send + Sync {
    /// Returns the current UTC timestamp.
    fn now(&self) -> DateTime<Utc>;
}
