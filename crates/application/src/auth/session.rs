//! Session state derived from the held token pair.

use serde::Serialize;

/// What the held credentials currently allow.
///
/// Never stored; always recomputed from the token pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// No usable credential is held.
    #[default]
    LoggedOut,
    /// The access token looks valid.
    Active {
        /// Seconds until the access token expires.
        expires_in_secs: i64,
    },
    /// The access token is absent or expired but the refresh token looks
    /// valid; the next request will refresh first.
    NeedsRefresh,
}

impl SessionState {
    /// Returns true while requests can be authorized without a new login.
    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        matches!(self, Self::Active { .. } | Self::NeedsRefresh)
    }

    /// Get a user-friendly display message.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::LoggedOut => "Not logged in".to_string(),
            Self::Active { expires_in_secs } => {
                let secs = *expires_in_secs;
                if secs > 3600 {
                    format!("Logged in, access token valid for {} hours", secs / 3600)
                } else if secs > 60 {
                    format!("Logged in, access token valid for {} minutes", secs / 60)
                } else {
                    format!("Logged in, access token valid for {secs} seconds")
                }
            }
            Self::NeedsRefresh => "Logged in, access token will be refreshed".to_string(),
        }
    }
}
