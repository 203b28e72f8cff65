//! Timer-driven refresh for long-lived sessions.

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::AuthenticatedClient;
use crate::ports::HttpTransport;

impl<T: HttpTransport + 'static> AuthenticatedClient<T> {
    /// Refreshes ahead of expiry every `background_refresh_secs`.
    ///
    /// A tick refreshes only when a refresh token is held and the access
    /// token is missing or would expire before the next tick. Ticks go
    /// through the same refresh gate as request-driven refreshes, and a
    /// failed tick clears the session like any other failed refresh.
    ///
    /// Returns `None` when the timer is disabled. Abort the handle to stop it.
    #[must_use]
    pub fn spawn_background_refresh(&self) -> Option<JoinHandle<()>> {
        let period = self.config.background_refresh_interval()?;
        let horizon = chrono::Duration::from_std(period).unwrap_or(chrono::Duration::MAX);
        let client = self.clone();
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let held = client.tokens.snapshot().await;
                if held.refresh_token.is_none() {
                    continue;
                }
                let due = held
                    .access_token
                    .as_deref()
                    .is_none_or(|token| client.tokens.expires_within(token, horizon));
                if !due {
                    debug!("access token outlives the next tick, skipping scheduled refresh");
                    continue;
                }
                if let Err(e) = client.refresh().await {
                    warn!(error = %e, "scheduled refresh failed");
                }
            }
        }))
    }
}
