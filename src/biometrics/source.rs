use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use crate::error::GhostError;
use crate::models::Reading;

const ENABLE_LOGS: bool = true;
use crate::{log_info, log_warn};

/// External wearable provider. The OAuth token lifecycle and its persistence
/// live behind this trait.
#[async_trait]
pub trait BiometricSource: Send + Sync {
    fn name(&self) -> &str;

    /// Whether an access token is currently held. Implementations drop the
    /// token when the provider rejects it, so a stale token reads as `false`.
    fn has_access(&self) -> bool;

    /// Time until the access token expires, when known.
    fn expires_in(&self) -> Option<Duration>;

    /// One refresh attempt; `true` when a new access token was obtained.
    async fn refresh_auth(&self) -> bool;

    /// Latest reading. `Ok(None)` means the provider has nothing scored yet.
    async fn fetch(&self) -> Result<Option<Reading>, GhostError>;
}

/// Wraps a provider with the refresh-before-fetch rule and the
/// connected/disconnected flag the loop falls back on.
pub struct ProviderLink {
    source: Arc<dyn BiometricSource>,
    connected: AtomicBool,
    fetch_timeout: Duration,
    refresh_window: Duration,
}

impl ProviderLink {
    pub fn new(source: Arc<dyn BiometricSource>, fetch_timeout: Duration, refresh_window: Duration) -> Self {
        let connected = source.has_access();
        Self {
            source,
            connected: AtomicBool::new(connected),
            fetch_timeout,
            refresh_window,
        }
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn mark_disconnected(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            log_warn!("[bio] {} disconnected; falling back to simulated data", self.name());
        }
    }

    /// Fetch one reading. Every failure is absorbed here and reported as `None`.
    /// At most one token refresh is attempted per call.
    pub async fn fetch(&self) -> Option<Reading> {
        if !self.is_connected() {
            if !self.source.has_access() {
                return None;
            }
            log_info!("[bio] {} access restored; reconnecting", self.name());
            self.connected.store(true, Ordering::SeqCst);
        }

        let mut refreshed = false;
        let expiring = self
            .source
            .expires_in()
            .is_some_and(|left| left <= self.refresh_window);
        if expiring {
            log_info!("[bio] {} token expiring soon, refreshing", self.name());
            refreshed = true;
            if !self.source.refresh_auth().await {
                log_warn!("[bio] {} pre-emptive token refresh failed", self.name());
            }
        }

        match self.fetch_with_timeout().await {
            Ok(reading) => reading,
            Err(GhostError::AuthExpired) => {
                if refreshed || !self.source.refresh_auth().await {
                    self.mark_disconnected();
                    return None;
                }
                match self.fetch_with_timeout().await {
                    Ok(reading) => reading,
                    Err(err) => {
                        log_warn!("[bio] {} fetch after refresh failed: {err}", self.name());
                        if err == GhostError::AuthExpired {
                            self.mark_disconnected();
                        }
                        None
                    }
                }
            }
            Err(err) => {
                log_warn!("[bio] {} fetch failed: {err}", self.name());
                None
            }
        }
    }

    async fn fetch_with_timeout(&self) -> Result<Option<Reading>, GhostError> {
        match tokio::time::timeout(self.fetch_timeout, self.source.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(GhostError::SourceUnavailable(format!(
                "{} fetch timed out after {:?}",
                self.name(),
                self.fetch_timeout
            ))),
        }
    }
}
