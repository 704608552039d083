//! Status poller
//!
//! Periodically asks the registrar for camera status and publishes the
//! latest [`StatusSnapshot`] on a watch channel. Purely informational: the
//! poller never touches the stream session. A failed poll publishes an
//! `Unknown` snapshot so observers can tell stale data from fresh.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::registrar::{Registrar, StatusSnapshot};

/// Status poller configuration
#[derive(Debug, Clone)]
pub struct StatusPollerConfig {
    /// Time between polls
    pub interval: Duration,
}

impl Default for StatusPollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

impl StatusPollerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the poll interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Publishes registrar status snapshots
#[derive(Clone)]
pub struct StatusPoller {
    config: StatusPollerConfig,
    registrar: Arc<dyn Registrar>,
    latest: Arc<watch::Sender<Option<StatusSnapshot>>>,
}

impl StatusPoller {
    pub fn new(config: StatusPollerConfig, registrar: Arc<dyn Registrar>) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            config,
            registrar,
            latest: Arc::new(latest),
        }
    }

    /// Receive every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Option<StatusSnapshot>> {
        self.latest.subscribe()
    }

    /// Most recent snapshot, if any poll has completed
    pub fn latest(&self) -> Option<StatusSnapshot> {
        self.latest.borrow().clone()
    }

    /// Poll once now, outside the schedule
    pub async fn refresh_now(&self) -> StatusSnapshot {
        let snapshot = match self.registrar.fetch_status().await {
            Ok(report) => {
                let snapshot = report.snapshot(Utc::now());
                debug!(
                    state = ?snapshot.connection_state,
                    stream_url = ?snapshot.stream_url,
                    "Camera status updated"
                );
                snapshot
            }
            Err(e) => {
                warn!(error = %e, "Camera status poll failed");
                StatusSnapshot::unknown(Utc::now())
            }
        };

        self.latest.send_replace(Some(snapshot.clone()));
        snapshot
    }

    /// Poll immediately and then every interval until the task is aborted
    pub fn spawn(&self) -> JoinHandle<()> {
        let poller = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poller.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                poller.refresh_now().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistrarError;
    use crate::registrar::ConnectionState;
    use crate::testing::FakeRegistrar;

    fn poller(registrar: &Arc<FakeRegistrar>) -> StatusPoller {
        let registrar: Arc<dyn Registrar> = registrar.clone();
        StatusPoller::new(
            StatusPollerConfig::new().interval(Duration::from_secs(30)),
            registrar,
        )
    }

    #[tokio::test]
    async fn test_refresh_now_publishes() {
        let registrar = Arc::new(FakeRegistrar::new());
        let poller = poller(&registrar);
        let rx = poller.subscribe();
        assert!(poller.latest().is_none());

        let snapshot = poller.refresh_now().await;

        assert_eq!(snapshot.connection_state, ConnectionState::Connected);
        assert_eq!(
            snapshot.stream_url.as_deref(),
            Some("https://abc.ngrok.io/stream")
        );
        assert_eq!(rx.borrow().as_ref(), Some(&snapshot));
    }

    #[tokio::test]
    async fn test_failed_poll_publishes_unknown() {
        let registrar = Arc::new(FakeRegistrar::new());
        registrar.fail_with(Some(RegistrarError::Status(500)));
        let poller = poller(&registrar);

        let snapshot = poller.refresh_now().await;

        assert_eq!(snapshot.connection_state, ConnectionState::Unknown);
        assert_eq!(snapshot.stream_url, None);
        assert_eq!(poller.latest(), Some(snapshot));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_polls_on_interval() {
        let registrar = Arc::new(FakeRegistrar::new());
        let poller = poller(&registrar);
        let handle = poller.spawn();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(registrar.status_calls(), 1);

        registrar.set_status("Disconnected");
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(registrar.status_calls(), 2);
        assert_eq!(
            poller.latest().map(|s| s.connection_state),
            Some(ConnectionState::Disconnected)
        );

        handle.abort();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(registrar.status_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_does_not_touch_resolution() {
        let registrar = Arc::new(FakeRegistrar::new());
        let poller = poller(&registrar);

        registrar.set_stream_url(None);
        let snapshot = poller.refresh_now().await;

        assert_eq!(snapshot.stream_url, None);
        assert_eq!(snapshot.connection_state, ConnectionState::Connected);
    }
}
