//! Refresh scheduler
//!
//! Some relays freeze an MJPEG connection after a while without closing it.
//! Periodic refresh re-issues the current URL with a cache-busting query
//! parameter so the delivery side opens a fresh connection. The URL itself
//! is never re-resolved.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::delivery::DeliveryRequest;
use crate::session::{StreamPhase, StreamSession, TimerHandle};
use crate::stats::ControllerCounters;

use super::event::StreamEvent;
use super::lifecycle::Shared;

/// Query parameter used for cache busting
pub const CACHE_BUST_PARAM: &str = "t";

/// Append the cache-busting parameter to `url`
pub fn cache_busted(url: &str, stamp: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", url, separator, CACHE_BUST_PARAM, stamp)
}

impl Shared {
    /// Drop the current refresh timer and arm a new one if streaming with a
    /// non-zero period. At most one refresh timer exists at any time.
    pub(crate) fn arm_refresh(self: &Arc<Self>, session: &mut StreamSession) {
        session.refresh_timer = None;
        if session.phase != StreamPhase::Streaming || session.refresh_period_secs == 0 {
            return;
        }

        let period = Duration::from_secs(u64::from(session.refresh_period_secs));
        let generation = session.generation();
        let id = session.next_timer_id();
        let weak = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                if !shared.refresh_tick(generation, id) {
                    break;
                }
            }
            trace!(id, "Refresh timer exited");
        });

        debug!(generation, period_secs = period.as_secs(), "Refresh armed");
        session.refresh_timer = Some(TimerHandle::new(id, handle));
    }

    /// One refresh tick. Returns false once the timer is obsolete.
    fn refresh_tick(&self, generation: u64, id: u64) -> bool {
        let mut session = self.session.lock();

        let current = session.refresh_timer.as_ref().map(TimerHandle::id);
        if session.generation() != generation
            || current != Some(id)
            || session.phase != StreamPhase::Streaming
        {
            return false;
        }

        if session.pending_start.is_some() {
            debug!(generation, "Refresh skipped, reconnect pending");
            return true;
        }

        let Some(base) = session.current_url.clone() else {
            return false;
        };
        let stamp = session.next_cache_bust(Utc::now().timestamp_millis());
        let url = cache_busted(&base, stamp);

        self.sink
            .deliver(DeliveryRequest::refresh(url.clone(), generation));
        ControllerCounters::bump(&self.counters.refreshes);
        debug!(generation, url = %url, "Stream refreshed");
        self.emit(StreamEvent::Refreshed { url });
        true
    }
}
