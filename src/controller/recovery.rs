//! Failure recovery monitor
//!
//! The delivery side reports failures through a [`DeliveryReporter`]. A
//! failure for the current generation swaps in the placeholder and, if the
//! session still wants to stream, schedules a restart after the reconnect
//! cooldown. The restart goes through the resolver again, so a tunnel that
//! was re-registered in the meantime is picked up.
//!
//! Reports carrying an older generation are ignored: they belong to a
//! stream that was already stopped or replaced.

use std::sync::{Arc, Weak};

use tracing::{debug, info, warn};

use crate::error::DeliveryFailure;
use crate::session::{PendingReason, StreamPhase};
use crate::stats::ControllerCounters;

use super::event::StreamEvent;
use super::lifecycle::Shared;

/// Feedback handle for whatever renders the stream.
///
/// Holds a weak reference: reports after the controller is gone are no-ops.
#[derive(Clone)]
pub struct DeliveryReporter {
    shared: Weak<Shared>,
}

impl DeliveryReporter {
    pub(crate) fn new(shared: Weak<Shared>) -> Self {
        Self { shared }
    }

    /// The stream issued under `generation` stopped delivering
    pub fn failure(&self, generation: u64, failure: DeliveryFailure) {
        if let Some(shared) = self.shared.upgrade() {
            shared.on_delivery_failure(generation, failure);
        }
    }

    /// The stream issued under `generation` produced a frame
    pub fn frame_received(&self, generation: u64) {
        if let Some(shared) = self.shared.upgrade() {
            shared.on_frame_received(generation);
        }
    }
}

impl std::fmt::Debug for DeliveryReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryReporter")
            .field("attached", &(self.shared.strong_count() > 0))
            .finish()
    }
}

impl Shared {
    fn on_delivery_failure(self: &Arc<Self>, generation: u64, failure: DeliveryFailure) {
        let mut session = self.session.lock();
        if generation != session.generation() {
            ControllerCounters::bump(&self.counters.stale_discards);
            debug!(
                generation,
                current = session.generation(),
                error = %failure,
                "Ignoring failure from stale stream"
            );
            return;
        }

        self.sink.show_placeholder(generation);
        ControllerCounters::bump(&self.counters.delivery_failures);
        warn!(generation, error = %failure, "Stream delivery failed");
        self.emit(StreamEvent::DeliveryFailed(failure));

        if session.phase != StreamPhase::Streaming || session.pending_start.is_some() {
            return;
        }

        session.reconnect_attempts += 1;
        let attempt = session.reconnect_attempts;
        match self.config.reconnect.delay_for(attempt) {
            Some(delay) => {
                self.arm_pending_start(&mut session, PendingReason::Reconnect, delay);
                ControllerCounters::bump(&self.counters.reconnects_scheduled);
                info!(
                    generation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Reconnect scheduled"
                );
                self.emit(StreamEvent::ReconnectScheduled { attempt, delay });
            }
            None => {
                let attempts = attempt - 1;
                warn!(attempts, "Reconnect attempts exhausted, giving up");
                self.halt(&mut session, "reconnect attempts exhausted");
                self.sink.show_placeholder(session.generation());
                self.emit(StreamEvent::ReconnectAbandoned { attempts });
            }
        }
    }

    fn on_frame_received(&self, generation: u64) {
        let mut session = self.session.lock();
        if generation == session.generation()
            && session.phase == StreamPhase::Streaming
            && session.reconnect_attempts > 0
        {
            debug!(
                generation,
                attempts = session.reconnect_attempts,
                "Stream recovered"
            );
            session.reconnect_attempts = 0;
        }
    }
}
