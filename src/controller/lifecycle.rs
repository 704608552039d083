//! Stream lifecycle controller
//!
//! Owns the [`StreamSession`] and is the only code that mutates it. Every
//! operation takes the session lock, applies its transition and releases
//! the lock before awaiting anything, so operations are atomic with respect
//! to each other and to timer firings.
//!
//! Starting is split in two halves around the resolver call. The first half
//! bumps the session generation and enters `Starting`; the second half only
//! applies the resolved URL if the generation is unchanged. A stop, a
//! source change or a newer start in between makes the completion stale and
//! it is dropped.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::delivery::{DeliveryRequest, DeliverySink};
use crate::error::ResolutionError;
use crate::session::{
    PendingReason, PendingStart, SessionSnapshot, StreamPhase, StreamSession, TimerHandle,
};
use crate::source::{SourceKind, SourceResolver};
use crate::stats::{ControllerCounters, ControllerStats};

use super::config::ControllerConfig;
use super::event::StreamEvent;
use super::recovery::DeliveryReporter;

/// Result of a successful [`StreamController::start`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// The resolved URL was handed to the delivery sink
    Streaming(String),
    /// A stream was already starting or running
    AlreadyActive,
    /// A stop or newer start overtook this one while resolving
    Superseded,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum StartTrigger {
    User,
    Scheduled(PendingReason),
}

/// First half of a start, carried across the resolver call
#[derive(Debug)]
pub(crate) struct StartAttempt {
    generation: u64,
    kind: SourceKind,
}

/// State shared between the controller handle and its timer tasks.
///
/// Timer tasks hold a `Weak` reference so dropping every controller handle
/// lets the whole thing unwind.
pub(crate) struct Shared {
    pub(crate) config: ControllerConfig,
    pub(crate) resolver: SourceResolver,
    pub(crate) sink: Arc<dyn DeliverySink>,
    pub(crate) session: Mutex<StreamSession>,
    pub(crate) events: broadcast::Sender<StreamEvent>,
    pub(crate) counters: ControllerCounters,
}

impl Shared {
    pub(crate) fn emit(&self, event: StreamEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub(crate) fn emit_phase(&self, session: &StreamSession) {
        self.emit(StreamEvent::PhaseChanged {
            phase: session.phase,
            source: session.source_kind,
            url: session.current_url.clone(),
        });
    }

    pub(crate) fn begin_start(
        &self,
        session: &mut StreamSession,
        trigger: StartTrigger,
    ) -> Option<StartAttempt> {
        match (trigger, session.phase) {
            (StartTrigger::User, StreamPhase::Idle) => {
                // An explicit start supersedes any scheduled one
                session.pending_start = None;
                session.reconnect_attempts = 0;
            }
            (StartTrigger::User, phase) => {
                debug!(?phase, "Start ignored, session already active");
                return None;
            }
            (StartTrigger::Scheduled(_), StreamPhase::Starting) => return None,
            (StartTrigger::Scheduled(reason), _) => {
                if reason == PendingReason::SourceSwitch {
                    session.reconnect_attempts = 0;
                }
                ControllerCounters::bump(&self.counters.restarts);
            }
        }

        session.refresh_timer = None;
        session.current_url = None;
        session.phase = StreamPhase::Starting;
        let generation = session.bump_generation();
        ControllerCounters::bump(&self.counters.starts);

        info!(
            generation,
            source = %session.source_kind,
            trigger = ?trigger,
            "Stream starting"
        );
        self.emit_phase(session);

        Some(StartAttempt {
            generation,
            kind: session.source_kind,
        })
    }

    pub(crate) async fn finish_start(
        self: &Arc<Self>,
        attempt: StartAttempt,
    ) -> Result<StartOutcome, ResolutionError> {
        let limit = self.config.resolve_timeout;
        let resolved = match tokio::time::timeout(limit, self.resolver.resolve(attempt.kind)).await
        {
            Ok(result) => result,
            Err(_) => Err(ResolutionError::CollaboratorUnavailable(format!(
                "resolution timed out after {:?}",
                limit
            ))),
        };

        let mut session = self.session.lock();
        if session.generation() != attempt.generation || session.phase != StreamPhase::Starting {
            ControllerCounters::bump(&self.counters.stale_discards);
            debug!(
                generation = attempt.generation,
                current = session.generation(),
                "Discarding stale resolution"
            );
            return Ok(StartOutcome::Superseded);
        }

        match resolved {
            Ok(url) => {
                session.phase = StreamPhase::Streaming;
                session.current_url = Some(url.clone());
                self.sink
                    .deliver(DeliveryRequest::new(url.clone(), attempt.generation));
                self.arm_refresh(&mut session);

                info!(
                    generation = attempt.generation,
                    source = %attempt.kind,
                    url = %url,
                    "Stream started"
                );
                self.emit_phase(&session);
                Ok(StartOutcome::Streaming(url))
            }
            Err(err) => {
                session.phase = StreamPhase::Idle;
                session.reconnect_attempts = 0;

                warn!(
                    generation = attempt.generation,
                    source = %attempt.kind,
                    error = %err,
                    "Stream start failed"
                );
                self.emit_phase(&session);
                self.emit(StreamEvent::StartFailed(err.clone()));
                Err(err)
            }
        }
    }

    /// Tear everything down. Returns false if there was nothing to stop.
    pub(crate) fn halt(&self, session: &mut StreamSession, reason: &str) -> bool {
        if session.is_quiescent() {
            return false;
        }

        session.bump_generation();
        session.refresh_timer = None;
        session.pending_start = None;
        session.current_url = None;
        session.phase = StreamPhase::Idle;
        session.reconnect_attempts = 0;
        self.sink.clear();

        info!(generation = session.generation(), reason, "Stream stopped");
        self.emit_phase(session);
        true
    }

    /// Arm the single restart slot, replacing whatever occupied it
    pub(crate) fn arm_pending_start(
        self: &Arc<Self>,
        session: &mut StreamSession,
        reason: PendingReason,
        delay: Duration,
    ) {
        let id = session.next_timer_id();
        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = weak.upgrade() {
                shared.fire_pending_start(id).await;
            }
        });

        debug!(?reason, delay_ms = delay.as_millis() as u64, "Start scheduled");
        session.pending_start = Some(PendingStart {
            reason,
            timer: TimerHandle::new(id, handle),
        });
    }

    async fn fire_pending_start(self: &Arc<Self>, id: u64) {
        let attempt = {
            let mut session = self.session.lock();
            match session.take_pending_if(id) {
                Some(pending) => {
                    let reason = pending.reason;
                    pending.timer.detach();
                    self.begin_start(&mut session, StartTrigger::Scheduled(reason))
                }
                None => None,
            }
        };

        if let Some(attempt) = attempt {
            // Failures are already logged and broadcast
            let _ = self.finish_start(attempt).await;
        }
    }
}

/// Handle to a stream lifecycle controller. Cheap to clone.
#[derive(Clone)]
pub struct StreamController {
    shared: Arc<Shared>,
}

impl StreamController {
    /// Create an idle controller
    pub fn new(
        config: ControllerConfig,
        resolver: SourceResolver,
        sink: Arc<dyn DeliverySink>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let session = StreamSession::new(config.source_kind, config.refresh_period_secs);

        Self {
            shared: Arc::new(Shared {
                config,
                resolver,
                sink,
                session: Mutex::new(session),
                events,
                counters: ControllerCounters::default(),
            }),
        }
    }

    /// Controller configuration
    pub fn config(&self) -> &ControllerConfig {
        &self.shared.config
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.shared.events.subscribe()
    }

    /// Copy of the current session state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.session.lock().snapshot()
    }

    /// Controller counters
    pub fn stats(&self) -> ControllerStats {
        self.shared.counters.snapshot()
    }

    /// Handle for the delivery side to report failures and progress
    pub fn reporter(&self) -> DeliveryReporter {
        DeliveryReporter::new(Arc::downgrade(&self.shared))
    }

    /// Resolve the selected source and begin streaming.
    ///
    /// No-op returning [`StartOutcome::AlreadyActive`] if a stream is
    /// already starting or running.
    pub async fn start(&self) -> Result<StartOutcome, ResolutionError> {
        let attempt = {
            let mut session = self.shared.session.lock();
            self.shared.begin_start(&mut session, StartTrigger::User)
        };

        match attempt {
            Some(attempt) => self.shared.finish_start(attempt).await,
            None => Ok(StartOutcome::AlreadyActive),
        }
    }

    /// Stop streaming and cancel every timer. Idempotent.
    pub fn stop(&self) -> bool {
        let mut session = self.shared.session.lock();
        self.shared.halt(&mut session, "stop requested")
    }

    /// Select a different source.
    ///
    /// With streaming intent (active, or a start already scheduled) the
    /// current stream is halted and a new start runs after the grace delay.
    /// Otherwise only the selection changes.
    pub fn change_source(&self, kind: SourceKind) {
        let mut session = self.shared.session.lock();
        let previous = session.source_kind;
        session.source_kind = kind;

        if previous != kind {
            info!(from = %previous, to = %kind, "Source changed");
            self.shared.emit(StreamEvent::SourceChanged {
                from: previous,
                to: kind,
            });
        }

        if !session.has_intent() {
            return;
        }

        self.shared.halt(&mut session, "source change");
        let grace = self.shared.config.source_switch_grace;
        self.shared
            .arm_pending_start(&mut session, PendingReason::SourceSwitch, grace);
    }

    /// Set the refresh period in seconds. 0 disables refresh.
    pub fn set_refresh_rate(&self, secs: u32) {
        let mut session = self.shared.session.lock();
        session.refresh_period_secs = secs;
        self.shared.arm_refresh(&mut session);

        info!(
            secs,
            armed = session.refresh_timer.is_some(),
            "Refresh rate changed"
        );
        self.shared.emit(StreamEvent::RefreshRateChanged { secs });
    }
}

impl std::fmt::Debug for StreamController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamController")
            .field("session", &self.snapshot())
            .finish()
    }
}
