//! Stream session state
//!
//! The single authoritative record of what the viewer is doing. Only the
//! lifecycle controller mutates it, always under its lock; everything else
//! sees a [`SessionSnapshot`].

use crate::source::SourceKind;

use super::timer::TimerHandle;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// Not streaming
    Idle,
    /// Waiting for the resolver
    Starting,
    /// URL handed to the delivery mechanism
    Streaming,
}

/// Why a start is scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingReason {
    /// Cooldown after a delivery failure
    Reconnect,
    /// Grace delay after a source change
    SourceSwitch,
}

/// A scheduled start occupying the session's single restart slot
#[derive(Debug)]
pub struct PendingStart {
    pub reason: PendingReason,
    pub timer: TimerHandle,
}

/// Complete session state
#[derive(Debug)]
pub struct StreamSession {
    /// Current phase
    pub phase: StreamPhase,

    /// Selected source
    pub source_kind: SourceKind,

    /// URL being displayed (only while streaming)
    pub current_url: Option<String>,

    /// Periodic refresh interval, 0 = disabled
    pub refresh_period_secs: u32,

    /// Refresh timer, armed iff streaming with a non-zero period
    pub(crate) refresh_timer: Option<TimerHandle>,

    /// Reconnect cooldown or source-switch grace timer
    pub(crate) pending_start: Option<PendingStart>,

    /// Consecutive reconnects since the last good frame
    pub reconnect_attempts: u32,

    /// Bumped on every start, restart and stop
    generation: u64,

    next_timer_id: u64,

    last_cache_bust: i64,
}

impl StreamSession {
    /// Create an idle session
    pub fn new(source_kind: SourceKind, refresh_period_secs: u32) -> Self {
        Self {
            phase: StreamPhase::Idle,
            source_kind,
            current_url: None,
            refresh_period_secs,
            refresh_timer: None,
            pending_start: None,
            reconnect_attempts: 0,
            generation: 0,
            next_timer_id: 1,
            last_cache_bust: 0,
        }
    }

    /// Current generation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Invalidate everything issued under the current generation
    pub fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Allocate a timer id
    pub fn next_timer_id(&mut self) -> u64 {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        id
    }

    /// Starting or streaming
    pub fn is_active(&self) -> bool {
        self.phase != StreamPhase::Idle
    }

    /// Active, or idle with a start scheduled
    pub fn has_intent(&self) -> bool {
        self.is_active() || self.pending_start.is_some()
    }

    /// Nothing to stop
    pub fn is_quiescent(&self) -> bool {
        self.phase == StreamPhase::Idle
            && self.refresh_timer.is_none()
            && self.pending_start.is_none()
            && self.current_url.is_none()
    }

    /// Remove the pending start if it is the timer identified by `id`
    pub fn take_pending_if(&mut self, id: u64) -> Option<PendingStart> {
        if self
            .pending_start
            .as_ref()
            .is_some_and(|pending| pending.timer.id() == id)
        {
            self.pending_start.take()
        } else {
            None
        }
    }

    /// Strictly increasing cache-busting stamp, seeded from wall-clock millis
    pub fn next_cache_bust(&mut self, now_millis: i64) -> i64 {
        let stamp = now_millis.max(self.last_cache_bust + 1);
        self.last_cache_bust = stamp;
        stamp
    }

    /// Read-only view for observers
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            source_kind: self.source_kind,
            current_url: self.current_url.clone(),
            refresh_period_secs: self.refresh_period_secs,
            refresh_armed: self.refresh_timer.is_some(),
            pending_start: self.pending_start.as_ref().map(|pending| pending.reason),
            reconnect_attempts: self.reconnect_attempts,
            generation: self.generation,
        }
    }
}

/// Point-in-time copy of the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: StreamPhase,
    pub source_kind: SourceKind,
    pub current_url: Option<String>,
    pub refresh_period_secs: u32,
    pub refresh_armed: bool,
    pub pending_start: Option<PendingReason>,
    pub reconnect_attempts: u32,
    pub generation: u64,
}

impl SessionSnapshot {
    pub fn is_active(&self) -> bool {
        self.phase != StreamPhase::Idle
    }
}
