//! Stream session management
//!
//! This module provides:
//! - The session record and its phases
//! - Owned timer handles for refresh and restart timers

pub mod state;
pub mod timer;

pub use state::{PendingReason, PendingStart, SessionSnapshot, StreamPhase, StreamSession};
pub use timer::TimerHandle;
