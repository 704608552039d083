//! Controller events
//!
//! Broadcast to every subscriber. A lagging subscriber loses old events;
//! the current state is always available through the controller snapshot.

use std::time::Duration;

use crate::error::{DeliveryFailure, ResolutionError};
use crate::session::StreamPhase;
use crate::source::SourceKind;

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Session moved to a new phase
    PhaseChanged {
        phase: StreamPhase,
        source: SourceKind,
        url: Option<String>,
    },

    /// A different source was selected
    SourceChanged { from: SourceKind, to: SourceKind },

    /// The refresh period was changed
    RefreshRateChanged { secs: u32 },

    /// A refresh tick re-issued the stream
    Refreshed { url: String },

    /// Resolution failed, the session is idle again
    StartFailed(ResolutionError),

    /// The current stream stopped delivering
    DeliveryFailed(DeliveryFailure),

    /// A reconnect is scheduled after `delay`
    ReconnectScheduled { attempt: u32, delay: Duration },

    /// The reconnect policy gave up
    ReconnectAbandoned { attempts: u32 },
}
