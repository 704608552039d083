//! Stream lifecycle control
//!
//! This module provides:
//! - [`StreamController`]: start, stop, source switching and refresh rate
//! - The refresh scheduler that periodically re-issues the stream URL
//! - [`DeliveryReporter`]: the failure recovery monitor's input
//! - Lifecycle events broadcast to observers

pub mod config;
pub mod event;
pub mod lifecycle;
pub mod recovery;
pub mod refresh;

pub use config::{ControllerConfig, ReconnectPolicy, REFRESH_RATE_OPTIONS};
pub use event::StreamEvent;
pub use lifecycle::{StartOutcome, StreamController};
pub use recovery::DeliveryReporter;
pub use refresh::cache_busted;
