//! Runtime statistics

pub mod metrics;

pub use metrics::{ControllerCounters, ControllerStats, PlayerCounters, PlayerStats};
