//! Camera status polling

pub mod poller;

pub use poller::{StatusPoller, StatusPollerConfig};
