//! # camrelay
//!
//! Client side of a camera relay: picks where a camera stream comes from,
//! keeps it playing and recovers when it drops.
//!
//! A camera pushes MJPEG to a relay web application (the *registrar*). A
//! viewer can watch through the relay's proxy endpoint, through its local
//! endpoint, or directly through a tunnel whose public URL the registrar
//! keeps on record. This crate provides:
//!
//! - [`SourceResolver`]: turns a [`SourceKind`] into a fetchable URL
//! - [`StreamController`]: start/stop, source switching, periodic refresh
//!   and automatic reconnect after delivery failures
//! - [`MjpegPlayer`]: fetches and parses the multipart stream into frames
//! - [`StatusPoller`]: advisory camera status from the registrar
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use camrelay::{
//!     ChannelSink, ControllerConfig, HttpRegistrar, MjpegPlayer, PlayerConfig,
//!     Registrar, RegistrarConfig, SourceKind, SourceResolver, StreamController,
//! };
//!
//! #[tokio::main]
//! async fn main() -> camrelay::Result<()> {
//!     let registrar_config = RegistrarConfig::new("http://127.0.0.1:5000");
//!     let endpoints = registrar_config.relay_endpoints();
//!     let registrar: Arc<dyn Registrar> = Arc::new(HttpRegistrar::new(registrar_config)?);
//!
//!     let (sink, commands) = ChannelSink::new();
//!     let controller = StreamController::new(
//!         ControllerConfig::new().source_kind(SourceKind::Tunnel),
//!         SourceResolver::new(registrar, endpoints),
//!         Arc::new(sink),
//!     );
//!
//!     let player = MjpegPlayer::new(PlayerConfig::default(), controller.reporter())?;
//!     let mut frames = player.frames();
//!     player.spawn(commands);
//!
//!     controller.start().await?;
//!     while frames.changed().await.is_ok() {
//!         if let Some(frame) = frames.borrow().as_ref() {
//!             println!("frame {} ({} bytes)", frame.sequence, frame.len());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod controller;
pub mod delivery;
pub mod error;
pub mod registrar;
pub mod session;
pub mod source;
pub mod stats;
pub mod status;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{
    ControllerConfig, DeliveryReporter, ReconnectPolicy, StartOutcome, StreamController,
    StreamEvent, REFRESH_RATE_OPTIONS,
};
pub use delivery::{
    ChannelSink, DeliveryCommand, DeliveryRequest, DeliverySink, JpegFrame, MjpegPlayer,
    PlayerConfig, ViewState,
};
pub use error::{
    DeliveryFailure, Error, RegistrarError, RegistrationError, ResolutionError, Result,
};
pub use registrar::{
    ConnectionState, HttpRegistrar, Registrar, RegistrarConfig, StatusSnapshot,
    TunnelRegistration, UpstreamReport,
};
pub use session::{SessionSnapshot, StreamPhase};
pub use source::{SourceKind, SourceResolver};
pub use stats::{ControllerStats, PlayerCounters, PlayerStats};
pub use status::{StatusPoller, StatusPollerConfig};
