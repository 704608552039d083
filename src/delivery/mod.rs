//! Stream delivery
//!
//! The controller never fetches bytes itself. It hands URLs to a
//! [`DeliverySink`], and whatever renders the stream reports back through a
//! [`DeliveryReporter`](crate::controller::DeliveryReporter). [`ChannelSink`]
//! forwards commands over an unbounded channel to an [`MjpegPlayer`], the
//! built-in renderer.

pub mod config;
pub mod mjpeg;
pub mod player;

use tokio::sync::mpsc;

pub use config::PlayerConfig;
pub use mjpeg::{parse_boundary, JpegFrame, MjpegParser};
pub use player::{MjpegPlayer, ViewState};

/// A URL to display, tagged with the session generation that issued it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRequest {
    pub url: String,
    pub generation: u64,
    /// Issued by a refresh tick rather than a start
    pub refresh: bool,
}

impl DeliveryRequest {
    pub fn new(url: impl Into<String>, generation: u64) -> Self {
        Self {
            url: url.into(),
            generation,
            refresh: false,
        }
    }

    pub fn refresh(url: impl Into<String>, generation: u64) -> Self {
        Self {
            refresh: true,
            ..Self::new(url, generation)
        }
    }
}

/// Commands sent to a rendering surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryCommand {
    /// Replace whatever is displayed with this stream
    Display(DeliveryRequest),
    /// Stream failed, show the "unavailable" placeholder
    ShowPlaceholder { generation: u64 },
    /// Stopped, show nothing
    Clear,
}

/// Rendering surface driven by the controller.
///
/// Called with the controller's session lock held: implementations must not
/// block or call back into the controller.
pub trait DeliverySink: Send + Sync {
    fn deliver(&self, request: DeliveryRequest);

    fn show_placeholder(&self, generation: u64);

    fn clear(&self);
}

/// Forwards commands to a channel, typically consumed by [`MjpegPlayer`]
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<DeliveryCommand>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DeliveryCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, command: DeliveryCommand) {
        if self.tx.send(command).is_err() {
            tracing::trace!("Delivery receiver dropped, command discarded");
        }
    }
}

impl DeliverySink for ChannelSink {
    fn deliver(&self, request: DeliveryRequest) {
        self.send(DeliveryCommand::Display(request));
    }

    fn show_placeholder(&self, generation: u64) {
        self.send(DeliveryCommand::ShowPlaceholder { generation });
    }

    fn clear(&self) {
        self.send(DeliveryCommand::Clear);
    }
}
