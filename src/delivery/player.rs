//! MJPEG player
//!
//! Consumes [`DeliveryCommand`]s and keeps at most one fetch running. A new
//! `Display` command aborts the previous fetch before starting the next, so
//! a refresh replaces the connection rather than adding one. Frames and the
//! view state are published on watch channels; failures go back to the
//! controller through its [`DeliveryReporter`].

use std::sync::Arc;

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::controller::DeliveryReporter;
use crate::error::{DeliveryFailure, Error, Result};
use crate::stats::PlayerCounters;

use super::config::PlayerConfig;
use super::mjpeg::{parse_boundary, JpegFrame, MjpegParser};
use super::{DeliveryCommand, DeliveryRequest};

/// What the rendering surface currently shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    /// Nothing
    Blank,
    /// Waiting for the first frame from this URL
    Loading(String),
    /// Frames from this URL
    Showing(String),
    /// The "stream unavailable" image
    Placeholder,
}

struct Outputs {
    frames: watch::Sender<Option<JpegFrame>>,
    view: watch::Sender<ViewState>,
    counters: Arc<PlayerCounters>,
}

/// How a fetch ended without a transport error
enum FetchEnd {
    /// A single JPEG body, nothing more will arrive
    Still,
    /// A multipart body reached its end
    StreamEnded,
}

/// Renders delivery commands into frames
pub struct MjpegPlayer {
    client: reqwest::Client,
    config: PlayerConfig,
    reporter: DeliveryReporter,
    outputs: Arc<Outputs>,
}

impl MjpegPlayer {
    /// Create a player reporting to `reporter`
    pub fn new(config: PlayerConfig, reporter: DeliveryReporter) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::ClientSetup(e.to_string()))?;

        let (frames, _) = watch::channel(None);
        let (view, _) = watch::channel(ViewState::Blank);

        Ok(Self {
            client,
            config,
            reporter,
            outputs: Arc::new(Outputs {
                frames,
                view,
                counters: Arc::new(PlayerCounters::default()),
            }),
        })
    }

    /// Latest frame
    pub fn frames(&self) -> watch::Receiver<Option<JpegFrame>> {
        self.outputs.frames.subscribe()
    }

    /// Current view state
    pub fn view(&self) -> watch::Receiver<ViewState> {
        self.outputs.view.subscribe()
    }

    /// Player counters, readable after the player is spawned
    pub fn counters(&self) -> Arc<PlayerCounters> {
        self.outputs.counters.clone()
    }

    /// Run the player on its own task
    pub fn spawn(self, commands: mpsc::UnboundedReceiver<DeliveryCommand>) -> JoinHandle<()> {
        tokio::spawn(self.run(commands))
    }

    /// Process commands until the sending side is dropped
    pub async fn run(self, mut commands: mpsc::UnboundedReceiver<DeliveryCommand>) {
        let mut active: Option<JoinHandle<()>> = None;

        while let Some(command) = commands.recv().await {
            if let Some(fetch) = active.take() {
                fetch.abort();
            }

            match command {
                DeliveryCommand::Display(request) => {
                    debug!(
                        generation = request.generation,
                        url = %request.url,
                        refresh = request.refresh,
                        "Opening stream"
                    );
                    self.outputs
                        .view
                        .send_replace(ViewState::Loading(request.url.clone()));
                    active = Some(tokio::spawn(run_fetch(
                        self.client.clone(),
                        self.config.clone(),
                        self.reporter.clone(),
                        self.outputs.clone(),
                        request,
                    )));
                }
                DeliveryCommand::ShowPlaceholder { generation } => {
                    debug!(generation, "Showing placeholder");
                    self.outputs.view.send_replace(ViewState::Placeholder);
                }
                DeliveryCommand::Clear => {
                    self.outputs.view.send_replace(ViewState::Blank);
                    self.outputs.frames.send_replace(None);
                }
            }
        }

        if let Some(fetch) = active {
            fetch.abort();
        }
        info!("Player stopped");
    }
}

async fn run_fetch(
    client: reqwest::Client,
    config: PlayerConfig,
    reporter: DeliveryReporter,
    outputs: Arc<Outputs>,
    request: DeliveryRequest,
) {
    let generation = request.generation;
    let result = fetch(&client, &config, &reporter, &outputs, &request).await;

    match result {
        Ok(FetchEnd::Still) => {
            debug!(generation, url = %request.url, "Still image loaded");
        }
        Ok(FetchEnd::StreamEnded) => {
            info!(generation, url = %request.url, "Stream ended");
            reporter.failure(generation, DeliveryFailure::StreamEnded);
        }
        Err(failure) => {
            warn!(generation, url = %request.url, error = %failure, "Stream failed");
            reporter.failure(generation, failure);
        }
    }
}

async fn fetch(
    client: &reqwest::Client,
    config: &PlayerConfig,
    reporter: &DeliveryReporter,
    outputs: &Outputs,
    request: &DeliveryRequest,
) -> std::result::Result<FetchEnd, DeliveryFailure> {
    let stall = config.stall_timeout;
    let stalled = |_| DeliveryFailure::Stalled(stall);
    let connection = |e: reqwest::Error| DeliveryFailure::Connection(e.to_string());

    let response = tokio::time::timeout(stall, client.get(&request.url).send())
        .await
        .map_err(stalled)?
        .map_err(connection)?;

    let status = response.status();
    if !status.is_success() {
        return Err(DeliveryFailure::HttpStatus(status.as_u16()));
    }
    outputs.counters.record_fetch();

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let mut publisher = Publisher {
        reporter,
        outputs,
        request,
        first_frame: true,
    };

    if let Some(boundary) = parse_boundary(&content_type) {
        let mut parser = MjpegParser::new(&boundary).with_max_frame_size(config.max_frame_size);
        let mut body = response.bytes_stream();

        loop {
            let next = tokio::time::timeout(stall, body.next())
                .await
                .map_err(stalled)?;
            match next {
                Some(chunk) => {
                    let chunk = chunk.map_err(connection)?;
                    for frame in parser.push(&chunk)? {
                        publisher.publish(frame);
                    }
                    if parser.is_finished() {
                        debug!(frames = parser.frames_parsed(), "Closing delimiter received");
                        return Ok(FetchEnd::StreamEnded);
                    }
                }
                None => {
                    debug!(frames = parser.frames_parsed(), "Body closed");
                    return Ok(FetchEnd::StreamEnded);
                }
            }
        }
    } else if content_type.to_ascii_lowercase().starts_with("image/") {
        let data = tokio::time::timeout(stall, response.bytes())
            .await
            .map_err(stalled)?
            .map_err(connection)?;
        publisher.publish(JpegFrame::from_still(data)?);
        Ok(FetchEnd::Still)
    } else {
        Err(DeliveryFailure::InvalidFrame(format!(
            "unsupported content type {:?}",
            content_type
        )))
    }
}

struct Publisher<'a> {
    reporter: &'a DeliveryReporter,
    outputs: &'a Outputs,
    request: &'a DeliveryRequest,
    first_frame: bool,
}

impl Publisher<'_> {
    fn publish(&mut self, frame: JpegFrame) {
        self.outputs.counters.record_frame(frame.len());
        if self.first_frame {
            self.first_frame = false;
            self.outputs
                .view
                .send_replace(ViewState::Showing(self.request.url.clone()));
            self.reporter.frame_received(self.request.generation);
        }
        self.outputs.frames.send_replace(Some(frame));
    }
}
