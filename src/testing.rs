//! Test doubles shared by unit tests

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::delivery::{DeliveryCommand, DeliveryRequest, DeliverySink};
use crate::error::{RegistrarError, RegistrationError};
use crate::registrar::{
    normalize_tunnel_url, Registrar, StatusReport, TunnelRegistration, UpstreamReport,
};

struct FakeState {
    status: String,
    stream_url: Option<String>,
    error: Option<RegistrarError>,
    delay: Duration,
}

/// In-memory registrar with a configurable tunnel URL and latency
pub(crate) struct FakeRegistrar {
    state: Mutex<FakeState>,
    status_calls: AtomicUsize,
}

impl FakeRegistrar {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                status: "Connected".into(),
                stream_url: Some("https://abc.ngrok.io/stream".into()),
                error: None,
                delay: Duration::ZERO,
            }),
            status_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn set_stream_url(&self, url: Option<&str>) {
        self.state.lock().stream_url = url.map(str::to_string);
    }

    pub(crate) fn set_status(&self, status: &str) {
        self.state.lock().status = status.to_string();
    }

    pub(crate) fn fail_with(&self, error: Option<RegistrarError>) {
        self.state.lock().error = error;
    }

    /// Latency applied to every status query
    pub(crate) fn set_delay(&self, delay: Duration) {
        self.state.lock().delay = delay;
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Registrar for FakeRegistrar {
    async fn fetch_status(&self) -> Result<StatusReport, RegistrarError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.state.lock().delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock();
        if let Some(err) = &state.error {
            return Err(err.clone());
        }
        Ok(StatusReport {
            status: state.status.clone(),
            stream_url: state.stream_url.clone(),
            esp32_ip: None,
        })
    }

    async fn test_upstream(&self) -> Result<UpstreamReport, RegistrarError> {
        Ok(UpstreamReport {
            status: Some("success".into()),
            message: None,
            probes: BTreeMap::new(),
        })
    }

    async fn auto_detect_tunnel(&self) -> Result<TunnelRegistration, RegistrationError> {
        let stream_url = self.state.lock().stream_url.clone();
        Ok(TunnelRegistration {
            base_url: None,
            stream_url,
            registered_at: Utc::now(),
        })
    }

    async fn register_tunnel(&self, url: &str) -> Result<TunnelRegistration, RegistrationError> {
        let base = normalize_tunnel_url(url)?;
        let stream_url = format!("{}/stream", base);
        self.state.lock().stream_url = Some(stream_url.clone());
        Ok(TunnelRegistration {
            base_url: Some(base),
            stream_url: Some(stream_url),
            registered_at: Utc::now(),
        })
    }

    async fn clear_tunnel(&self) -> Result<(), RegistrationError> {
        self.state.lock().stream_url = None;
        Ok(())
    }
}

/// Sink that records every command it receives
#[derive(Default)]
pub(crate) struct RecordingSink {
    commands: Mutex<Vec<DeliveryCommand>>,
}

impl RecordingSink {
    pub(crate) fn commands(&self) -> Vec<DeliveryCommand> {
        self.commands.lock().clone()
    }

    /// Every displayed request, in order
    pub(crate) fn displayed(&self) -> Vec<DeliveryRequest> {
        self.commands
            .lock()
            .iter()
            .filter_map(|command| match command {
                DeliveryCommand::Display(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn placeholders(&self) -> usize {
        self.commands
            .lock()
            .iter()
            .filter(|command| matches!(command, DeliveryCommand::ShowPlaceholder { .. }))
            .count()
    }

    pub(crate) fn last(&self) -> Option<DeliveryCommand> {
        self.commands.lock().last().cloned()
    }
}

impl DeliverySink for RecordingSink {
    fn deliver(&self, request: DeliveryRequest) {
        self.commands.lock().push(DeliveryCommand::Display(request));
    }

    fn show_placeholder(&self, generation: u64) {
        self.commands
            .lock()
            .push(DeliveryCommand::ShowPlaceholder { generation });
    }

    fn clear(&self) {
        self.commands.lock().push(DeliveryCommand::Clear);
    }
}
