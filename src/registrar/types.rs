//! Registrar wire types and the snapshots derived from them

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RegistrationError;

/// Upstream connectivity as reported by the registrar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Unknown,
}

impl ConnectionState {
    /// Map the registrar's free-form status string.
    ///
    /// `"Connected"` and `"Connected via Ngrok"` are both connected; anything
    /// that is not recognisably up or down (e.g. `"Error"`) is unknown.
    pub fn from_status(status: &str) -> Self {
        let status = status.trim().to_ascii_lowercase();
        if status.starts_with("connected") {
            ConnectionState::Connected
        } else if status.starts_with("disconnected") {
            ConnectionState::Disconnected
        } else {
            ConnectionState::Unknown
        }
    }
}

/// `GET /api/camera_status` response body
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusReport {
    pub status: String,
    #[serde(default)]
    pub stream_url: Option<String>,
    #[serde(default)]
    pub esp32_ip: Option<String>,
}

impl StatusReport {
    /// Registered tunnel stream URL, ignoring empty strings
    pub fn registered_stream_url(&self) -> Option<&str> {
        self.stream_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Convert into a display snapshot stamped with `fetched_at`
    pub fn snapshot(&self, fetched_at: DateTime<Utc>) -> StatusSnapshot {
        StatusSnapshot {
            connection_state: ConnectionState::from_status(&self.status),
            stream_url: self.registered_stream_url().map(str::to_string),
            fetched_at,
        }
    }
}

/// Advisory status shown to the user, replaced wholesale on every poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub connection_state: ConnectionState,
    pub stream_url: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl StatusSnapshot {
    /// Snapshot used when the registrar could not be queried
    pub fn unknown(fetched_at: DateTime<Utc>) -> Self {
        Self {
            connection_state: ConnectionState::Unknown,
            stream_url: None,
            fetched_at,
        }
    }
}

/// Response body shared by `register_ngrok` and `auto_detect_ngrok`
#[derive(Debug, Clone, Deserialize)]
pub struct TunnelResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub stream_url: Option<String>,
}

impl TunnelResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// Interpret the response, treating any non-success status as a refusal
    pub fn into_registration(
        self,
        registered_at: DateTime<Utc>,
    ) -> Result<TunnelRegistration, RegistrationError> {
        if !self.is_success() {
            let reason = self.message.unwrap_or(self.status);
            return Err(RegistrationError::CollaboratorRejected(reason));
        }

        Ok(TunnelRegistration {
            base_url: self.base_url.filter(|url| !url.is_empty()),
            stream_url: self.stream_url.filter(|url| !url.is_empty()),
            registered_at,
        })
    }
}

/// Tunnel endpoint recorded by the registrar
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TunnelRegistration {
    pub base_url: Option<String>,
    pub stream_url: Option<String>,
    pub registered_at: DateTime<Utc>,
}

/// One probed upstream path in a `test_camera` report
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProbeResult {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

impl ProbeResult {
    pub fn is_ok(&self) -> bool {
        self.status == "success"
    }
}

/// `GET /api/test_camera` response body.
///
/// Either a single `{status, message}` pair or a map of named probes
/// (`local_proxy`, `esp32_direct`, `ngrok`, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamReport {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub probes: BTreeMap<String, ProbeResult>,
}

impl UpstreamReport {
    /// Look up a named probe
    pub fn probe(&self, name: &str) -> Option<&ProbeResult> {
        self.probes.get(name)
    }

    /// Whether every reported check succeeded
    pub fn all_ok(&self) -> bool {
        let top_ok = self.status.as_deref().map(|s| s == "success");
        let probes_ok = self.probes.values().all(ProbeResult::is_ok);

        match top_ok {
            Some(ok) => ok && probes_ok,
            None => !self.probes.is_empty() && probes_ok,
        }
    }

    /// Names of the probes that failed
    pub fn failed_probes(&self) -> Vec<&str> {
        self.probes
            .iter()
            .filter(|(_, probe)| !probe.is_ok())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
