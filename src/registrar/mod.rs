//! Registrar collaborator client
//!
//! The registrar is the web application that owns camera status and the
//! tunnel registration. The streaming core only consumes its small JSON API:
//!
//! | Operation          | Request                          |
//! |--------------------|----------------------------------|
//! | Fetch status       | `GET /api/camera_status`         |
//! | Test upstream      | `GET /api/test_camera`           |
//! | Auto-detect tunnel | `GET /api/auto_detect_ngrok`     |
//! | Register tunnel    | `POST /api/register_ngrok {url}` |
//! | Clear tunnel       | `POST /api/register_ngrok {""}`  |
//!
//! [`Registrar`] is the seam the resolver and status poller depend on;
//! [`HttpRegistrar`] is the production implementation.

pub mod config;
pub mod http;
pub mod tunnel;
pub mod types;

use async_trait::async_trait;

use crate::error::{RegistrarError, RegistrationError};

pub use config::{RegistrarConfig, RelayEndpoints};
pub use http::HttpRegistrar;
pub use tunnel::{compose_stream_url, normalize_tunnel_url};
pub use types::{
    ConnectionState, ProbeResult, StatusReport, StatusSnapshot, TunnelRegistration,
    UpstreamReport,
};

/// Operations the streaming core needs from the registrar
#[async_trait]
pub trait Registrar: Send + Sync {
    /// Current camera status and registered tunnel stream URL
    async fn fetch_status(&self) -> Result<StatusReport, RegistrarError>;

    /// Ask the registrar to probe its upstream paths
    async fn test_upstream(&self) -> Result<UpstreamReport, RegistrarError>;

    /// Ask the registrar to discover and register a running tunnel
    async fn auto_detect_tunnel(&self) -> Result<TunnelRegistration, RegistrationError>;

    /// Register a user-supplied tunnel URL
    async fn register_tunnel(&self, url: &str) -> Result<TunnelRegistration, RegistrationError>;

    /// Remove the current tunnel registration
    async fn clear_tunnel(&self) -> Result<(), RegistrationError>;
}
