//! Source resolver
//!
//! Maps a [`SourceKind`] to a concrete URL. Relay kinds resolve to fixed
//! paths without I/O; the tunnel kind asks the registrar every time, since a
//! tunnel can be re-registered at any moment and a cached URL would silently
//! point at a dead endpoint.

use std::sync::Arc;

use crate::error::ResolutionError;
use crate::registrar::{compose_stream_url, Registrar, RelayEndpoints};

use super::kind::SourceKind;

/// Resolves source selectors to fetchable stream URLs
#[derive(Clone)]
pub struct SourceResolver {
    registrar: Arc<dyn Registrar>,
    endpoints: RelayEndpoints,
}

impl SourceResolver {
    /// Create a resolver over a registrar and the fixed relay endpoints
    pub fn new(registrar: Arc<dyn Registrar>, endpoints: RelayEndpoints) -> Self {
        Self {
            registrar,
            endpoints,
        }
    }

    /// Resolve `kind` to a URL. Never cached.
    pub async fn resolve(&self, kind: SourceKind) -> Result<String, ResolutionError> {
        match kind {
            SourceKind::Proxy => Ok(self.endpoints.proxy_url.clone()),
            SourceKind::Local => Ok(self.endpoints.local_url.clone()),
            SourceKind::Tunnel => self.resolve_tunnel().await,
        }
    }

    async fn resolve_tunnel(&self) -> Result<String, ResolutionError> {
        let report = self.registrar.fetch_status().await.map_err(|e| {
            tracing::warn!(error = %e, "Registrar query failed during tunnel resolution");
            ResolutionError::from(e)
        })?;

        let registered = report
            .registered_stream_url()
            .ok_or(ResolutionError::NoTunnelRegistered)?;

        let url = compose_stream_url(registered, &self.endpoints.stream_subpath);
        tracing::debug!(url = %url, "Resolved tunnel stream");
        Ok(url)
    }
}
