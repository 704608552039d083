//! HTTP implementation of the registrar client

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::error::{Error, RegistrarError, RegistrationError, Result};

use super::config::RegistrarConfig;
use super::tunnel::normalize_tunnel_url;
use super::types::{StatusReport, TunnelRegistration, TunnelResponse, UpstreamReport};
use super::Registrar;

const STATUS_PATH: &str = "/api/camera_status";
const TEST_PATH: &str = "/api/test_camera";
const AUTO_DETECT_PATH: &str = "/api/auto_detect_ngrok";
const REGISTER_PATH: &str = "/api/register_ngrok";

/// Registrar client speaking the collaborator's JSON/HTTP API
pub struct HttpRegistrar {
    client: reqwest::Client,
    config: RegistrarConfig,
}

impl HttpRegistrar {
    /// Create a client for the given configuration
    pub fn new(config: RegistrarConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::ClientSetup(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Get the client configuration
    pub fn config(&self) -> &RegistrarConfig {
        &self.config
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> std::result::Result<T, RegistrarError> {
        let url = self.config.endpoint(path);
        tracing::trace!(url = %url, "Registrar GET");

        let response = self.client.get(&url).send().await?;
        Self::decode(response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> std::result::Result<T, RegistrarError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.config.endpoint(path);
        tracing::trace!(url = %url, "Registrar POST");

        let response = self.client.post(&url).json(body).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> std::result::Result<T, RegistrarError> {
        let status = response.status();
        if !status.is_success() {
            return Err(RegistrarError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| RegistrarError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl Registrar for HttpRegistrar {
    async fn fetch_status(&self) -> std::result::Result<StatusReport, RegistrarError> {
        self.get_json(STATUS_PATH).await
    }

    async fn test_upstream(&self) -> std::result::Result<UpstreamReport, RegistrarError> {
        self.get_json(TEST_PATH).await
    }

    async fn auto_detect_tunnel(
        &self,
    ) -> std::result::Result<TunnelRegistration, RegistrationError> {
        let response: TunnelResponse = self.get_json(AUTO_DETECT_PATH).await?;
        let registration = response.into_registration(Utc::now())?;

        tracing::info!(
            stream_url = registration.stream_url.as_deref().unwrap_or("-"),
            "Tunnel auto-detected"
        );
        Ok(registration)
    }

    async fn register_tunnel(
        &self,
        url: &str,
    ) -> std::result::Result<TunnelRegistration, RegistrationError> {
        let base = normalize_tunnel_url(url)?;

        let response: TunnelResponse = self
            .post_json(REGISTER_PATH, &json!({ "ngrok_url": base }))
            .await?;
        let registration = response.into_registration(Utc::now())?;

        tracing::info!(base_url = %base, "Tunnel registered");
        Ok(registration)
    }

    async fn clear_tunnel(&self) -> std::result::Result<(), RegistrationError> {
        let response: TunnelResponse = self
            .post_json(REGISTER_PATH, &json!({ "ngrok_url": "" }))
            .await?;

        if !response.is_success() {
            let reason = response.message.unwrap_or(response.status);
            return Err(RegistrationError::CollaboratorRejected(reason));
        }

        tracing::info!("Tunnel registration cleared");
        Ok(())
    }
}
