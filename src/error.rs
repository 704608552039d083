//! Error types
//!
//! Errors are split by who can act on them:
//! - [`ResolutionError`] and [`RegistrationError`] are user-actionable
//!   misconfigurations and are surfaced immediately, never retried.
//! - [`DeliveryFailure`] is a transport-level signal handled internally by
//!   the recovery monitor once a stream has started.
//! - [`RegistrarError`] is the raw outcome of a collaborator HTTP call and is
//!   mapped into one of the above at the component boundary.
//!
//! All of them are `Clone` so they can be carried inside broadcast events.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Umbrella error for the crate
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Delivery(#[from] DeliveryFailure),

    #[error(transparent)]
    Registrar(#[from] RegistrarError),

    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),
}

/// Failure to turn a source selector into a fetchable URL
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// The registrar has no tunnel stream URL on record
    #[error("no tunnel is registered")]
    NoTunnelRegistered,

    /// The registrar could not be queried (network, status, timeout, bad JSON)
    #[error("registrar unavailable: {0}")]
    CollaboratorUnavailable(String),
}

/// Failure to register, detect or clear a tunnel
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The URL was rejected before contacting the registrar
    #[error("invalid tunnel URL: {0}")]
    InvalidUrlFormat(String),

    /// The registrar answered but refused the request
    #[error("registrar rejected request: {0}")]
    CollaboratorRejected(String),

    /// The registrar could not be reached or answered with an error status
    #[error("network error: {0}")]
    NetworkError(String),
}

/// Runtime signal that the active stream stopped delivering valid data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryFailure {
    /// Connection could not be opened or dropped mid-stream
    #[error("connection failed: {0}")]
    Connection(String),

    /// Upstream answered with a non-2xx status
    #[error("upstream returned HTTP {0}")]
    HttpStatus(u16),

    /// A multipart stream reached end of body
    #[error("stream ended")]
    StreamEnded,

    /// No bytes arrived for the configured stall window
    #[error("no data for {0:?}")]
    Stalled(Duration),

    /// A part could not be interpreted as a JPEG frame
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

/// Raw outcome of a failed registrar call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrarError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("registrar returned HTTP {0}")]
    Status(u16),

    #[error("malformed registrar response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for RegistrarError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RegistrarError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            RegistrarError::Status(status.as_u16())
        } else {
            RegistrarError::Transport(err.to_string())
        }
    }
}

impl From<RegistrarError> for ResolutionError {
    fn from(err: RegistrarError) -> Self {
        ResolutionError::CollaboratorUnavailable(err.to_string())
    }
}

impl From<RegistrarError> for RegistrationError {
    fn from(err: RegistrarError) -> Self {
        RegistrationError::NetworkError(err.to_string())
    }
}
