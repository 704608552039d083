//! Player configuration

use std::time::Duration;

/// Default upper bound on a single JPEG part
pub const DEFAULT_MAX_FRAME_SIZE: usize = 2 * 1024 * 1024;

/// MJPEG player configuration
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// Longest gap without body bytes before the stream counts as failed
    pub stall_timeout: Duration,

    /// Largest accepted JPEG part in bytes
    pub max_frame_size: usize,

    /// User-Agent header for stream fetches
    pub user_agent: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            stall_timeout: Duration::from_secs(15),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            user_agent: concat!("camrelay/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl PlayerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the stall timeout
    pub fn stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = timeout;
        self
    }

    /// Set the largest accepted frame
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Set the User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PlayerConfig::default();
        assert_eq!(config.stall_timeout, Duration::from_secs(15));
        assert_eq!(config.max_frame_size, 2 * 1024 * 1024);
        assert!(config.user_agent.starts_with("camrelay/"));
    }

    #[test]
    fn test_builder() {
        let config = PlayerConfig::new()
            .stall_timeout(Duration::from_secs(3))
            .max_frame_size(1024)
            .user_agent("viewer");

        assert_eq!(config.stall_timeout, Duration::from_secs(3));
        assert_eq!(config.max_frame_size, 1024);
        assert_eq!(config.user_agent, "viewer");
    }
}
