//! Registrar client configuration

use std::time::Duration;

/// Default collaborator address (the web app serving the relay paths)
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Relay path that forwards whichever upstream the server prefers
pub const PROXY_PATH: &str = "/stream_proxy";

/// Relay path that forwards the local camera proxy
pub const LOCAL_PATH: &str = "/local_stream_proxy";

/// Stream sub-path appended to a registered tunnel base
pub const STREAM_SUBPATH: &str = "/stream";

/// Registrar configuration options
#[derive(Debug, Clone)]
pub struct RegistrarConfig {
    /// Base URL of the collaborator (scheme, host, port)
    pub base_url: String,

    /// Per-request timeout for every collaborator call
    pub request_timeout: Duration,

    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Path of the general relay
    pub proxy_path: String,

    /// Path of the local-network relay
    pub local_path: String,

    /// Sub-path composed onto a registered tunnel base
    pub stream_subpath: String,
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            user_agent: concat!("camrelay/", env!("CARGO_PKG_VERSION")).to_string(),
            proxy_path: PROXY_PATH.to_string(),
            local_path: LOCAL_PATH.to_string(),
            stream_subpath: STREAM_SUBPATH.to_string(),
        }
    }
}

impl RegistrarConfig {
    /// Create a new config pointing at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Override the relay paths
    pub fn relay_paths(mut self, proxy: impl Into<String>, local: impl Into<String>) -> Self {
        self.proxy_path = proxy.into();
        self.local_path = local.into();
        self
    }

    /// Absolute URL for a collaborator path
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }

    /// Fixed relay URLs used by the source resolver
    pub fn relay_endpoints(&self) -> RelayEndpoints {
        RelayEndpoints {
            proxy_url: self.endpoint(&self.proxy_path),
            local_url: self.endpoint(&self.local_path),
            stream_subpath: self.stream_subpath.clone(),
        }
    }
}

/// Well-known relay URLs resolved once from the config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEndpoints {
    pub proxy_url: String,
    pub local_url: String,
    pub stream_subpath: String,
}

impl Default for RelayEndpoints {
    fn default() -> Self {
        RegistrarConfig::default().relay_endpoints()
    }
}
