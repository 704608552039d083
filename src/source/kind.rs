//! Source selector

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Logical upstream the viewer is pointed at.
///
/// UI selector values are `proxy`, `local` and `ngrok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SourceKind {
    /// General relay on the registrar host
    #[default]
    #[serde(rename = "proxy")]
    Proxy,
    /// Local-network relay
    #[serde(rename = "local")]
    Local,
    /// Dynamically registered tunnel
    #[serde(rename = "ngrok", alias = "tunnel")]
    Tunnel,
}

impl SourceKind {
    /// All selectable kinds, in UI order
    pub const ALL: [SourceKind; 3] = [SourceKind::Proxy, SourceKind::Local, SourceKind::Tunnel];

    /// UI selector value
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Proxy => "proxy",
            SourceKind::Local => "local",
            SourceKind::Tunnel => "ngrok",
        }
    }

    /// Whether resolving this kind needs a registrar round trip
    pub fn needs_registrar(&self) -> bool {
        matches!(self, SourceKind::Tunnel)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised selector value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown source selector: {0}")]
pub struct UnknownSource(pub String);

impl FromStr for SourceKind {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "proxy" => Ok(SourceKind::Proxy),
            "local" => Ok(SourceKind::Local),
            "ngrok" | "tunnel" => Ok(SourceKind::Tunnel),
            _ => Err(UnknownSource(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selector_values() {
        assert_eq!("proxy".parse::<SourceKind>().unwrap(), SourceKind::Proxy);
        assert_eq!("local".parse::<SourceKind>().unwrap(), SourceKind::Local);
        assert_eq!("ngrok".parse::<SourceKind>().unwrap(), SourceKind::Tunnel);
        assert_eq!(" Tunnel ".parse::<SourceKind>().unwrap(), SourceKind::Tunnel);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "rtsp".parse::<SourceKind>().unwrap_err();
        assert_eq!(err, UnknownSource("rtsp".into()));
    }

    #[test]
    fn test_display_matches_selector() {
        for kind in SourceKind::ALL {
            assert_eq!(kind.to_string().parse::<SourceKind>().unwrap(), kind);
        }
        assert_eq!(SourceKind::Tunnel.to_string(), "ngrok");
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&SourceKind::Tunnel).unwrap(), r#""ngrok""#);
        assert_eq!(
            serde_json::from_str::<SourceKind>(r#""tunnel""#).unwrap(),
            SourceKind::Tunnel
        );
        assert_eq!(SourceKind::default(), SourceKind::Proxy);
    }

    #[test]
    fn test_only_tunnel_needs_registrar() {
        assert!(SourceKind::Tunnel.needs_registrar());
        assert!(!SourceKind::Proxy.needs_registrar());
        assert!(!SourceKind::Local.needs_registrar());
    }
}
