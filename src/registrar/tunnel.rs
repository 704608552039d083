//! Tunnel URL validation and normalization
//!
//! Users paste whatever the tunnelling service printed: with or without a
//! trailing slash, sometimes with the stream path already appended. The
//! registrar stores the bare base, and the resolver always re-appends the
//! stream sub-path, so both sides agree on `{base}/stream`.

use reqwest::Url;

use crate::error::RegistrationError;

use super::config::STREAM_SUBPATH;

/// Validate a user-supplied tunnel URL and reduce it to its base.
///
/// The URL must be absolute `http`/`https` with a host. Trailing slashes and
/// a trailing `/stream` are removed.
pub fn normalize_tunnel_url(raw: &str) -> Result<String, RegistrationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RegistrationError::InvalidUrlFormat("URL is empty".into()));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|e| RegistrationError::InvalidUrlFormat(format!("{}: {}", trimmed, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(RegistrationError::InvalidUrlFormat(format!(
            "{}: scheme must be http or https",
            trimmed
        )));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(RegistrationError::InvalidUrlFormat(format!(
            "{}: missing host",
            trimmed
        )));
    }

    Ok(strip_stream_suffix(trimmed, STREAM_SUBPATH).to_string())
}

/// Remove trailing slashes and one trailing `subpath` from `url`
pub fn strip_stream_suffix<'a>(url: &'a str, subpath: &str) -> &'a str {
    let url = url.trim().trim_end_matches('/');
    let subpath = subpath.trim_end_matches('/');

    let url = if subpath.is_empty() {
        url
    } else {
        url.strip_suffix(subpath).unwrap_or(url)
    };

    url.trim_end_matches('/')
}

/// Compose the fetchable stream URL from a registered base or stream URL
pub fn compose_stream_url(registered: &str, subpath: &str) -> String {
    let base = strip_stream_suffix(registered, subpath);
    format!("{}{}", base, subpath)
}
