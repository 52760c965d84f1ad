//! go2rtc client error types
//!
//! One error enum shared by the REST and WebSocket facades, plus response
//! helpers used by every REST call.

use thiserror::Error;

/// Maximum response body size for go2rtc HTTP calls (16 MB).
/// Prevents OOM from a malicious or misconfigured server.
pub const MAX_RESPONSE_SIZE: usize = 16 * 1024 * 1024;

/// Common error type for the go2rtc client.
#[derive(Debug, Error)]
pub enum Go2RtcError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error {status} for {url}: {body}")]
    Http {
        status: reqwest::StatusCode,
        url: String,
        body: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Response too large ({size} bytes, max {MAX_RESPONSE_SIZE})")]
    ResponseTooLarge { size: u64 },

    #[error(transparent)]
    Version(#[from] VersionError),
}

/// Server version is unparseable or outside the supported range.
///
/// Carries the raw server-reported version (`None` when the server could not
/// be queried) and the configured bounds for a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "server version '{}' not >= {min_supported} and < {max_unsupported}",
    .server_version.as_deref().unwrap_or("unknown")
)]
pub struct VersionError {
    pub server_version: Option<String>,
    pub min_supported: String,
    pub max_unsupported: String,
}

/// Check HTTP response status before processing the body.
///
/// Any non-2xx response surfaces status, URL and the raw body text. go2rtc
/// error bodies are plain text (e.g. a probe of an offline camera), so the
/// body is never decoded as JSON here.
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, Go2RtcError> {
    let status = resp.status();
    if !status.is_success() {
        let url = resp.url().to_string();
        let body = resp.text().await.unwrap_or_default();
        return Err(Go2RtcError::Http { status, url, body });
    }
    Ok(resp)
}

/// Read a response body with size limit and deserialize as JSON.
///
/// Checks the `Content-Length` hint first (if available), then enforces the
/// limit on the actual body bytes before deserializing.
pub async fn json_with_limit<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, Go2RtcError> {
    if let Some(cl) = response.content_length() {
        if cl as usize > MAX_RESPONSE_SIZE {
            return Err(Go2RtcError::ResponseTooLarge { size: cl });
        }
    }
    let bytes = response.bytes().await?;
    if bytes.len() > MAX_RESPONSE_SIZE {
        return Err(Go2RtcError::ResponseTooLarge {
            size: bytes.len() as u64,
        });
    }
    serde_json::from_slice(&bytes).map_err(Into::into)
}

impl From<reqwest::Error> for Go2RtcError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for Go2RtcError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Go2RtcError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(err.to_string())
    }
}
