//! go2rtc REST client
//!
//! Stateless request/response wrapper over the go2rtc HTTP API: application
//! info, stream management, one-shot WHEP offer forwarding and the server
//! version gate. Persistent signaling lives in [`crate::ws`].

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use semver::Version;
use tracing::debug;
use url::Url;

use crate::error::{check_response, json_with_limit, Go2RtcError, VersionError};
use crate::models::{ApplicationInfo, Stream, WebRtcSdpAnswer, WebRtcSdpOffer};

const API_PATH: &str = "/api";
const STREAMS_PATH: &str = "/api/streams";
const WEBRTC_PATH: &str = "/api/webrtc";

/// Inclusive lower bound of the supported go2rtc server versions.
const MIN_VERSION_SUPPORTED: Version = Version::new(1, 9, 5);
/// Exclusive upper bound; bump only when intentionally tracking a newer
/// server API revision.
const MIN_VERSION_UNSUPPORTED: Version = Version::new(2, 0, 0);

/// Shared HTTP client for all go2rtc requests (connection pooling).
static SHARED_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .build()
        .expect("Failed to build go2rtc shared HTTP client")
});

/// Base request helper shared by all REST facades.
///
/// Composes paths against the configured base URL (the base URL's own path
/// component is replaced, not joined), translates transport failures to
/// [`Go2RtcError::Network`] and non-2xx responses to [`Go2RtcError::Http`].
#[derive(Debug)]
struct BaseClient {
    base_url: Url,
    client: Client,
}

impl BaseClient {
    fn url_for(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        url.set_query(None);
        url
    }

    fn begin(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url_for(path);
        debug!("request[{method}] {url}");
        self.client.request(method, url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, Go2RtcError> {
        let resp = request.send().await?;
        check_response(resp).await
    }
}

/// Conversion into the repeated `src` query values of `PUT /api/streams`.
///
/// Accepts a single source or an ordered sequence; each element becomes one
/// `src` parameter occurrence, in order.
pub trait IntoStreamSources {
    fn into_sources(self) -> Vec<String>;
}

impl IntoStreamSources for &str {
    fn into_sources(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoStreamSources for String {
    fn into_sources(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoStreamSources for &String {
    fn into_sources(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl<S: Into<String>> IntoStreamSources for Vec<S> {
    fn into_sources(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<S: Into<String> + Clone> IntoStreamSources for &[S] {
    fn into_sources(self) -> Vec<String> {
        self.iter().cloned().map(Into::into).collect()
    }
}

impl<S: Into<String>, const N: usize> IntoStreamSources for [S; N] {
    fn into_sources(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

/// Client for the application info endpoint (`GET /api`).
pub struct ApplicationClient<'a> {
    client: &'a BaseClient,
}

impl ApplicationClient<'_> {
    /// Get application info. Fetched per call, never cached.
    pub async fn get_info(&self) -> Result<ApplicationInfo, Go2RtcError> {
        let resp = self.client.send(self.client.begin(Method::GET, API_PATH)).await?;
        json_with_limit(resp).await
    }
}

/// Client for the stream management endpoints (`/api/streams`).
pub struct StreamClient<'a> {
    client: &'a BaseClient,
}

impl StreamClient<'_> {
    /// List streams registered with the server, keyed by stream name.
    pub async fn list(&self) -> Result<HashMap<String, Stream>, Go2RtcError> {
        let resp = self
            .client
            .send(self.client.begin(Method::GET, STREAMS_PATH))
            .await?;
        json_with_limit(resp).await
    }

    /// Add a stream to the server.
    ///
    /// `sources` may be a single source or an ordered sequence; the server
    /// receives one `src` parameter per element.
    pub async fn add(
        &self,
        name: impl Into<String>,
        sources: impl IntoStreamSources,
    ) -> Result<(), Go2RtcError> {
        let mut query: Vec<(&str, String)> = vec![("name", name.into())];
        for source in sources.into_sources() {
            query.push(("src", source));
        }
        let request = self.client.begin(Method::PUT, STREAMS_PATH).query(&query);
        self.client.send(request).await?;
        Ok(())
    }

    /// Probe a stream source, optionally constraining the probed medias
    /// (e.g. `[("audio", "all"), ("video", "all")]`, passed through verbatim).
    ///
    /// A non-2xx response (e.g. camera offline) surfaces as
    /// [`Go2RtcError::Http`] with the server's plain-text body attached.
    pub async fn probe(
        &self,
        name: &str,
        extra_params: &[(&str, &str)],
    ) -> Result<Stream, Go2RtcError> {
        let request = self
            .client
            .begin(Method::GET, STREAMS_PATH)
            .query(&[("src", name)])
            .query(extra_params);
        let resp = self.client.send(request).await?;
        json_with_limit(resp).await
    }
}

/// Client for the WebRTC endpoint (`POST /api/webrtc`).
pub struct WebRtcClient<'a> {
    client: &'a BaseClient,
}

impl WebRtcClient<'_> {
    /// Forward a WHEP SDP offer to the server and decode its answer.
    ///
    /// One-shot request/response exchange; persistent signaling uses
    /// [`crate::ws::Go2RtcWsClient`] instead.
    pub async fn forward_whep_sdp_offer(
        &self,
        source_name: &str,
        offer: &WebRtcSdpOffer,
    ) -> Result<WebRtcSdpAnswer, Go2RtcError> {
        let request = self
            .client
            .begin(Method::POST, WEBRTC_PATH)
            .query(&[("src", source_name)])
            .json(offer);
        let resp = self.client.send(request).await?;
        json_with_limit(resp).await
    }
}

/// REST client for a go2rtc server.
///
/// Cheap to construct; all instances share one pooled HTTP client with a
/// fixed per-request timeout.
#[derive(Debug)]
pub struct Go2RtcRestClient {
    client: BaseClient,
}

impl Go2RtcRestClient {
    /// Create a new REST client for the server at `server_url`.
    pub fn new(server_url: impl AsRef<str>) -> Result<Self, Go2RtcError> {
        let base_url = Url::parse(server_url.as_ref())
            .map_err(|err| Go2RtcError::InvalidConfig(format!("invalid server URL: {err}")))?;
        Ok(Self {
            client: BaseClient {
                base_url,
                client: SHARED_CLIENT.clone(),
            },
        })
    }

    /// Application info sub-resource.
    #[must_use]
    pub fn application(&self) -> ApplicationClient<'_> {
        ApplicationClient {
            client: &self.client,
        }
    }

    /// Stream management sub-resource.
    #[must_use]
    pub fn streams(&self) -> StreamClient<'_> {
        StreamClient {
            client: &self.client,
        }
    }

    /// WebRTC offer forwarding sub-resource.
    #[must_use]
    pub fn webrtc(&self) -> WebRtcClient<'_> {
        WebRtcClient {
            client: &self.client,
        }
    }

    /// Validate that the server version is compatible.
    ///
    /// Fetches application info and checks the reported version against the
    /// supported range `[1.9.5, 2.0.0)`. An unparseable version string is a
    /// [`VersionError`], same as an out-of-range one, carrying the raw
    /// server string and both bounds.
    pub async fn validate_server_version(&self) -> Result<Version, Go2RtcError> {
        let info = self.application().get_info().await?;
        let version = Version::parse(&info.version)
            .map_err(|_| version_error(&info.version))?;
        if !version_in_range(&version) {
            return Err(version_error(&info.version).into());
        }
        Ok(version)
    }
}

fn version_in_range(version: &Version) -> bool {
    *version >= MIN_VERSION_SUPPORTED && *version < MIN_VERSION_UNSUPPORTED
}

fn version_error(server_version: &str) -> VersionError {
    VersionError {
        server_version: Some(server_version.to_string()),
        min_supported: MIN_VERSION_SUPPORTED.to_string(),
        max_unsupported: MIN_VERSION_UNSUPPORTED.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = Go2RtcRestClient::new("http://localhost:1984").unwrap();
        assert_eq!(client.client.base_url.as_str(), "http://localhost:1984/");
    }

    #[test]
    fn test_client_invalid_url() {
        let err = Go2RtcRestClient::new("not a url").unwrap_err();
        assert!(matches!(err, Go2RtcError::InvalidConfig(_)));
    }

    #[test]
    fn test_url_path_is_replaced_not_joined() {
        let client = Go2RtcRestClient::new("http://localhost:1984/some/prefix").unwrap();
        let url = client.client.url_for(STREAMS_PATH);
        assert_eq!(url.as_str(), "http://localhost:1984/api/streams");
    }

    #[test]
    fn test_url_base_query_is_dropped() {
        let client = Go2RtcRestClient::new("http://localhost:1984/?token=abc").unwrap();
        let url = client.client.url_for(API_PATH);
        assert_eq!(url.as_str(), "http://localhost:1984/api");
    }

    #[test]
    fn test_into_stream_sources_single() {
        assert_eq!("rtsp://x".into_sources(), vec!["rtsp://x".to_string()]);
        assert_eq!("rtsp://x".to_string().into_sources(), vec!["rtsp://x"]);
    }

    #[test]
    fn test_into_stream_sources_sequence_preserves_order() {
        let sources = vec!["a", "b", "c"].into_sources();
        assert_eq!(sources, vec!["a", "b", "c"]);

        let slice: &[&str] = &["x", "y"];
        assert_eq!(slice.into_sources(), vec!["x", "y"]);

        assert_eq!(["one", "two"].into_sources(), vec!["one", "two"]);
    }

    #[test]
    fn test_version_in_range() {
        assert!(!version_in_range(&Version::parse("1.9.4").unwrap()));
        assert!(version_in_range(&Version::parse("1.9.5").unwrap()));
        assert!(version_in_range(&Version::parse("1.9.6").unwrap()));
        assert!(version_in_range(&Version::parse("1.10.0").unwrap()));
        assert!(!version_in_range(&Version::parse("2.0.0").unwrap()));
        assert!(!version_in_range(&Version::parse("2.1.0").unwrap()));
    }

    #[test]
    fn test_version_error_carries_bounds() {
        let err = version_error("BLAH");
        assert_eq!(err.server_version.as_deref(), Some("BLAH"));
        assert_eq!(err.min_supported, "1.9.5");
        assert_eq!(err.max_unsupported, "2.0.0");
    }
}
