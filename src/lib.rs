//! Async client library for the [go2rtc](https://github.com/AlexxIT/go2rtc)
//! streaming server.
//!
//! Two independent facades:
//! - [`rest::Go2RtcRestClient`]: stateless request/response wrapper for
//!   application info, stream management and one-shot WHEP offer forwarding.
//! - [`ws::Go2RtcWsClient`]: a long-lived websocket session exchanging
//!   WebRTC signaling messages with subscriber dispatch.
//!
//! All operations are fallible and nothing is retried internally; callers
//! own retry policy. Targets go2rtc server versions `>= 1.9.5, < 2.0.0`.

pub mod error;
pub mod models;
pub mod rest;
pub mod ws;

pub use error::{Go2RtcError, VersionError};
pub use models::{ApplicationInfo, Producer, Stream, WebRtcSdpAnswer, WebRtcSdpOffer};
pub use rest::Go2RtcRestClient;
pub use ws::Go2RtcWsClient;
