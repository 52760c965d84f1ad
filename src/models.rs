//! go2rtc REST API types
//!
//! JSON shapes for the `/api`, `/api/streams` and `/api/webrtc` endpoints.
//! Entities are created fresh per request/response cycle; nothing here is
//! cached or persisted by the client.

use serde::{Deserialize, Deserializer, Serialize};

/// Server self-report from `GET /api`.
///
/// Only the version is exposed. It stays a raw string here; parsing and the
/// supported-range check happen in
/// [`validate_server_version`](crate::rest::Go2RtcRestClient::validate_server_version).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationInfo {
    pub version: String,
}

/// A named stream registered with the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    /// Source feeds backing this stream. The server omits or nulls the field
    /// for streams without producers; both decode to an empty list.
    #[serde(default, deserialize_with = "null_to_empty")]
    pub producers: Vec<Producer>,
}

/// A source feed (e.g. a camera) backing a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Producer {
    pub url: String,
    #[serde(default, deserialize_with = "null_to_empty")]
    pub medias: Vec<String>,
}

/// Common wire shape for SDP payloads: `{"type": "offer"|"answer", "sdp": ...}`.
///
/// The tag is inspected explicitly when converting to the offer/answer
/// types, so a payload with the wrong tag is rejected instead of silently
/// accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum SdpWire {
    Offer { sdp: String },
    Answer { sdp: String },
}

/// WebRTC SDP offer, serialized as `{"type": "offer", "sdp": ...}`.
///
/// The `type` tag is fixed and not settable by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "SdpWire", try_from = "SdpWire")]
pub struct WebRtcSdpOffer {
    pub sdp: String,
}

/// WebRTC SDP answer, serialized as `{"type": "answer", "sdp": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "SdpWire", try_from = "SdpWire")]
pub struct WebRtcSdpAnswer {
    pub sdp: String,
}

impl From<WebRtcSdpOffer> for SdpWire {
    fn from(offer: WebRtcSdpOffer) -> Self {
        Self::Offer { sdp: offer.sdp }
    }
}

impl TryFrom<SdpWire> for WebRtcSdpOffer {
    type Error = String;

    fn try_from(wire: SdpWire) -> Result<Self, Self::Error> {
        match wire {
            SdpWire::Offer { sdp } => Ok(Self { sdp }),
            SdpWire::Answer { .. } => Err("expected SDP type 'offer', got 'answer'".to_string()),
        }
    }
}

impl From<WebRtcSdpAnswer> for SdpWire {
    fn from(answer: WebRtcSdpAnswer) -> Self {
        Self::Answer { sdp: answer.sdp }
    }
}

impl TryFrom<SdpWire> for WebRtcSdpAnswer {
    type Error = String;

    fn try_from(wire: SdpWire) -> Result<Self, Self::Error> {
        match wire {
            SdpWire::Answer { sdp } => Ok(Self { sdp }),
            SdpWire::Offer { .. } => Err("expected SDP type 'answer', got 'offer'".to_string()),
        }
    }
}

impl WebRtcSdpOffer {
    pub fn new(sdp: impl Into<String>) -> Self {
        Self { sdp: sdp.into() }
    }
}

impl WebRtcSdpAnswer {
    pub fn new(sdp: impl Into<String>) -> Self {
        Self { sdp: sdp.into() }
    }
}

/// Decode a JSON list that the server may send as `null`.
fn null_to_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value = Option::<Vec<T>>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}
