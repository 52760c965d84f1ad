//! go2rtc websocket signaling messages
//!
//! Wire format for go2rtc 1.9.x: one JSON object per text frame,
//! discriminated by a `type` field. Candidates and errors use flat tags
//! (`"webrtc/candidate"`, `"error"`) with the payload in `value`; offers and
//! answers travel nested inside a `{"type": "webrtc", "value": {...}}`
//! envelope whose inner value is discriminated by `type: "offer"|"answer"`.

use serde::{Deserialize, Deserializer, Serialize};

/// ICE server description carried in WebRTC offers.
///
/// go2rtc only accepts `urls` as a list of strings, so serialization always
/// emits a list; deserialization tolerates a single string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtcIceServer {
    #[serde(default, deserialize_with = "string_or_list")]
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// Raw wire union for inbound and outbound frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum WireMessage {
    #[serde(rename = "webrtc/candidate")]
    Candidate { value: String },
    #[serde(rename = "webrtc")]
    WebRtc { value: WireSdp },
    #[serde(rename = "error")]
    Error { value: String },
}

/// Inner value of the `webrtc` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub(crate) enum WireSdp {
    Offer {
        sdp: String,
        ice_servers: Vec<RtcIceServer>,
    },
    Answer {
        sdp: String,
    },
}

/// Messages the server sends to the client.
///
/// Offers are outbound-only for this client; an inbound offer is dropped as
/// unexpected by the receive loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveMessage {
    WebRtcAnswer { sdp: String },
    WebRtcCandidate { candidate: String },
    Error { error: String },
}

/// Messages the client sends to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendMessage {
    WebRtcOffer {
        sdp: String,
        ice_servers: Vec<RtcIceServer>,
    },
    WebRtcCandidate {
        candidate: String,
    },
}

impl ReceiveMessage {
    /// Map a decoded frame to a recognized inbound message.
    ///
    /// `None` means the frame decoded fine but is not an inbound variant.
    pub(crate) fn from_wire(wire: WireMessage) -> Option<Self> {
        match wire {
            WireMessage::Candidate { value } => Some(Self::WebRtcCandidate { candidate: value }),
            WireMessage::Error { value } => Some(Self::Error { error: value }),
            WireMessage::WebRtc {
                value: WireSdp::Answer { sdp },
            } => Some(Self::WebRtcAnswer { sdp }),
            WireMessage::WebRtc {
                value: WireSdp::Offer { .. },
            } => None,
        }
    }
}

impl SendMessage {
    /// Serialize to the wire JSON form, one text frame per message.
    pub(crate) fn to_wire_json(&self) -> Result<String, serde_json::Error> {
        let wire = match self {
            Self::WebRtcOffer { sdp, ice_servers } => WireMessage::WebRtc {
                value: WireSdp::Offer {
                    sdp: sdp.clone(),
                    ice_servers: ice_servers.clone(),
                },
            },
            Self::WebRtcCandidate { candidate } => WireMessage::Candidate {
                value: candidate.clone(),
            },
        };
        serde_json::to_string(&wire)
    }
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        One(String),
        Many(Vec<String>),
    }

    Ok(match StringOrList::deserialize(deserializer)? {
        StringOrList::One(url) => vec![url],
        StringOrList::Many(urls) => urls,
    })
}
