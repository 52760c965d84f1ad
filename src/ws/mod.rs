//! Websocket signaling for go2rtc
//!
//! Long-lived `/api/ws` session exchanging WebRTC offers, answers, ICE
//! candidates and errors. Independent of the REST facade; callers use one
//! or both per use case.

mod client;
mod messages;

pub use client::{Go2RtcWsClient, Subscription};
pub use messages::{ReceiveMessage, RtcIceServer, SendMessage};
