//! go2rtc websocket signaling client
//!
//! Long-lived connection to `GET /api/ws` sending signaling messages and
//! dispatching received ones to subscribers. Owns exactly one background
//! receive task per connection.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;

use super::messages::{ReceiveMessage, SendMessage, WireMessage};
use crate::error::Go2RtcError;

const WS_PATH: &str = "/api/ws";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type Callback = Arc<dyn Fn(&ReceiveMessage) + Send + Sync>;

struct Subscriber {
    id: u64,
    callback: Callback,
}

struct Connection {
    sink: Arc<tokio::sync::Mutex<WsSink>>,
    alive: Arc<AtomicBool>,
    rx_task: JoinHandle<()>,
}

/// Handle returned by [`Go2RtcWsClient::subscribe`].
///
/// Removes exactly the registered callback. Safe to call from within a
/// callback's own invocation; removal takes effect for subsequent dispatches.
pub struct Subscription {
    id: u64,
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        self.subscribers.lock().retain(|s| s.id != self.id);
    }
}

/// Websocket client for a go2rtc server.
///
/// Attaches as either a stream source (`src`) or destination (`dst`).
/// Connection attempts are serialized; `send` connects implicitly when
/// needed. No retries anywhere, a failure surfaces to the caller.
pub struct Go2RtcWsClient {
    url: Url,
    connect_lock: tokio::sync::Mutex<()>,
    connection: Mutex<Option<Connection>>,
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
    next_subscriber_id: AtomicU64,
}

impl std::fmt::Debug for Go2RtcWsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Go2RtcWsClient")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl Go2RtcWsClient {
    /// Create a new websocket client for the server at `server_url`.
    ///
    /// Exactly one of `source` or `destination` must be set; violating this
    /// is a caller programming error and fails here with
    /// [`Go2RtcError::InvalidConfig`].
    pub fn new(
        server_url: impl AsRef<str>,
        source: Option<&str>,
        destination: Option<&str>,
    ) -> Result<Self, Go2RtcError> {
        let (key, value) = match (source, destination) {
            (Some(_), Some(_)) => {
                return Err(Go2RtcError::InvalidConfig(
                    "source and destination cannot be set at the same time".to_string(),
                ))
            }
            (Some(source), None) => ("src", source),
            (None, Some(destination)) => ("dst", destination),
            (None, None) => {
                return Err(Go2RtcError::InvalidConfig(
                    "source or destination must be set".to_string(),
                ))
            }
        };

        let mut url = Url::parse(server_url.as_ref())
            .map_err(|err| Go2RtcError::InvalidConfig(format!("invalid server URL: {err}")))?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(Go2RtcError::InvalidConfig(format!(
                    "unsupported URL scheme '{other}'"
                )))
            }
        };
        url.set_scheme(scheme)
            .map_err(|()| Go2RtcError::InvalidConfig("invalid server URL".to_string()))?;
        url.set_path(WS_PATH);
        url.query_pairs_mut().clear().append_pair(key, value);

        Ok(Self {
            url,
            connect_lock: tokio::sync::Mutex::new(()),
            connection: Mutex::new(None),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            next_subscriber_id: AtomicU64::new(0),
        })
    }

    /// Whether the socket exists and is not closed. Never blocks.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.connection
            .lock()
            .as_ref()
            .is_some_and(|c| c.alive.load(Ordering::SeqCst))
    }

    /// Connect to the server.
    ///
    /// Idempotent; concurrent callers are serialized and result in exactly
    /// one handshake. On success, starts one background receive task bound
    /// to the socket.
    pub async fn connect(&self) -> Result<(), Go2RtcError> {
        let _guard = self.connect_lock.lock().await;
        if self.connected() {
            return Ok(());
        }

        debug!("Trying to connect to {}", self.url);
        let (stream, _) = connect_async(self.url.as_str()).await?;
        let (sink, stream) = stream.split();

        let alive = Arc::new(AtomicBool::new(true));
        let rx_task = tokio::spawn(receive_loop(
            stream,
            Arc::clone(&self.subscribers),
            Arc::clone(&alive),
        ));
        *self.connection.lock() = Some(Connection {
            sink: Arc::new(tokio::sync::Mutex::new(sink)),
            alive,
            rx_task,
        });
        info!("Connected to {}", self.url);
        Ok(())
    }

    /// Close the connection.
    ///
    /// Idempotent. Cancels and awaits the receive task before returning, so
    /// no subscriber callback fires after this resolves.
    pub async fn close(&self) -> Result<(), Go2RtcError> {
        let Some(connection) = self.connection.lock().take() else {
            return Ok(());
        };
        let Connection {
            sink,
            alive,
            rx_task,
        } = connection;

        alive.store(false, Ordering::SeqCst);
        rx_task.abort();
        let _ = rx_task.await;
        // Socket may already be gone when the server initiated the close.
        let _ = sink.lock().await.close().await;
        Ok(())
    }

    /// Send a signaling message as a single text frame, connecting first if
    /// not connected.
    pub async fn send(&self, message: &SendMessage) -> Result<(), Go2RtcError> {
        if !self.connected() {
            self.connect().await?;
        }

        let sink = match self.connection.lock().as_ref() {
            Some(connection) => Arc::clone(&connection.sink),
            None => return Err(Go2RtcError::WebSocket("not connected".to_string())),
        };
        let json = message.to_wire_json()?;
        sink.lock().await.send(Message::Text(json.into())).await?;
        Ok(())
    }

    /// Subscribe to recognized inbound messages.
    ///
    /// The callback is invoked synchronously on the receive loop, in
    /// registration order across subscribers. A panicking callback is
    /// logged and skipped; it does not affect other subscribers or the loop.
    pub fn subscribe(
        &self,
        callback: impl Fn(&ReceiveMessage) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().push(Subscriber {
            id,
            callback: Arc::new(callback),
        });
        Subscription {
            id,
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

async fn receive_loop(
    mut stream: SplitStream<WsStream>,
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
    alive: Arc<AtomicBool>,
) {
    while let Some(frame) = stream.next().await {
        match frame {
            // Control frames end the conversation, pings included: go2rtc
            // does not send keepalive pings, so a ping here is not a live
            // session. Intentional, even though the transport surfaces
            // server pings that other stacks would swallow.
            Ok(Message::Close(_) | Message::Ping(_) | Message::Pong(_)) => break,
            Ok(Message::Text(text)) => process_text_message(text.as_str(), &subscribers),
            Ok(other) => warn!("Received unknown message: {other:?}"),
            Err(err) => error!("Error received: {err}"),
        }
    }
    alive.store(false, Ordering::SeqCst);
}

fn process_text_message(data: &str, subscribers: &Mutex<Vec<Subscriber>>) {
    let wire: WireMessage = match serde_json::from_str(data) {
        Ok(wire) => wire,
        Err(err) => {
            error!("Invalid message received ({err}): {data}");
            return;
        }
    };
    let Some(message) = ReceiveMessage::from_wire(wire) else {
        error!("Received unexpected message: {data}");
        return;
    };

    // Snapshot so callbacks can unsubscribe without deadlocking; removal
    // takes effect from the next dispatch.
    let callbacks: Vec<Callback> = subscribers
        .lock()
        .iter()
        .map(|s| Arc::clone(&s.callback))
        .collect();
    for callback in callbacks {
        if catch_unwind(AssertUnwindSafe(|| callback(&message))).is_err() {
            error!("Error on subscriber callback");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_with_source() {
        let client = Go2RtcWsClient::new("http://localhost:1984", Some("camera"), None).unwrap();
        assert_eq!(client.url.as_str(), "ws://localhost:1984/api/ws?src=camera");
    }

    #[test]
    fn test_new_with_destination() {
        let client = Go2RtcWsClient::new("https://go2rtc.local", None, Some("camera")).unwrap();
        assert_eq!(client.url.as_str(), "wss://go2rtc.local/api/ws?dst=camera");
    }

    #[test]
    fn test_new_replaces_base_path() {
        let client =
            Go2RtcWsClient::new("http://localhost:1984/some/prefix", Some("cam"), None).unwrap();
        assert_eq!(client.url.path(), "/api/ws");
    }

    #[test]
    fn test_new_requires_source_or_destination() {
        let err = Go2RtcWsClient::new("http://localhost:1984", None, None).unwrap_err();
        assert!(matches!(err, Go2RtcError::InvalidConfig(_)));
        assert!(err.to_string().contains("source or destination must be set"));
    }

    #[test]
    fn test_new_rejects_source_and_destination() {
        let err =
            Go2RtcWsClient::new("http://localhost:1984", Some("a"), Some("b")).unwrap_err();
        assert!(matches!(err, Go2RtcError::InvalidConfig(_)));
        assert!(err
            .to_string()
            .contains("source and destination cannot be set at the same time"));
    }

    #[test]
    fn test_new_rejects_unsupported_scheme() {
        let err = Go2RtcWsClient::new("ftp://localhost", Some("cam"), None).unwrap_err();
        assert!(matches!(err, Go2RtcError::InvalidConfig(_)));
    }

    #[test]
    fn test_not_connected_initially() {
        let client = Go2RtcWsClient::new("http://localhost:1984", Some("cam"), None).unwrap();
        assert!(!client.connected());
    }

    #[test]
    fn test_unsubscribe_removes_only_that_listener() {
        let client = Go2RtcWsClient::new("http://localhost:1984", Some("cam"), None).unwrap();
        let first = client.subscribe(|_| {});
        let _second = client.subscribe(|_| {});
        assert_eq!(client.subscribers.lock().len(), 2);

        first.unsubscribe();
        assert_eq!(client.subscribers.lock().len(), 1);
    }

    #[test]
    fn test_dispatch_continues_past_panicking_subscriber() {
        use std::sync::atomic::AtomicUsize;

        let client = Go2RtcWsClient::new("http://localhost:1984", Some("cam"), None).unwrap();
        let delivered = Arc::new(AtomicUsize::new(0));

        let _panicking = client.subscribe(|_| panic!("subscriber bug"));
        let counter = Arc::clone(&delivered);
        let _counting = client.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        process_text_message(
            r#"{"type": "webrtc/candidate", "value": "x"}"#,
            &client.subscribers,
        );
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invalid_frame_does_not_panic_and_skips_dispatch() {
        use std::sync::atomic::AtomicUsize;

        let client = Go2RtcWsClient::new("http://localhost:1984", Some("cam"), None).unwrap();
        let delivered = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&delivered);
        let _subscription = client.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        process_text_message("not json", &client.subscribers);
        // Recognized wire shape but outbound-only variant.
        process_text_message(
            r#"{"type": "webrtc", "value": {"type": "offer", "sdp": "v=0", "ice_servers": []}}"#,
            &client.subscribers,
        );
        assert_eq!(delivered.load(Ordering::SeqCst), 0);

        process_text_message(
            r#"{"type": "error", "value": "boom"}"#,
            &client.subscribers,
        );
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }
}
