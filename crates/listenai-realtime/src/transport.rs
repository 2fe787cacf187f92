//! Persistent duplex connection to the interaction endpoint.
//!
//! The transport moves frames and reports lifecycle; it never interprets
//! message semantics. Inbound frames are handed off in arrival order to a
//! bounded channel, so consumer work never runs inline on the socket's read
//! loop.

use crate::error::TransportError;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::{
    net::TcpStream,
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

pub use tokio_tungstenite::tungstenite::protocol::Message;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Capacity of the inbound handoff channel.
const EVENT_CHANNEL_CAPACITY: usize = 128;

/// Connection lifecycle notifications, delivered in arrival order.
#[derive(Debug)]
pub enum TransportEvent {
    /// The handshake completed. Delivered exactly once, before any frame.
    Opened,
    /// One inbound data frame, as received.
    Frame(Message),
    /// A read-side failure. Zero or more of these, always before `Closed`.
    Error(String),
    /// The connection is gone. Delivered exactly once; nothing follows it.
    Closed,
}

/// Builds the interaction URL. The device identity rides in a base64 JSON
/// blob and the token in a second query parameter; the server rejects the
/// upgrade if either is missing.
pub fn interaction_url(ws_url: &str, device_id: &str, token: &str) -> String {
    let auth_blob = serde_json::json!({ "auth_id": device_id }).to_string();
    format!("{ws_url}?param={}&token={token}", BASE64.encode(auth_blob))
}

/// Handle to one open connection. Writes go through [`Session::send`];
/// inbound traffic arrives on the receiver returned by [`connect`].
pub struct Session {
    sink: Arc<Mutex<WsSink>>,
    open: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

/// Opens the persistent duplex connection.
///
/// On success the returned receiver yields `Opened` first, then every inbound
/// frame in arrival order, then exactly one `Closed`.
pub async fn connect(
    url: &str,
) -> Result<(Session, mpsc::Receiver<TransportEvent>), TransportError> {
    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(TransportError::HandshakeFailed)?;
    let (sink, stream) = ws_stream.split();
    let open = Arc::new(AtomicBool::new(true));
    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let reader = tokio::spawn(read_loop(stream, event_tx, open.clone()));
    let session = Session {
        sink: Arc::new(Mutex::new(sink)),
        open,
        reader,
    };
    Ok((session, event_rx))
}

async fn read_loop(
    mut stream: WsStream,
    events: mpsc::Sender<TransportEvent>,
    open: Arc<AtomicBool>,
) {
    if events.send(TransportEvent::Opened).await.is_err() {
        open.store(false, Ordering::SeqCst);
        return;
    }
    while let Some(next) = stream.next().await {
        match next {
            Ok(Message::Close(frame)) => {
                debug!(?frame, "server closed the connection");
                break;
            }
            // tungstenite answers pings during reads; neither side of the
            // pair carries data.
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(frame) => {
                if events.send(TransportEvent::Frame(frame)).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = events.send(TransportEvent::Error(e.to_string())).await;
                break;
            }
        }
    }
    open.store(false, Ordering::SeqCst);
    let _ = events.send(TransportEvent::Closed).await;
}

impl Session {
    /// Whether the connection is currently open. Visible across tasks.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Writes one frame. Multi-frame exchanges are sequenced by the caller;
    /// frames from a single caller leave in call order.
    pub async fn send(&self, frame: Message) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        let mut sink = self.sink.lock().await;
        sink.send(frame).await.map_err(TransportError::SendFailed)
    }

    /// Starts a graceful shutdown. Idempotent; later `send` calls fail with
    /// [`TransportError::NotOpen`].
    pub async fn close(&self) {
        if !self.open.swap(false, Ordering::SeqCst) {
            return;
        }
        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.send(Message::Close(None)).await {
            debug!(error = %e, "close frame was not delivered");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_embeds_auth_blob_and_token() {
        let url = interaction_url("wss://api.listenai.com/v1/interaction", "dev-1", "tok-9");
        assert_eq!(
            url,
            "wss://api.listenai.com/v1/interaction?param=eyJhdXRoX2lkIjoiZGV2LTEifQ==&token=tok-9"
        );
    }
}
