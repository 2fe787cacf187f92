//! Transport behavior against a loopback WebSocket server.

use std::future::Future;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use listenai_realtime::{
    TransportError, TurnConfig,
    protocol::encode_turn,
    transport::{self, Message, TransportEvent},
};
use tokio::{net::TcpStream, sync::mpsc, time::timeout};
use tokio_tungstenite::WebSocketStream;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Accepts exactly one connection and hands it to `handler`.
async fn spawn_ws_server<F, Fut>(handler: F) -> String
where
    F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        handler(ws).await;
    });
    format!("ws://{addr}")
}

async fn next_event(events: &mut mpsc::Receiver<TransportEvent>) -> TransportEvent {
    timeout(TEST_TIMEOUT, events.recv())
        .await
        .expect("timed out waiting for a transport event")
        .expect("event channel closed early")
}

#[tokio::test]
async fn opened_fires_once_then_frames_in_arrival_order() {
    let url = spawn_ws_server(|mut ws| async move {
        for i in 0..5 {
            ws.send(Message::Text(format!("evt-{i}"))).await.unwrap();
        }
        ws.close(None).await.unwrap();
    })
    .await;

    let (_session, mut events) = transport::connect(&url).await.unwrap();

    assert!(matches!(next_event(&mut events).await, TransportEvent::Opened));
    for i in 0..5 {
        match next_event(&mut events).await {
            TransportEvent::Frame(Message::Text(text)) => assert_eq!(text, format!("evt-{i}")),
            other => panic!("expected frame {i}, got {other:?}"),
        }
    }
    assert!(matches!(next_event(&mut events).await, TransportEvent::Closed));
    // Nothing follows Closed.
    assert!(timeout(TEST_TIMEOUT, events.recv()).await.unwrap().is_none());
}

#[tokio::test]
async fn turn_frames_stay_ordered_while_the_server_streams() {
    // The server pushes five events while reading one full turn; both
    // directions must keep their own order.
    let (order_tx, mut order_rx) = mpsc::channel::<String>(8);
    let url = spawn_ws_server(move |ws| async move {
        let (mut tx, mut rx) = ws.split();
        let push = async {
            for i in 0..5 {
                tx.send(Message::Text(format!("evt-{i}"))).await.unwrap();
            }
        };
        let pull = async {
            let mut seen = 0;
            while seen < 3 {
                match rx.next().await.unwrap().unwrap() {
                    Message::Text(text) => {
                        let label = if text.contains("\"start\"") { "start" } else { "end" };
                        order_tx.send(label.to_string()).await.unwrap();
                        seen += 1;
                    }
                    Message::Binary(bytes) => {
                        order_tx
                            .send(format!("payload:{}", String::from_utf8_lossy(&bytes)))
                            .await
                            .unwrap();
                        seen += 1;
                    }
                    _ => {}
                }
            }
        };
        tokio::join!(push, pull);
    })
    .await;

    let (session, mut events) = transport::connect(&url).await.unwrap();
    assert!(matches!(next_event(&mut events).await, TransportEvent::Opened));

    let frames = encode_turn("hello", "dev-1", &TurnConfig::default()).unwrap();
    for frame in frames {
        session.send(frame).await.unwrap();
    }

    // All five inbound events arrive exactly once, in arrival order.
    for i in 0..5 {
        match next_event(&mut events).await {
            TransportEvent::Frame(Message::Text(text)) => assert_eq!(text, format!("evt-{i}")),
            other => panic!("expected frame {i}, got {other:?}"),
        }
    }

    // The server saw the turn with no interleaving.
    let mut outbound = Vec::new();
    for _ in 0..3 {
        outbound.push(timeout(TEST_TIMEOUT, order_rx.recv()).await.unwrap().unwrap());
    }
    assert_eq!(outbound, ["start", "payload:hello", "end"]);
}

#[tokio::test]
async fn send_after_close_is_not_open() {
    let url = spawn_ws_server(|mut ws| async move {
        // Sit on the connection until the client closes it.
        while let Some(Ok(frame)) = ws.next().await {
            if matches!(frame, Message::Close(_)) {
                break;
            }
        }
    })
    .await;

    let (session, mut events) = transport::connect(&url).await.unwrap();
    assert!(matches!(next_event(&mut events).await, TransportEvent::Opened));

    session.close().await;
    assert!(!session.is_open());

    let err = session.send(Message::Text("late".to_string())).await.unwrap_err();
    assert!(matches!(err, TransportError::NotOpen));

    // close() is idempotent.
    session.close().await;

    // The close handshake completes and Closed fires exactly once.
    loop {
        match next_event(&mut events).await {
            TransportEvent::Closed => break,
            TransportEvent::Error(_) | TransportEvent::Frame(_) => {}
            TransportEvent::Opened => panic!("Opened fired twice"),
        }
    }
    assert!(timeout(TEST_TIMEOUT, events.recv()).await.unwrap().is_none());
}

#[tokio::test]
async fn handshake_against_a_dead_port_fails() {
    let err = transport::connect("ws://127.0.0.1:1").await.err().unwrap();
    assert!(matches!(err, TransportError::HandshakeFailed(_)));
}
