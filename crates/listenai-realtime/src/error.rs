//! Failure taxonomy, one enum per domain so transport failures and protocol
//! failures stay distinguishable.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Failures of the device-token exchange. All of these are fatal to the
/// session; no connection is attempted afterwards.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The endpoint could not be reached or did not answer in time.
    #[error("auth endpoint unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),
    /// The endpoint answered with a non-success status.
    #[error("auth rejected (status {status}): {body}")]
    Rejected { status: u16, body: String },
    /// A success response without an extractable token.
    #[error("auth response carried no token")]
    MissingToken,
}

/// Failures of the persistent connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The WebSocket upgrade was refused or broke off. Fatal.
    #[error("websocket handshake failed: {0}")]
    HandshakeFailed(#[source] tungstenite::Error),
    /// A write was attempted outside the open window of the connection.
    #[error("connection is not open")]
    NotOpen,
    /// A frame could not be written. Aborts the in-progress turn only.
    #[error("frame send failed: {0}")]
    SendFailed(#[source] tungstenite::Error),
}

/// Failures while interpreting inbound messages. Always recovered locally by
/// the consumer: log and keep reading.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed protocol JSON: {0}")]
    Unparseable(#[from] serde_json::Error),
    #[error("unexpected message shape: {0}")]
    UnexpectedShape(String),
}
