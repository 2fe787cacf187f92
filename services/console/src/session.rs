//! Drives one interactive session end to end: authenticate, connect, then
//! run the input producer and event consumer until quit or disconnect.

use crate::{config::Config, render};
use anyhow::{Context, Result};
use listenai_realtime::{
    auth::Authenticator,
    protocol::{self, TurnConfig},
    transport::{self, Message, Session, TransportEvent},
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::{debug, info, warn};

/// Lifecycle of one console run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    AwaitingAuth,
    AwaitingConnect,
    Interacting,
    Draining,
    Terminated,
}

/// Authenticates, connects, and runs the interaction until it terminates.
///
/// Authentication and handshake failures are fatal; the caller reports them
/// and exits.
pub async fn run(config: &Config) -> Result<()> {
    let mut phase = Phase::AwaitingAuth;
    debug!(?phase, "session starting");

    let identity = config.device_identity();
    info!(device_id = %identity.device_id, "requesting access token");
    let token = Authenticator::new(config.auth_url.clone())
        .authenticate(&identity)
        .await
        .context("device authentication failed")?;

    phase = Phase::AwaitingConnect;
    debug!(?phase, "access token acquired");
    let url = transport::interaction_url(
        &config.interaction_url,
        &identity.device_id,
        token.as_str(),
    );
    let (session, events) = transport::connect(&url)
        .await
        .context("interaction handshake failed")?;

    let (input_tx, input_rx) = mpsc::channel(1);
    tokio::spawn(read_input(input_tx));

    let phase = interact(
        &session,
        events,
        input_rx,
        &config.turn_config(),
        &identity.device_id,
    )
    .await?;
    debug!(?phase, "session finished");
    Ok(())
}

/// Producer task: forwards stdin lines to the session loop. Exits when the
/// consumer goes away or stdin reaches EOF.
async fn read_input(lines_tx: mpsc::Sender<String>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if lines_tx.send(line).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                break;
            }
        }
    }
}

/// Consumer loop: dispatches transport events and, once the connection is
/// open, accepts user turns. Returns the terminal phase.
///
/// One turn is fully written before the next input line is taken, so turns
/// never interleave on the wire.
pub async fn interact(
    session: &Session,
    mut events: mpsc::Receiver<TransportEvent>,
    mut input: mpsc::Receiver<String>,
    turn: &TurnConfig,
    device_id: &str,
) -> Result<Phase> {
    let mut phase = Phase::AwaitingConnect;
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(TransportEvent::Opened) => {
                    phase = Phase::Interacting;
                    info!("session open");
                    println!("Type a message and press enter to send it (q to quit).");
                }
                Some(TransportEvent::Frame(Message::Text(text))) => {
                    match protocol::decode_event(&text) {
                        Ok(Some(event)) => render::render_event(&event),
                        Ok(None) => debug!(raw = %text, "server message carried no event"),
                        Err(e) => warn!(error = %e, raw = %text, "skipping undecodable server message"),
                    }
                }
                Some(TransportEvent::Frame(frame)) => {
                    debug!(?frame, "ignoring non-text frame");
                }
                Some(TransportEvent::Error(e)) => {
                    warn!(error = %e, "transport error");
                }
                Some(TransportEvent::Closed) | None => {
                    if phase != Phase::Draining {
                        info!("connection closed by server");
                        phase = Phase::Draining;
                    }
                    break;
                }
            },
            line = input.recv(), if phase == Phase::Interacting => match line {
                Some(line) if line.trim().eq_ignore_ascii_case("q") => {
                    phase = Phase::Draining;
                    info!("quit requested, closing session");
                    session.close().await;
                }
                Some(line) => {
                    let text = line.trim();
                    if !text.is_empty() {
                        send_turn(session, text, device_id, turn).await;
                    }
                }
                None => {
                    // stdin is gone; behave like a quit.
                    phase = Phase::Draining;
                    session.close().await;
                }
            },
        }
    }
    phase = Phase::Terminated;
    debug!(?phase, "interaction loop done");
    Ok(phase)
}

/// Writes the three frames of one turn in strict order. A send failure
/// aborts only this turn; the session keeps accepting input while the
/// connection stays open.
async fn send_turn(session: &Session, text: &str, device_id: &str, turn: &TurnConfig) {
    let frames = match protocol::encode_turn(text, device_id, turn) {
        Ok(frames) => frames,
        Err(e) => {
            warn!(error = %e, "could not encode turn");
            return;
        }
    };
    debug!(%text, "sending turn");
    for frame in frames {
        if let Err(e) = session.send(frame).await {
            warn!(error = %e, "turn aborted mid-send");
            return;
        }
    }
}
