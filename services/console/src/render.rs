//! Terminal rendering for classified server events.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use listenai_realtime::protocol::InboundEvent;
use tracing::debug;

/// Writes one event to the console. Partial recognition results and
/// unclassified envelopes only show up in debug logs.
pub fn render_event(event: &InboundEvent) {
    match event {
        InboundEvent::Recognition { text, is_final } => {
            if *is_final {
                println!("[heard] {text}");
            } else {
                debug!(%text, "partial recognition");
            }
        }
        InboundEvent::Understanding { answer } => {
            println!("[answer] {answer}");
        }
        InboundEvent::Synthesis { audio } => match BASE64.decode(audio) {
            Ok(bytes) => println!("[audio] {} bytes of synthesized speech", bytes.len()),
            Err(_) => println!("[audio] chunk received ({} chars, not base64)", audio.len()),
        },
        InboundEvent::Unclassified(envelope) => {
            debug!(%envelope, "unclassified server event");
        }
    }
}
