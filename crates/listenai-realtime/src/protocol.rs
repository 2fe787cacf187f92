//! Wire protocol for the interaction stream: three-frame outbound turns and
//! subtype classification of inbound event envelopes.

use crate::error::ProtocolError;
use serde::Serialize;
use serde_json::Value;
use tokio_tungstenite::tungstenite::protocol::Message;

/// Synthesis voice settings carried in the start frame of every turn.
#[derive(Clone, Debug, Serialize)]
pub struct TtsProperties {
    pub vcn: String,
    pub speed: u32,
    pub volume: u32,
}

impl Default for TtsProperties {
    fn default() -> Self {
        Self {
            vcn: "x4_lingxiaoqi_oral".to_string(),
            speed: 50,
            volume: 50,
        }
    }
}

/// Per-turn parameters. The defaults describe a text-in, nlu+tts-out
/// exchange.
#[derive(Clone, Debug)]
pub struct TurnConfig {
    pub data_type: String,
    pub features: Vec<String>,
    pub tts: TtsProperties,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            data_type: "text".to_string(),
            features: vec!["nlu".to_string(), "tts".to_string()],
            tts: TtsProperties::default(),
        }
    }
}

#[derive(Serialize)]
struct NluProperties<'a> {
    sn: &'a str,
}

#[derive(Serialize)]
struct StartParams<'a> {
    data_type: &'a str,
    features: &'a [String],
    tts_properties: &'a TtsProperties,
    nlu_properties: NluProperties<'a>,
}

#[derive(Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum ControlFrame<'a> {
    Start { params: StartParams<'a> },
    End,
}

/// Encodes one user turn as its strictly ordered frame sequence: start
/// control frame, raw UTF-8 payload as a binary frame, end control frame.
/// The server's behavior is undefined if the order is violated, so the caller
/// must write the frames exactly as returned.
pub fn encode_turn(
    text: &str,
    device_id: &str,
    config: &TurnConfig,
) -> Result<[Message; 3], ProtocolError> {
    let start = ControlFrame::Start {
        params: StartParams {
            data_type: &config.data_type,
            features: &config.features,
            tts_properties: &config.tts,
            nlu_properties: NluProperties { sn: device_id },
        },
    };
    let start_json = serde_json::to_string(&start)?;
    let end_json = serde_json::to_string(&ControlFrame::End)?;
    Ok([
        Message::Text(start_json),
        Message::Binary(text.as_bytes().to_vec()),
        Message::Text(end_json),
    ])
}

/// One classified server event. Constructed per message, never retained.
#[derive(Clone, Debug, PartialEq)]
pub enum InboundEvent {
    /// Speech recognition update; `is_final` mirrors the wire `is_last` flag.
    Recognition { text: String, is_final: bool },
    /// Language-understanding result carrying the assistant's answer.
    Understanding { answer: String },
    /// One base64-encoded synthesis audio chunk.
    Synthesis { audio: String },
    /// Anything with an unrecognized subtype, kept whole for observability.
    Unclassified(Value),
}

/// Classifies one raw server message.
///
/// Returns `Ok(None)` for messages that carry nothing actionable: no `data`
/// field, `data` that is not an object (the server sometimes sends a bare
/// string there), or a known subtype missing its payload. Errors are for the
/// caller to log; they must never stop the consumer.
pub fn decode_event(raw: &str) -> Result<Option<InboundEvent>, ProtocolError> {
    let envelope: Value = serde_json::from_str(raw)?;
    if !envelope.is_object() {
        return Err(ProtocolError::UnexpectedShape(format!(
            "expected a JSON object, got {envelope}"
        )));
    }
    let Some(data) = envelope.get("data") else {
        return Ok(None);
    };
    let Some(fields) = data.as_object() else {
        // Bare-string `data` is a known server quirk; nothing to classify.
        return Ok(None);
    };

    let sub = fields.get("sub").and_then(Value::as_str);
    match sub {
        Some("iat") => {
            let text = fields
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let is_final = fields
                .get("is_last")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            Ok(Some(InboundEvent::Recognition {
                text: text.to_string(),
                is_final,
            }))
        }
        Some("nlu") => Ok(fields
            .get("intent")
            .and_then(Value::as_object)
            .and_then(|intent| intent.get("answer"))
            .and_then(Value::as_object)
            .and_then(|answer| answer.get("text"))
            .and_then(Value::as_str)
            .map(|text| InboundEvent::Understanding {
                answer: text.to_string(),
            })),
        Some("tts") => Ok(fields
            .get("content")
            .and_then(Value::as_str)
            .map(|chunk| InboundEvent::Synthesis {
                audio: chunk.to_string(),
            })),
        _ => Ok(Some(InboundEvent::Unclassified(envelope))),
    }
}
