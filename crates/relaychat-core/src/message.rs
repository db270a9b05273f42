//! Chat log entries and the relay wire format.
//!
//! The relay speaks UTF-8 text frames. Chat payloads are JSON objects of the
//! shape `{"type":"chat","user":string,"text":string,"ts":number}`; anything
//! else (other discriminators, missing fields, non-JSON text, binary noise) is
//! opaque server text. [`decode_inbound`] makes that split explicit as an
//! [`Inbound`] sum type so decoding failures never travel further.

use serde::{Deserialize, Serialize};

/// Author attached to payloads that arrive without a recognizable shape.
pub const SERVER_AUTHOR: &str = "Server";

/// Discriminator value of chat payloads.
const CHAT_TYPE: &str = "chat";

/// Log entry category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Synthetic status announcement (e.g. join notice).
    System,
    /// Message authored by a user or relayed from the server.
    Chat,
}

/// Which way a message travelled relative to this client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Received from the relay.
    Inbound,
    /// Composed locally and sent to the relay.
    Outbound,
    /// Produced locally, never on the wire.
    #[default]
    #[serde(rename = "none")]
    Local,
}

/// One entry of the conversation log. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Entry category.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Display name of the author. `None` for system messages.
    #[serde(rename = "user", default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Message body.
    pub text: String,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "ts")]
    pub timestamp_millis: i64,
    /// Travel direction.
    #[serde(default)]
    pub direction: Direction,
}

impl Message {
    /// Synthetic status announcement.
    pub fn system(text: impl Into<String>, timestamp_millis: i64) -> Self {
        Self {
            kind: MessageKind::System,
            author: None,
            text: text.into(),
            timestamp_millis,
            direction: Direction::Local,
        }
    }

    /// Chat message composed by the local user.
    pub fn outbound(
        author: impl Into<String>,
        text: impl Into<String>,
        timestamp_millis: i64,
    ) -> Self {
        Self {
            kind: MessageKind::Chat,
            author: Some(author.into()),
            text: text.into(),
            timestamp_millis,
            direction: Direction::Outbound,
        }
    }

    /// Chat message relayed from another participant.
    pub fn inbound(author: impl Into<String>, text: impl Into<String>, timestamp_millis: i64) -> Self {
        Self {
            kind: MessageKind::Chat,
            author: Some(author.into()),
            text: text.into(),
            timestamp_millis,
            direction: Direction::Inbound,
        }
    }

    /// Unrecognized payload shown verbatim as a server message.
    pub fn server_text(raw: impl Into<String>, timestamp_millis: i64) -> Self {
        Self::inbound(SERVER_AUTHOR, raw, timestamp_millis)
    }
}

/// Result of decoding one inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Payload matched the chat shape.
    StructuredChat(Message),
    /// Anything else, carried as raw text.
    PlainText(String),
}

/// Chat payload as it appears on the wire (decode side).
#[derive(Deserialize)]
struct WireChat {
    #[serde(rename = "type")]
    kind: String,
    user: String,
    text: String,
    ts: serde_json::Number,
}

/// Chat payload as it appears on the wire (encode side).
#[derive(Serialize)]
struct WireChatRef<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    user: &'a str,
    text: &'a str,
    ts: i64,
}

/// Decode a relay payload, falling back to plain text on any mismatch.
///
/// Strict about shape: the payload must be a JSON object whose `type` is
/// `"chat"` and which carries string `user`, string `text` and numeric `ts`.
/// Fractional timestamps are truncated toward zero.
pub fn decode_inbound(raw: &str) -> Inbound {
    let Ok(value @ serde_json::Value::Object(_)) = serde_json::from_str::<serde_json::Value>(raw) else {
        return Inbound::PlainText(raw.to_owned());
    };

    let Ok(wire) = serde_json::from_value::<WireChat>(value) else {
        return Inbound::PlainText(raw.to_owned());
    };

    if wire.kind != CHAT_TYPE {
        return Inbound::PlainText(raw.to_owned());
    }

    let timestamp = wire.ts.as_i64().or_else(|| wire.ts.as_f64().map(|ts| ts as i64));
    match timestamp {
        Some(ts) => Inbound::StructuredChat(Message::inbound(wire.user, wire.text, ts)),
        None => Inbound::PlainText(raw.to_owned()),
    }
}

/// Encode a chat message in the relay's wire shape.
///
/// Messages without an author are encoded with an empty `user`.
pub fn encode_chat(message: &Message) -> Result<String, serde_json::Error> {
    serde_json::to_string(&WireChatRef {
        kind: CHAT_TYPE,
        user: message.author.as_deref().unwrap_or_default(),
        text: &message.text,
        ts: message.timestamp_millis,
    })
}
