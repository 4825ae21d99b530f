//! Message payload shapes and decoding.
//!
//! [`decode_message`] is the only way a server message enters the typed
//! world. Attachment metadata is the historically unreliable field: some
//! backends send it as a JSON object, some as a JSON-encoded string, some as
//! garbage. An unusable attachment decodes to `None` with a warning rather
//! than rejecting the message.

use chrono::{DateTime, Utc};
use driftline_core::{
    Attachment, Author, ConversationId, Lifecycle, Message, MessageId, ReplySnapshot, ServerId,
    time,
};
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Raw message payload as the server sends it.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireMessage {
    id: u64,
    conversation_id: u64,
    sender_id: u64,
    sender_name: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    attachment: Option<serde_json::Value>,
    #[serde(default)]
    reply_to: Option<WireReply>,
    #[serde(default)]
    forwarded_from: Option<String>,
    timestamp_ms: i64,
    #[serde(default)]
    edited_at_ms: Option<i64>,
    #[serde(default)]
    correlation: Option<u64>,
}

/// Reply snapshot as embedded in a message payload.
#[derive(Debug, Clone, Deserialize)]
struct WireReply {
    sender_name: String,
    #[serde(default)]
    excerpt: String,
}

/// Attachment metadata in its well-formed shape.
#[derive(Debug, Clone, Deserialize)]
struct WireAttachment {
    file_name: String,
    #[serde(default)]
    size_bytes: u64,
    #[serde(default = "default_mime")]
    mime_type: String,
}

fn default_mime() -> String {
    "application/octet-stream".to_string()
}

/// A fully-typed server-confirmed message, ready for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Server-assigned permanent id.
    pub id: ServerId,
    /// Conversation the message belongs to.
    pub conversation: ConversationId,
    /// Author reference.
    pub author: Author,
    /// Text content.
    pub body: String,
    /// Attachment metadata, if present and well-formed.
    pub attachment: Option<Attachment>,
    /// Reply snapshot, if present.
    pub reply_to: Option<ReplySnapshot>,
    /// Forwarded-from label, if present.
    pub forwarded_from: Option<String>,
    /// Server creation time.
    pub timestamp: DateTime<Utc>,
    /// Edit time, if the body was modified after creation.
    pub edited_at: Option<DateTime<Utc>>,
    /// Send correlation token echoed back by the server, if any.
    pub correlation: Option<u64>,
}

impl IncomingMessage {
    /// Convert into a confirmed timeline message.
    pub fn into_message(self) -> Message {
        Message {
            id: MessageId::Server(self.id),
            conversation: self.conversation,
            author: self.author,
            body: self.body,
            attachment: self.attachment,
            reply_to: self.reply_to,
            forwarded_from: self.forwarded_from,
            timestamp: self.timestamp,
            edited_at: self.edited_at,
            lifecycle: Lifecycle::Confirmed,
        }
    }
}

/// Outgoing send payload dispatched over the live channel.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Target conversation.
    pub conversation_id: u64,
    /// Text content.
    pub body: String,
    /// Server id of the message being replied to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<u64>,
    /// Correlation token the server echoes on the confirmed message.
    pub correlation: u64,
}

/// Decode a raw message payload into an [`IncomingMessage`].
///
/// `own_user_id` tags authorship so the reconciliation heuristics can
/// distinguish the local user's echoes from other members' messages.
pub fn decode_message(payload: &str, own_user_id: u64) -> Result<IncomingMessage, DecodeError> {
    let wire: WireMessage = serde_json::from_str(payload)?;
    decode_wire(wire, own_user_id)
}

pub(crate) fn decode_wire(
    wire: WireMessage,
    own_user_id: u64,
) -> Result<IncomingMessage, DecodeError> {
    let timestamp = time::from_unix_millis(wire.timestamp_ms)
        .ok_or(DecodeError::Timestamp { millis: wire.timestamp_ms })?;

    let edited_at = match wire.edited_at_ms {
        Some(ms) => {
            Some(time::from_unix_millis(ms).ok_or(DecodeError::Timestamp { millis: ms })?)
        },
        None => None,
    };

    Ok(IncomingMessage {
        id: ServerId(wire.id),
        conversation: ConversationId(wire.conversation_id),
        author: Author {
            id: wire.sender_id,
            display_name: wire.sender_name,
            is_own: wire.sender_id == own_user_id,
        },
        body: wire.body.unwrap_or_default(),
        attachment: wire.attachment.and_then(|value| decode_attachment(wire.id, &value)),
        reply_to: wire
            .reply_to
            .map(|r| ReplySnapshot { author_name: r.sender_name, excerpt: r.excerpt }),
        forwarded_from: wire.forwarded_from,
        timestamp,
        edited_at,
        correlation: wire.correlation,
    })
}

/// Decode attachment metadata, tolerating the JSON-embedded-string shape.
///
/// Returns `None` for anything unusable; the message itself stays valid.
fn decode_attachment(message_id: u64, value: &serde_json::Value) -> Option<Attachment> {
    let parsed: Result<WireAttachment, _> = match value {
        serde_json::Value::String(embedded) => serde_json::from_str(embedded),
        other => serde_json::from_value(other.clone()),
    };

    match parsed {
        Ok(wire) => Some(Attachment {
            file_name: wire.file_name,
            size_bytes: wire.size_bytes,
            mime_type: wire.mime_type,
        }),
        Err(err) => {
            tracing::warn!(message_id, %err, "dropping malformed attachment metadata");
            None
        },
    }
}
