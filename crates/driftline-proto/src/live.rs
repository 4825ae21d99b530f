//! Live channel events.
//!
//! The live transport delivers named events with JSON payloads.
//! [`decode_event`] maps each (name, payload) pair to a typed [`LiveEvent`].

use chrono::{DateTime, Utc};
use driftline_core::{ConversationId, ServerId, time};
use serde::Deserialize;

use crate::{
    error::DecodeError,
    wire::{self, IncomingMessage},
};

/// Typed event from the live channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// Channel established (initial connect or reconnect).
    Connected,

    /// Channel lost; the adapter retries in the background.
    Disconnected,

    /// New or echoed message.
    Message(IncomingMessage),

    /// A message body was edited.
    MessageEdited {
        /// Permanent id of the edited message.
        id: ServerId,
        /// New body text.
        body: String,
        /// When the edit happened.
        edited_at: DateTime<Utc>,
    },

    /// A message was deleted.
    MessageDeleted {
        /// Permanent id of the deleted message.
        id: ServerId,
    },

    /// A member is typing in a conversation.
    Typing {
        /// Conversation the indicator belongs to.
        conversation: ConversationId,
        /// Typing user's id.
        user_id: u64,
        /// Typing user's display name.
        display_name: String,
    },
}

#[derive(Debug, Deserialize)]
struct WireEdit {
    id: u64,
    body: String,
    edited_at_ms: i64,
}

#[derive(Debug, Deserialize)]
struct WireDelete {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct WireTyping {
    conversation_id: u64,
    user_id: u64,
    sender_name: String,
}

/// Decode a named live event.
///
/// `own_user_id` flows into message decoding for authorship tagging.
pub fn decode_event(
    name: &str,
    payload: &str,
    own_user_id: u64,
) -> Result<LiveEvent, DecodeError> {
    match name {
        "message" => Ok(LiveEvent::Message(wire::decode_message(payload, own_user_id)?)),
        "message_edited" => {
            let edit: WireEdit = serde_json::from_str(payload)?;
            let edited_at = time::from_unix_millis(edit.edited_at_ms)
                .ok_or(DecodeError::Timestamp { millis: edit.edited_at_ms })?;
            Ok(LiveEvent::MessageEdited { id: ServerId(edit.id), body: edit.body, edited_at })
        },
        "message_deleted" => {
            let del: WireDelete = serde_json::from_str(payload)?;
            Ok(LiveEvent::MessageDeleted { id: ServerId(del.id) })
        },
        "typing" => {
            let typing: WireTyping = serde_json::from_str(payload)?;
            Ok(LiveEvent::Typing {
                conversation: ConversationId(typing.conversation_id),
                user_id: typing.user_id,
                display_name: typing.sender_name,
            })
        },
        other => Err(DecodeError::UnknownEvent(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_edit_event() {
        let payload = "{\"id\": 7, \"body\": \"fixed\", \"edited_at_ms\": 1700000000000}";
        let event = decode_event("message_edited", payload, 1).ok();
        assert!(matches!(
            event,
            Some(LiveEvent::MessageEdited { id: ServerId(7), ref body, .. }) if body == "fixed"
        ));
    }

    #[test]
    fn decodes_delete_event() {
        let event = decode_event("message_deleted", "{\"id\": 3}", 1).ok();
        assert_eq!(event, Some(LiveEvent::MessageDeleted { id: ServerId(3) }));
    }

    #[test]
    fn decodes_typing_event() {
        let payload = "{\"conversation_id\": 2, \"user_id\": 5, \"sender_name\": \"bob\"}";
        let event = decode_event("typing", payload, 1).ok();
        assert!(matches!(
            event,
            Some(LiveEvent::Typing { conversation: ConversationId(2), user_id: 5, .. })
        ));
    }

    #[test]
    fn unknown_event_name_is_an_error() {
        let err = decode_event("presence_blip", "{}", 1).err();
        assert_eq!(err, Some(DecodeError::UnknownEvent("presence_blip".to_string())));
    }
}
