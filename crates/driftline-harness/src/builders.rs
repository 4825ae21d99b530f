//! Fixture builders for incoming messages.

use driftline_core::{Author, ConversationId, ServerId, time};
use driftline_proto::IncomingMessage;

/// User id the fixtures treat as the local user.
const OWN_USER_ID: u64 = 1;

/// Builder for [`IncomingMessage`] fixtures.
///
/// Defaults: conversation 1, a foreign author named "peer", empty body, a
/// timestamp derived from the id so ascending ids are ascending in time.
#[derive(Debug, Clone)]
pub struct IncomingBuilder {
    message: IncomingMessage,
}

impl IncomingBuilder {
    /// Start a fixture with the given server id.
    pub fn new(id: u64) -> Self {
        let timestamp = time::from_unix_millis(1_704_067_200_000 + (id as i64) * 1_000)
            .unwrap_or_default();
        Self {
            message: IncomingMessage {
                id: ServerId(id),
                conversation: ConversationId(1),
                author: Author { id: 2, display_name: "peer".to_string(), is_own: false },
                body: String::new(),
                attachment: None,
                reply_to: None,
                forwarded_from: None,
                timestamp,
                edited_at: None,
                correlation: None,
            },
        }
    }

    /// Author the message as the local user (id 1, "me").
    pub fn own(mut self) -> Self {
        self.message.author = Author { id: OWN_USER_ID, display_name: "me".to_string(), is_own: true };
        self
    }

    /// Set the body text.
    pub fn body(mut self, body: &str) -> Self {
        self.message.body = body.to_string();
        self
    }

    /// Set the conversation.
    pub fn conversation(mut self, id: u64) -> Self {
        self.message.conversation = ConversationId(id);
        self
    }

    /// Set the timestamp from milliseconds since the Unix epoch.
    pub fn at_ms(mut self, millis: i64) -> Self {
        self.message.timestamp = time::from_unix_millis(millis).unwrap_or_default();
        self
    }

    /// Attach a send correlation token.
    pub fn correlation(mut self, token: u64) -> Self {
        self.message.correlation = Some(token);
        self
    }

    /// Finish the fixture.
    pub fn build(self) -> IncomingMessage {
        self.message
    }
}
