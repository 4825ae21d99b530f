//! Message entity and identity types.
//!
//! A message is identified either by a client-generated [`LocalId`] (assigned
//! at optimistic insertion, before the server has acknowledged the send) or by
//! a server-assigned [`ServerId`]. The materialized timeline holds at most one
//! message per id at any time; reconciliation swaps a local id for its
//! permanent counterpart in place.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::conversation::ConversationId;

/// Client-generated temporary message identifier.
///
/// Assigned when a message is optimistically inserted, before the server has
/// acknowledged the send. Never leaves the client except as a correlation
/// token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u64);

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local-{:016x}", self.0)
    }
}

/// Server-assigned permanent message identifier.
///
/// Also serves as the pagination boundary token: history requests ask for
/// entries strictly older than a given `ServerId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerId(pub u64);

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// Message identity: temporary (client) or permanent (server).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    /// Client-generated id pending server acknowledgment.
    Local(LocalId),
    /// Server-assigned permanent id.
    Server(ServerId),
}

impl MessageId {
    /// True for client-generated temporary ids.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    /// Permanent id, or `None` while still temporary.
    pub fn as_server(&self) -> Option<ServerId> {
        match self {
            Self::Server(id) => Some(*id),
            Self::Local(_) => None,
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(id) => id.fmt(f),
            Self::Server(id) => id.fmt(f),
        }
    }
}

/// Send lifecycle of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Optimistically inserted, awaiting server acknowledgment.
    Pending,
    /// Server-acknowledged.
    Confirmed,
    /// Send attempt errored or timed out; stays visible with a retry
    /// affordance, never silently dropped.
    Failed,
}

/// Message author reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    /// Stable user id.
    pub id: u64,
    /// Display name at the time the message was materialized.
    pub display_name: String,
    /// True if authored by the local user.
    pub is_own: bool,
}

/// File attachment metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Original file name.
    pub file_name: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// MIME type.
    pub mime_type: String,
}

/// Snapshot of a replied-to message.
///
/// A copy, not a live reference: the original may have been edited or deleted
/// since the reply was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplySnapshot {
    /// Author display name of the original message.
    pub author_name: String,
    /// Body excerpt of the original message.
    pub excerpt: String,
}

/// A message in the materialized timeline window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Identity, temporary or permanent.
    pub id: MessageId,
    /// Conversation this message belongs to.
    pub conversation: ConversationId,
    /// Author reference.
    pub author: Author,
    /// Text content. May be empty for pure-file messages.
    pub body: String,
    /// Optional file attachment.
    pub attachment: Option<Attachment>,
    /// Optional reply snapshot.
    pub reply_to: Option<ReplySnapshot>,
    /// Display name of the original author when forwarded.
    pub forwarded_from: Option<String>,
    /// Creation time; authoritative ordering key.
    pub timestamp: DateTime<Utc>,
    /// Set when the body was modified after creation.
    pub edited_at: Option<DateTime<Utc>>,
    /// Send lifecycle.
    pub lifecycle: Lifecycle,
}

impl Message {
    /// True while the message awaits server acknowledgment.
    pub fn is_pending(&self) -> bool {
        self.lifecycle == Lifecycle::Pending
    }
}
