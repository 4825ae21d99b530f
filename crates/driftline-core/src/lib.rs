//! Core domain model for Driftline
//!
//! Defines the message entity, conversation identifiers, timestamp display
//! formatting, the transport error taxonomy, and the [`Environment`]
//! abstraction that decouples the state machines from wall-clock time and
//! system randomness.
//!
//! Everything in this crate is pure data and pure functions; no I/O.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod conversation;
mod env;
mod error;
mod message;
pub mod time;

pub use conversation::{ConversationId, Generation};
pub use env::Environment;
pub use error::TransportError;
pub use message::{
    Attachment, Author, Lifecycle, LocalId, Message, MessageId, ReplySnapshot, ServerId,
};
