//! Wire payloads and the typed decode boundary for Driftline
//!
//! Server payloads are dynamically shaped JSON. Nothing past this crate sees
//! an untyped value: every inbound payload goes through a decode step that
//! either yields a fully-typed [`IncomingMessage`] / [`LiveEvent`] or a
//! [`DecodeError`]. Recoverable shape problems (a malformed attachment blob)
//! degrade to a safe default with a logged warning instead of failing the
//! whole message.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod history;
mod live;
mod wire;

pub use error::DecodeError;
pub use history::{DEFAULT_PAGE_LIMIT, FetchKind, HistoryRequest, HistoryResult, RequestToken};
pub use live::{LiveEvent, decode_event};
pub use wire::{IncomingMessage, OutgoingMessage, decode_message};
