//! Message timeline store for Driftline
//!
//! The reconciliation core of the chat client: keeps a client-local ordered
//! message window consistent with a server that delivers messages through two
//! independent channels (paged history fetch and live push), supporting
//! optimistic insertion, temporary-id substitution, duplicate suppression,
//! cursor-based backward pagination, and edit/delete propagation.
//!
//! # Components
//!
//! - [`TimelineStore`]: the state machine owning the materialized window
//! - [`StoreAction`]: side-effects requested from the runtime
//! - [`TimelineDelta`]: incremental render instructions
//! - [`day_markers`]: derived date separators

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod delta;
mod markers;
mod pending;
mod store;

pub use action::StoreAction;
pub use delta::{ReconcileResult, TimelineDelta};
pub use markers::{DayMarker, day_markers};
pub use store::TimelineStore;
