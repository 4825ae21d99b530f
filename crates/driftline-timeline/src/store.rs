//! Message timeline store.
//!
//! Single source of truth for "what messages are currently shown, in what
//! order, with what identity". The store owns the ordered, de-duplicated
//! materialized window, the pagination cursor and its in-flight lock, and the
//! optimistic-send reconciliation state machine.
//!
//! The store is a pure state machine in the sans-IO style: operations return
//! [`StoreAction`]s for the runtime to execute, and asynchronous completions
//! re-enter through [`TimelineStore::handle_history`]. History fetches carry
//! a [`RequestToken`] capturing the conversation generation; completions for
//! a switched-away conversation are discarded without touching state.
//!
//! # Invariants
//!
//! - At most one message per id in the window.
//! - The window is sorted non-decreasing by timestamp.
//! - No in-flight flag outlives the watchdog bound.

use std::{collections::HashSet, time::Duration};

use chrono::{DateTime, Utc};
use driftline_core::{
    Author, ConversationId, Environment, Generation, Lifecycle, LocalId, Message, MessageId,
    ReplySnapshot, ServerId,
};
use driftline_proto::{
    DEFAULT_PAGE_LIMIT, FetchKind, HistoryRequest, HistoryResult, IncomingMessage,
    OutgoingMessage, RequestToken,
};

use crate::{
    action::StoreAction,
    delta::{ReconcileResult, TimelineDelta},
    markers::{self, DayMarker},
    pending::{PendingLedger, PendingSend},
};

/// Watchdog bound on an in-flight history fetch flag (3 seconds).
///
/// Force-clearing trades possible duplicate processing of a slow response for
/// a UI that is never permanently stuck.
const FETCH_FAILSAFE: Duration = Duration::from_secs(3);

/// Recency window for the own-message exact-text fallback match (5 seconds).
const HEURISTIC_WINDOW: Duration = Duration::from_secs(5);

/// Bounded wait before an unacknowledged send is marked failed (30 seconds).
const PENDING_ACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Ordered, de-duplicated materialized window of one conversation.
///
/// Constructed per session; never a process-wide static. All mutation of the
/// window goes through this type.
#[derive(Debug, Clone)]
pub struct TimelineStore<E: Environment> {
    /// Environment for time and randomness.
    env: E,
    /// Local user id, for authorship of optimistic entries.
    own_user_id: u64,
    /// Local user display name.
    own_display_name: String,
    /// Active conversation. `None` before the first open.
    conversation: Option<ConversationId>,
    /// Bumped on every conversation switch; stale completions are discarded
    /// by comparison.
    generation: Generation,
    /// The materialized window, sorted non-decreasing by timestamp.
    ordered: Vec<Message>,
    /// Pagination cursor: earliest server id fetched so far.
    oldest_loaded: Option<ServerId>,
    /// False once a pagination fetch returned nothing new.
    has_more_older: bool,
    /// Older-page fetch in flight. At most one at a time.
    is_paginating: bool,
    /// When the older-page fetch started, for the watchdog.
    paginating_since: Option<E::Instant>,
    /// Initial fetch in flight.
    is_loading_initial: bool,
    /// When the initial fetch started, for the watchdog.
    initial_since: Option<E::Instant>,
    /// The start-of-conversation marker has been surfaced this session.
    start_marker_shown: bool,
    /// In-flight optimistic sends.
    pending: PendingLedger<E::Instant>,
}

impl<E: Environment> TimelineStore<E> {
    /// Create an empty store for the given local user.
    pub fn new(env: E, own_user_id: u64, own_display_name: impl Into<String>) -> Self {
        Self {
            env,
            own_user_id,
            own_display_name: own_display_name.into(),
            conversation: None,
            generation: Generation::default(),
            ordered: Vec::new(),
            oldest_loaded: None,
            has_more_older: true,
            is_paginating: false,
            paginating_since: None,
            is_loading_initial: false,
            initial_since: None,
            start_marker_shown: false,
            pending: PendingLedger::new(),
        }
    }

    /// The materialized window, sorted ascending by timestamp.
    pub fn messages(&self) -> &[Message] {
        &self.ordered
    }

    /// Active conversation. `None` before the first open.
    pub fn conversation(&self) -> Option<ConversationId> {
        self.conversation
    }

    /// Pagination cursor: earliest server id fetched so far.
    pub fn oldest_loaded(&self) -> Option<ServerId> {
        self.oldest_loaded
    }

    /// True until a pagination fetch returns nothing new.
    pub fn has_more_older(&self) -> bool {
        self.has_more_older
    }

    /// True while an older-page fetch is in flight.
    pub fn is_paginating(&self) -> bool {
        self.is_paginating
    }

    /// True while the initial fetch is in flight.
    pub fn is_loading_initial(&self) -> bool {
        self.is_loading_initial
    }

    /// Date separators derived from the current window.
    pub fn day_markers(&self) -> Vec<DayMarker> {
        markers::day_markers(&self.ordered)
    }

    /// Switch to a conversation, clearing the window.
    ///
    /// Idempotent and safe while a fetch is in flight: the generation bump
    /// makes the eventual completion a stale no-op. Unconfirmed optimistic
    /// sends for the previous conversation are discarded, not carried over.
    pub fn reset_for_conversation(&mut self, conversation: ConversationId) -> Vec<StoreAction> {
        self.generation.bump();
        self.conversation = Some(conversation);
        self.ordered.clear();
        self.oldest_loaded = None;
        self.has_more_older = true;
        self.is_paginating = false;
        self.paginating_since = None;
        self.is_loading_initial = false;
        self.initial_since = None;
        self.start_marker_shown = false;
        self.pending.clear();

        vec![StoreAction::Apply(TimelineDelta::Reset), StoreAction::RefreshMarkers]
    }

    /// Fetch the most recent page, replacing the window wholesale on
    /// completion.
    pub fn load_initial(&mut self) -> Vec<StoreAction> {
        let Some(conversation) = self.conversation else {
            tracing::debug!("load_initial without an active conversation");
            return vec![];
        };

        self.is_loading_initial = true;
        self.initial_since = Some(self.env.now());

        vec![
            StoreAction::ShowLoading,
            StoreAction::FetchHistory {
                token: RequestToken { generation: self.generation, kind: FetchKind::Initial },
                request: HistoryRequest { conversation, before: None, limit: DEFAULT_PAGE_LIMIT },
            },
        ]
    }

    /// Fetch the page strictly older than the current cursor.
    ///
    /// Dropped silently (logged, not surfaced) while another fetch is in
    /// flight, once the start of the conversation has been reached, or with
    /// no active conversation. The user retries by scrolling again.
    pub fn load_older(&mut self) -> Vec<StoreAction> {
        let Some(conversation) = self.conversation else {
            tracing::debug!("load_older without an active conversation");
            return vec![];
        };
        if self.is_loading_initial {
            // With the cursor unset an older fetch would re-request the
            // newest page and read its zero new ids as end of history.
            tracing::debug!("load_older dropped: initial load in flight");
            return vec![];
        }
        if self.is_paginating {
            tracing::debug!("load_older dropped: fetch already in flight");
            return vec![];
        }
        if !self.has_more_older {
            tracing::debug!("load_older dropped: start of conversation reached");
            return vec![];
        }

        self.is_paginating = true;
        self.paginating_since = Some(self.env.now());

        vec![
            StoreAction::ShowLoading,
            StoreAction::FetchHistory {
                token: RequestToken { generation: self.generation, kind: FetchKind::Older },
                request: HistoryRequest {
                    conversation,
                    before: self.oldest_loaded,
                    limit: DEFAULT_PAGE_LIMIT,
                },
            },
        ]
    }

    /// Complete a history fetch.
    ///
    /// A completion whose generation no longer matches targets a conversation
    /// that has been switched away; it is discarded without touching state.
    /// Failures leave the window exactly as it was before the fetch, never
    /// partially merged, and always release the in-flight flag.
    pub fn handle_history(&mut self, token: RequestToken, result: HistoryResult) -> Vec<StoreAction> {
        if token.generation != self.generation {
            tracing::debug!(?token, "discarding stale history completion");
            return vec![];
        }

        match token.kind {
            FetchKind::Initial => self.complete_initial(result),
            FetchKind::Older => self.complete_older(result),
        }
    }

    fn complete_initial(&mut self, result: HistoryResult) -> Vec<StoreAction> {
        self.is_loading_initial = false;
        self.initial_since = None;

        let mut actions = Vec::new();
        match result {
            Ok(page) => {
                let full_page = page.len() >= DEFAULT_PAGE_LIMIT;
                self.ordered = dedup_sorted(page);
                self.oldest_loaded = self.ordered.iter().filter_map(|m| m.id.as_server()).min();
                self.has_more_older = full_page;

                actions.push(StoreAction::Apply(TimelineDelta::Reset));
                actions.push(StoreAction::RefreshMarkers);
                if self.ordered.is_empty() {
                    self.has_more_older = false;
                    actions.push(StoreAction::ShowEmptyMarker);
                }
            },
            Err(err) => {
                actions.push(StoreAction::Notify {
                    text: format!("Failed to load messages: {err}"),
                    is_error: true,
                });
            },
        }

        actions.push(StoreAction::HideLoading);
        actions
    }

    fn complete_older(&mut self, result: HistoryResult) -> Vec<StoreAction> {
        self.is_paginating = false;
        self.paginating_since = None;

        let mut actions = Vec::new();
        match result {
            Ok(page) => {
                let days_before = markers::day_set(&self.ordered);
                let fresh = dedup_sorted(self.without_known_ids(page));
                let merged = fresh.len();

                for incoming in fresh {
                    let id = incoming.id;
                    let index =
                        self.ordered.partition_point(|m| m.timestamp <= incoming.timestamp);
                    self.ordered.insert(index, incoming);
                    self.note_server_id(id.as_server());
                    actions.push(StoreAction::Apply(TimelineDelta::Inserted { index, id }));
                }

                if merged == 0 {
                    self.has_more_older = false;
                    if !self.start_marker_shown {
                        self.start_marker_shown = true;
                        actions.push(StoreAction::ShowStartMarker);
                    }
                } else {
                    actions.push(StoreAction::Prepended { count: merged });
                }

                if markers::day_set(&self.ordered) != days_before {
                    actions.push(StoreAction::RefreshMarkers);
                }
            },
            Err(err) => {
                // has_more_older stays untouched so scrolling again retries.
                actions.push(StoreAction::Notify {
                    text: format!("Failed to load older messages: {err}"),
                    is_error: true,
                });
            },
        }

        actions.push(StoreAction::HideLoading);
        actions
    }

    /// Optimistically insert an own message and dispatch the send.
    ///
    /// The visual insertion is synchronous and unconditional once the body
    /// passes validation; network latency never delays it. The entry stays
    /// `Pending` until [`reconcile_incoming`](Self::reconcile_incoming)
    /// confirms it or the bounded wait marks it `Failed`.
    pub fn send_message(&mut self, body: &str, reply_to: Option<ServerId>) -> Vec<StoreAction> {
        let Some(conversation) = self.conversation else {
            tracing::debug!("send_message without an active conversation");
            return vec![];
        };
        let body = body.trim();
        if body.is_empty() {
            tracing::debug!("ignoring empty send");
            return vec![];
        }

        let local = LocalId(self.env.random_u64());
        let correlation = local.0;
        let now_utc = self.env.now_utc();
        // Tail insertion is unconditional; clamp against the window tail so a
        // skewed local clock cannot break the ordering invariant.
        let timestamp = match self.ordered.last() {
            Some(last) if last.timestamp > now_utc => last.timestamp,
            _ => now_utc,
        };

        let reply_snapshot = reply_to.and_then(|id| self.snapshot_of(id));
        let days_before = markers::day_set(&self.ordered);

        self.ordered.push(Message {
            id: MessageId::Local(local),
            conversation,
            author: Author {
                id: self.own_user_id,
                display_name: self.own_display_name.clone(),
                is_own: true,
            },
            body: body.to_string(),
            attachment: None,
            reply_to: reply_snapshot,
            forwarded_from: None,
            timestamp,
            edited_at: None,
            lifecycle: Lifecycle::Pending,
        });
        let index = self.ordered.len() - 1;

        self.pending.insert(PendingSend {
            local,
            correlation,
            body: body.to_string(),
            created_at: self.env.now(),
        });

        let mut actions = vec![
            StoreAction::Apply(TimelineDelta::Inserted { index, id: MessageId::Local(local) }),
            StoreAction::Dispatch(OutgoingMessage {
                conversation_id: conversation.0,
                body: body.to_string(),
                reply_to: reply_to.map(|id| id.0),
                correlation,
            }),
        ];
        if markers::day_set(&self.ordered) != days_before {
            actions.push(StoreAction::RefreshMarkers);
        }
        actions
    }

    /// Record a dispatch failure for an in-flight send.
    ///
    /// The optimistic entry transitions to `Failed` and stays visible with a
    /// retry affordance; a failed send is never silently dropped.
    pub fn mark_send_failed(&mut self, correlation: u64) -> Vec<StoreAction> {
        let Some(entry) = self.pending.take_by_correlation(correlation) else {
            tracing::debug!(correlation, "send failure for unknown correlation");
            return vec![];
        };

        let mut actions = Vec::new();
        if let Some(index) = self.index_of(MessageId::Local(entry.local)) {
            self.ordered[index].lifecycle = Lifecycle::Failed;
            actions.push(StoreAction::Apply(TimelineDelta::Updated {
                index,
                id: MessageId::Local(entry.local),
            }));
        }
        actions.push(StoreAction::Notify {
            text: "Failed to send message".to_string(),
            is_error: true,
        });
        actions
    }

    /// Reconcile one live-channel message into the window.
    ///
    /// Decision order is load-bearing:
    ///
    /// 1. Correlation token matches a pending send: replace the optimistic
    ///    entry in place (same position, permanent id, `Confirmed`).
    /// 2. Already present by server id: no-op. Protects against
    ///    at-least-once delivery and echo across both channels.
    /// 3. Own message with an exact pending body match inside the recency
    ///    window and no token: same in-place replacement. Fallback for
    ///    transports that do not round-trip the token.
    /// 4. Otherwise: insert as a new confirmed message in timestamp order.
    ///
    /// Checking 1 before 4 is what keeps every optimistic send from
    /// double-rendering.
    pub fn reconcile_incoming(
        &mut self,
        incoming: IncomingMessage,
    ) -> (ReconcileResult, Vec<StoreAction>) {
        let Some(active) = self.conversation else {
            tracing::debug!("live message with no active conversation");
            return (ReconcileResult::Ignored, vec![]);
        };
        if incoming.conversation != active {
            tracing::debug!(conversation = %incoming.conversation, "live message for inactive conversation");
            return (ReconcileResult::Ignored, vec![]);
        }

        if let Some(correlation) = incoming.correlation
            && let Some(entry) = self.pending.take_by_correlation(correlation)
        {
            return self.confirm_pending(&entry, incoming);
        }

        if self.contains_server(incoming.id) {
            tracing::debug!(id = %incoming.id, "duplicate live message suppressed");
            return (ReconcileResult::Duplicate, vec![]);
        }

        if incoming.author.is_own
            && incoming.correlation.is_none()
            && let Some(entry) =
                self.pending.take_text_match(&incoming.body, self.env.now(), HEURISTIC_WINDOW)
        {
            return self.confirm_pending(&entry, incoming);
        }

        self.insert_confirmed(incoming)
    }

    /// Apply a server-propagated edit.
    ///
    /// Rejected (no-op, logged) for temporary ids: a message cannot be edited
    /// before it exists server-side. Neighbors and scroll position are
    /// untouched.
    pub fn apply_edit(
        &mut self,
        id: MessageId,
        body: String,
        edited_at: DateTime<Utc>,
    ) -> Vec<StoreAction> {
        if id.is_local() {
            tracing::warn!(%id, "edit rejected for unconfirmed message");
            return vec![];
        }
        let Some(index) = self.index_of(id) else {
            tracing::debug!(%id, "edit for message outside the window");
            return vec![];
        };

        let message = &mut self.ordered[index];
        message.body = body;
        message.edited_at = Some(edited_at);

        vec![StoreAction::Apply(TimelineDelta::Updated { index, id })]
    }

    /// Apply a server-propagated delete.
    ///
    /// Rejected (no-op, logged) for temporary ids. Removing the last message
    /// of a calendar day also retires that day's separator.
    pub fn apply_delete(&mut self, id: MessageId) -> Vec<StoreAction> {
        if id.is_local() {
            tracing::warn!(%id, "delete rejected for unconfirmed message");
            return vec![];
        }
        let Some(index) = self.index_of(id) else {
            tracing::debug!(%id, "delete for message outside the window");
            return vec![];
        };

        let days_before = markers::day_set(&self.ordered);
        self.ordered.remove(index);

        let mut actions = vec![StoreAction::Apply(TimelineDelta::Removed { index, id })];
        if markers::day_set(&self.ordered) != days_before {
            actions.push(StoreAction::RefreshMarkers);
        }
        actions
    }

    /// Periodic sweep: watchdog on in-flight flags and pending-send expiry.
    ///
    /// No error path may leave a flag permanently set; this sweep is the
    /// bound that guarantees it.
    pub fn handle_tick(&mut self) -> Vec<StoreAction> {
        let now = self.env.now();
        let mut actions = Vec::new();

        if let Some(since) = self.paginating_since
            && now - since > FETCH_FAILSAFE
        {
            tracing::warn!("pagination watchdog fired; force-releasing in-flight flag");
            self.is_paginating = false;
            self.paginating_since = None;
            actions.push(StoreAction::HideLoading);
        }

        if let Some(since) = self.initial_since
            && now - since > FETCH_FAILSAFE
        {
            tracing::warn!("initial-load watchdog fired; force-releasing in-flight flag");
            self.is_loading_initial = false;
            self.initial_since = None;
            actions.push(StoreAction::HideLoading);
        }

        for entry in self.pending.drain_expired(now, PENDING_ACK_TIMEOUT) {
            tracing::warn!(local = %entry.local, "send unacknowledged past bound; marking failed");
            if let Some(index) = self.index_of(MessageId::Local(entry.local)) {
                self.ordered[index].lifecycle = Lifecycle::Failed;
                actions.push(StoreAction::Apply(TimelineDelta::Updated {
                    index,
                    id: MessageId::Local(entry.local),
                }));
            }
        }

        actions
    }

    fn confirm_pending(
        &mut self,
        entry: &PendingSend<E::Instant>,
        incoming: IncomingMessage,
    ) -> (ReconcileResult, Vec<StoreAction>) {
        let Some(index) = self.index_of(MessageId::Local(entry.local)) else {
            // Ledger entry without a window entry: the optimistic message is
            // gone, so materialize the server copy instead.
            tracing::debug!(local = %entry.local, "pending entry missing from window");
            return self.insert_confirmed(incoming);
        };

        let server_id = incoming.id;
        let message = &mut self.ordered[index];
        let old_id = message.id;
        // Position and timestamp keep their optimistic values; the ordering
        // at this index is already materialized.
        message.id = MessageId::Server(server_id);
        message.lifecycle = Lifecycle::Confirmed;
        message.attachment = incoming.attachment;
        message.edited_at = incoming.edited_at;
        self.note_server_id(Some(server_id));

        (
            ReconcileResult::Replaced,
            vec![StoreAction::Apply(TimelineDelta::Replaced {
                index,
                old_id,
                new_id: MessageId::Server(server_id),
            })],
        )
    }

    fn insert_confirmed(
        &mut self,
        incoming: IncomingMessage,
    ) -> (ReconcileResult, Vec<StoreAction>) {
        let days_before = markers::day_set(&self.ordered);
        let server_id = incoming.id;
        let message = incoming.into_message();
        let index = self.ordered.partition_point(|m| m.timestamp <= message.timestamp);
        self.ordered.insert(index, message);
        self.note_server_id(Some(server_id));

        let mut actions = vec![StoreAction::Apply(TimelineDelta::Inserted {
            index,
            id: MessageId::Server(server_id),
        })];
        if markers::day_set(&self.ordered) != days_before {
            actions.push(StoreAction::RefreshMarkers);
        }
        (ReconcileResult::Inserted, actions)
    }

    fn snapshot_of(&self, id: ServerId) -> Option<ReplySnapshot> {
        self.index_of(MessageId::Server(id)).map(|index| {
            let original = &self.ordered[index];
            ReplySnapshot {
                author_name: original.author.display_name.clone(),
                excerpt: original.body.clone(),
            }
        })
    }

    fn index_of(&self, id: MessageId) -> Option<usize> {
        self.ordered.iter().position(|m| m.id == id)
    }

    fn contains_server(&self, id: ServerId) -> bool {
        self.ordered.iter().any(|m| m.id == MessageId::Server(id))
    }

    fn note_server_id(&mut self, id: Option<ServerId>) {
        if let Some(id) = id {
            self.oldest_loaded = Some(match self.oldest_loaded {
                Some(current) if current < id => current,
                _ => id,
            });
        }
    }

    /// Drop page entries whose server id is already materialized anywhere in
    /// the window, not just at the edge.
    fn without_known_ids(&self, page: Vec<IncomingMessage>) -> Vec<IncomingMessage> {
        page.into_iter().filter(|m| !self.contains_server(m.id)).collect()
    }
}

/// Sort a page ascending by timestamp (ties by id) and drop in-page
/// duplicates.
fn dedup_sorted(page: Vec<IncomingMessage>) -> Vec<Message> {
    let mut seen = HashSet::new();
    let mut messages: Vec<Message> = page
        .into_iter()
        .filter(|m| seen.insert(m.id))
        .map(IncomingMessage::into_message)
        .collect();
    messages.sort_by_key(|m| (m.timestamp, m.id.as_server()));
    messages
}
