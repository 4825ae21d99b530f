//! Application state machine.
//!
//! [`App`] composes the timeline store, the viewport controller, the search
//! index, and the ambient conversation state (connection, typing indicators,
//! the active highlight) behind a single `handle(event) -> actions` surface.
//! It owns no I/O; the runtime executes the returned [`AppAction`]s.

use std::time::Duration;

use driftline_core::{Environment, MessageId};
use driftline_proto::LiveEvent;
use driftline_timeline::{ReconcileResult, StoreAction, TimelineStore};

use crate::{
    action::{AppAction, ConnectionState, ScrollCommand},
    event::AppEvent,
    search::SearchIndex,
    viewport::{ViewportAction, ViewportController},
};

/// A typing indicator lapses after this long without a refresh (45 seconds).
const TYPING_TIMEOUT: Duration = Duration::from_secs(45);

#[derive(Debug, Clone)]
struct TypingEntry<I> {
    user_id: u64,
    display_name: String,
    refreshed_at: I,
}

/// Chat client state machine for one window.
#[derive(Debug, Clone)]
pub struct App<E: Environment> {
    env: E,
    own_user_id: u64,
    connection: ConnectionState,
    store: TimelineStore<E>,
    viewport: ViewportController<E>,
    search: SearchIndex,
    typing: Vec<TypingEntry<E::Instant>>,
    highlighted: Option<MessageId>,
}

impl<E: Environment> App<E> {
    /// Create an application with no active conversation.
    pub fn new(env: E, own_user_id: u64, own_display_name: impl Into<String>) -> Self {
        Self {
            env: env.clone(),
            own_user_id,
            connection: ConnectionState::default(),
            store: TimelineStore::new(env.clone(), own_user_id, own_display_name),
            viewport: ViewportController::new(env),
            search: SearchIndex::new(),
            typing: Vec::new(),
            highlighted: None,
        }
    }

    /// The timeline store.
    pub fn store(&self) -> &TimelineStore<E> {
        &self.store
    }

    /// Live-channel connection state.
    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    /// The search index.
    pub fn search(&self) -> &SearchIndex {
        &self.search
    }

    /// Display names currently shown as typing, oldest first.
    pub fn typing_names(&self) -> Vec<String> {
        self.typing.iter().map(|entry| entry.display_name.clone()).collect()
    }

    /// Process one event.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Live(live) => self.handle_live(live),
            AppEvent::HistoryFetched { token, result } => {
                let was_paginating = self.store.is_paginating();
                let store_actions = self.store.handle_history(token, result);
                let prepended = store_actions
                    .iter()
                    .any(|a| matches!(a, StoreAction::Prepended { .. }));

                let actions = self.map_store(store_actions);
                // The viewport lock outlives a prepend until the driver
                // reports the new content height; everything else releases
                // it here.
                if was_paginating && !self.store.is_paginating() && !prepended {
                    self.viewport.pagination_finished();
                }
                self.search.refresh(self.store.messages());
                actions
            },
            AppEvent::SendFailed { correlation } => {
                let store_actions = self.store.mark_send_failed(correlation);
                self.map_store(store_actions)
            },
            AppEvent::ConversationOpened(conversation) => {
                let mut actions = {
                    let store_actions = self.store.reset_for_conversation(conversation);
                    self.map_store(store_actions)
                };
                let viewport_actions = self.viewport.reset();
                actions.extend(self.map_viewport(viewport_actions));

                self.search.clear();
                if let Some(prev) = self.highlighted.take() {
                    actions.push(AppAction::ClearHighlight(prev));
                }
                self.typing.clear();
                actions.push(AppAction::SetTyping(vec![]));

                actions.push(AppAction::JoinConversation(conversation));
                let store_actions = self.store.load_initial();
                actions.extend(self.map_store(store_actions));
                actions
            },
            AppEvent::Composed { body, reply_to } => {
                let store_actions = self.store.send_message(&body, reply_to);
                let dispatched = store_actions
                    .iter()
                    .any(|a| matches!(a, StoreAction::Dispatch(_)));

                let mut actions = self.map_store(store_actions);
                if dispatched {
                    let viewport_actions = self.viewport.new_message(true);
                    actions.extend(self.map_viewport(viewport_actions));
                    self.search.refresh(self.store.messages());
                }
                actions
            },
            AppEvent::Scrolled(metrics) => {
                let viewport_actions = self.viewport.user_scrolled(metrics);
                self.map_viewport(viewport_actions)
            },
            AppEvent::PullToRefresh => {
                let viewport_actions = self.viewport.pull_to_refresh();
                self.map_viewport(viewport_actions)
            },
            AppEvent::JumpToBottom => {
                let viewport_actions = self.viewport.jump_to_bottom();
                self.map_viewport(viewport_actions)
            },
            AppEvent::PrependRendered { new_scroll_height } => {
                let viewport_actions = self.viewport.prepend_applied(new_scroll_height);
                self.map_viewport(viewport_actions)
            },
            AppEvent::ScrollSettled => {
                self.viewport.programmatic_scroll_finished();
                vec![]
            },
            AppEvent::SearchRequested(query) => {
                self.search.rebuild(&query, self.store.messages());
                self.select_hit()
            },
            AppEvent::SearchNext => {
                let _ = self.search.next();
                self.select_hit()
            },
            AppEvent::SearchPrev => {
                let _ = self.search.prev();
                self.select_hit()
            },
            AppEvent::SearchClosed => {
                self.search.clear();
                match self.highlighted.take() {
                    Some(prev) => vec![AppAction::ClearHighlight(prev)],
                    None => vec![],
                }
            },
            AppEvent::Tick => self.handle_tick(),
            AppEvent::Quit => vec![AppAction::Quit],
        }
    }

    fn handle_live(&mut self, live: LiveEvent) -> Vec<AppAction> {
        match live {
            LiveEvent::Connected => {
                self.connection = ConnectionState::Connected;
                let mut actions = vec![AppAction::SetConnection(ConnectionState::Connected)];
                // Messages that arrived during the outage are on the server
                // only; re-subscribe and reload from scratch.
                if let Some(conversation) = self.store.conversation() {
                    actions.push(AppAction::JoinConversation(conversation));
                    let store_actions = self.store.load_initial();
                    actions.extend(self.map_store(store_actions));
                }
                actions
            },
            LiveEvent::Disconnected => {
                self.connection = ConnectionState::Disconnected;
                vec![
                    AppAction::SetConnection(ConnectionState::Disconnected),
                    AppAction::Notify {
                        text: "Connection lost. Reconnecting\u{2026}".to_string(),
                        is_error: true,
                    },
                ]
            },
            LiveEvent::Message(incoming) => {
                let own = incoming.author.is_own;
                let author_id = incoming.author.id;
                let (result, store_actions) = self.store.reconcile_incoming(incoming);

                let mut actions = self.map_store(store_actions);
                if result == ReconcileResult::Inserted {
                    let viewport_actions = self.viewport.new_message(own);
                    actions.extend(self.map_viewport(viewport_actions));
                }
                // A delivered message supersedes its author's typing state.
                actions.extend(self.drop_typing_for(author_id));
                self.search.refresh(self.store.messages());
                actions
            },
            LiveEvent::MessageEdited { id, body, edited_at } => {
                let store_actions = self.store.apply_edit(MessageId::Server(id), body, edited_at);
                let actions = self.map_store(store_actions);
                self.search.refresh(self.store.messages());
                actions
            },
            LiveEvent::MessageDeleted { id } => {
                let store_actions = self.store.apply_delete(MessageId::Server(id));
                let mut actions = self.map_store(store_actions);
                if self.highlighted == Some(MessageId::Server(id))
                    && let Some(prev) = self.highlighted.take()
                {
                    actions.push(AppAction::ClearHighlight(prev));
                }
                self.search.refresh(self.store.messages());
                actions
            },
            LiveEvent::Typing { conversation, user_id, display_name } => {
                if Some(conversation) != self.store.conversation() || user_id == self.own_user_id {
                    return vec![];
                }

                let now = self.env.now();
                match self.typing.iter_mut().find(|entry| entry.user_id == user_id) {
                    Some(entry) => entry.refreshed_at = now,
                    None => self.typing.push(TypingEntry {
                        user_id,
                        display_name,
                        refreshed_at: now,
                    }),
                }
                vec![AppAction::SetTyping(self.typing_names())]
            },
        }
    }

    fn handle_tick(&mut self) -> Vec<AppAction> {
        let store_actions = self.store.handle_tick();
        let mut actions = self.map_store(store_actions);
        self.viewport.handle_tick();

        let now = self.env.now();
        let before = self.typing.len();
        self.typing.retain(|entry| now - entry.refreshed_at <= TYPING_TIMEOUT);
        if self.typing.len() != before {
            actions.push(AppAction::SetTyping(self.typing_names()));
        }

        actions
    }

    fn drop_typing_for(&mut self, user_id: u64) -> Vec<AppAction> {
        let before = self.typing.len();
        self.typing.retain(|entry| entry.user_id != user_id);
        if self.typing.len() == before {
            return vec![];
        }
        vec![AppAction::SetTyping(self.typing_names())]
    }

    /// Highlight the hit under the search cursor and scroll it into view.
    fn select_hit(&mut self) -> Vec<AppAction> {
        let target = self.search.current();
        if target == self.highlighted {
            return if target.is_none() && self.search.is_active() {
                vec![AppAction::Notify {
                    text: format!("No matches for \"{}\"", self.search.query()),
                    is_error: false,
                }]
            } else {
                vec![]
            };
        }

        let mut actions = Vec::new();
        if let Some(prev) = self.highlighted.take() {
            actions.push(AppAction::ClearHighlight(prev));
        }
        if let Some(id) = target {
            self.highlighted = Some(id);
            // The jump must not read as user scrolling.
            self.viewport.programmatic_scroll_started();
            actions.push(AppAction::Highlight(id));
            actions.push(AppAction::Scroll(ScrollCommand::ToMessage { id }));
        }
        actions
    }

    fn map_store(&mut self, actions: Vec<StoreAction>) -> Vec<AppAction> {
        actions
            .into_iter()
            .map(|action| match action {
                StoreAction::Apply(delta) => AppAction::Apply(delta),
                StoreAction::FetchHistory { token, request } => {
                    AppAction::FetchHistory { token, request }
                },
                StoreAction::Dispatch(message) => AppAction::DispatchSend(message),
                StoreAction::ShowLoading => AppAction::SetLoading(true),
                StoreAction::HideLoading => AppAction::SetLoading(false),
                StoreAction::Notify { text, is_error } => AppAction::Notify { text, is_error },
                StoreAction::ShowEmptyMarker => AppAction::ShowEmptyMarker,
                StoreAction::ShowStartMarker => AppAction::ShowStartMarker,
                StoreAction::Prepended { .. } => AppAction::MeasureScrollHeight,
                StoreAction::RefreshMarkers => AppAction::RefreshMarkers,
            })
            .collect()
    }

    fn map_viewport(&mut self, actions: Vec<ViewportAction>) -> Vec<AppAction> {
        let mut out = Vec::new();
        for action in actions {
            match action {
                ViewportAction::ScrollToBottom { smooth } => {
                    out.push(AppAction::Scroll(ScrollCommand::ToBottom { smooth }));
                },
                ViewportAction::SetScrollTop(offset) => {
                    out.push(AppAction::Scroll(ScrollCommand::ToOffset(offset)));
                },
                ViewportAction::ShowJumpAffordance => out.push(AppAction::SetJumpAffordance(true)),
                ViewportAction::HideJumpAffordance => {
                    out.push(AppAction::SetJumpAffordance(false));
                },
                ViewportAction::SetUnreadBadge(count) => {
                    out.push(AppAction::SetUnreadBadge(count));
                },
                ViewportAction::RequestOlderPage => {
                    let store_actions = self.store.load_older();
                    let started = store_actions
                        .iter()
                        .any(|a| matches!(a, StoreAction::FetchHistory { .. }));
                    if started {
                        self.viewport.pagination_started();
                    }
                    out.extend(self.map_store(store_actions));
                },
            }
        }
        out
    }
}
