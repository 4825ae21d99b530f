//! Scenario tests for the timeline store.
//!
//! Each test drives the store the way the runtime would: operations return
//! actions, `FetchHistory` actions are served from a scripted history source,
//! and the resulting completions are fed back in.

use std::{collections::VecDeque, time::Duration};

use driftline_core::{
    ConversationId, Environment, Lifecycle, MessageId, ServerId, TransportError,
};
use driftline_harness::{IncomingBuilder, ScriptedHistory, SimEnv};
use driftline_timeline::{ReconcileResult, StoreAction, TimelineDelta, TimelineStore};

const OWN_USER: u64 = 1;

fn new_store(env: &SimEnv) -> TimelineStore<SimEnv> {
    TimelineStore::new(env.clone(), OWN_USER, "me")
}

/// Execute actions, serving history fetches from the script and feeding
/// completions back into the store. Returns every action seen.
fn drive(
    store: &mut TimelineStore<SimEnv>,
    history: &mut ScriptedHistory,
    actions: Vec<StoreAction>,
) -> Vec<StoreAction> {
    let mut seen = Vec::new();
    let mut queue: VecDeque<StoreAction> = actions.into();
    while let Some(action) = queue.pop_front() {
        if let StoreAction::FetchHistory { token, request } = &action {
            let result = history.fetch(*request);
            queue.extend(store.handle_history(*token, result));
        }
        seen.push(action);
    }
    seen
}

fn open(
    store: &mut TimelineStore<SimEnv>,
    history: &mut ScriptedHistory,
    conversation: u64,
) -> Vec<StoreAction> {
    let mut actions = store.reset_for_conversation(ConversationId(conversation));
    actions.extend(store.load_initial());
    drive(store, history, actions)
}

fn page(ids: std::ops::Range<u64>) -> Vec<driftline_proto::IncomingMessage> {
    ids.map(|id| IncomingBuilder::new(id).body("history").build()).collect()
}

fn dispatched_correlation(actions: &[StoreAction]) -> Option<u64> {
    actions.iter().find_map(|a| match a {
        StoreAction::Dispatch(out) => Some(out.correlation),
        _ => None,
    })
}

#[test]
fn initial_load_replaces_window_and_sets_cursor() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(page(10..13));

    open(&mut store, &mut history, 1);

    assert_eq!(store.messages().len(), 3);
    assert_eq!(store.oldest_loaded(), Some(ServerId(10)));
    // A short page means the whole history is already materialized.
    assert!(!store.has_more_older());
}

#[test]
fn empty_initial_load_shows_empty_marker() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(Vec::new());

    let actions = open(&mut store, &mut history, 1);

    assert!(store.messages().is_empty());
    assert!(!store.has_more_older());
    assert!(actions.contains(&StoreAction::ShowEmptyMarker));
    assert!(actions.contains(&StoreAction::HideLoading));
}

#[test]
fn load_older_merges_above_and_advances_cursor() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(page(100..150));
    history.push_page(page(50..100));

    open(&mut store, &mut history, 1);
    assert!(store.has_more_older());

    let older = store.load_older();
    let actions = drive(&mut store, &mut history, older);

    assert_eq!(store.messages().len(), 100);
    assert_eq!(store.oldest_loaded(), Some(ServerId(50)));
    assert!(actions.contains(&StoreAction::Prepended { count: 50 }));
    // The older request was bounded by the previous cursor.
    assert_eq!(history.requests()[1].before, Some(ServerId(100)));
}

#[test]
fn pagination_terminates_on_empty_page() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(page(100..150));
    history.push_page(Vec::new());

    open(&mut store, &mut history, 1);
    let older = store.load_older();
    let actions = drive(&mut store, &mut history, older);

    assert!(!store.has_more_older());
    let markers = actions.iter().filter(|a| **a == StoreAction::ShowStartMarker).count();
    assert_eq!(markers, 1);

    // Terminal: a further trigger never reaches the adapter.
    let fetches = history.fetch_count();
    assert!(store.load_older().is_empty());
    assert_eq!(history.fetch_count(), fetches);
}

#[test]
fn load_older_dropped_while_in_flight() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(page(100..150));

    open(&mut store, &mut history, 1);

    let first = store.load_older();
    assert!(!first.is_empty());
    // Second trigger while locked is dropped, not queued.
    assert!(store.load_older().is_empty());
}

#[test]
fn load_older_dropped_while_initial_load_in_flight() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(page(100..150));

    let mut actions = store.reset_for_conversation(ConversationId(1));
    actions.extend(store.load_initial());

    // A top-edge trigger before the initial page lands has no cursor to
    // bound it; issuing it would re-fetch the newest page and falsely
    // terminate pagination. It must be dropped instead.
    assert!(store.load_older().is_empty());

    let opened = drive(&mut store, &mut history, actions);
    assert!(!opened.contains(&StoreAction::ShowStartMarker));
    assert!(store.has_more_older());
    assert_eq!(history.fetch_count(), 1);

    // Once the window is materialized pagination proceeds normally.
    history.push_page(page(50..100));
    let older = store.load_older();
    let actions = drive(&mut store, &mut history, older);
    assert!(actions.contains(&StoreAction::Prepended { count: 50 }));
    assert!(store.has_more_older());
}

#[test]
fn older_page_duplicates_checked_against_whole_window() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(page(100..150));
    // Server resends an already-held id alongside one genuinely new entry.
    history.push_page(vec![
        IncomingBuilder::new(120).body("history").build(),
        IncomingBuilder::new(99).body("history").build(),
    ]);

    open(&mut store, &mut history, 1);
    let older = store.load_older();
    let actions = drive(&mut store, &mut history, older);

    assert_eq!(store.messages().len(), 51);
    assert!(actions.contains(&StoreAction::Prepended { count: 1 }));
    assert_eq!(store.oldest_loaded(), Some(ServerId(99)));
}

#[test]
fn older_fetch_error_is_surfaced_and_retryable() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(page(100..150));
    history.push_error(TransportError::Network("reset".into()));
    history.push_page(page(50..100));

    open(&mut store, &mut history, 1);
    let older = store.load_older();
    let actions = drive(&mut store, &mut history, older);

    assert!(actions.iter().any(|a| matches!(a, StoreAction::Notify { is_error: true, .. })));
    assert!(actions.contains(&StoreAction::HideLoading));
    assert!(store.has_more_older());
    assert!(!store.is_paginating());
    assert_eq!(store.messages().len(), 50);

    // Scrolling again retries and succeeds.
    let retry = store.load_older();
    drive(&mut store, &mut history, retry);
    assert_eq!(store.messages().len(), 100);
}

#[test]
fn optimistic_send_confirmed_by_correlation_in_place() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(page(10..13));

    open(&mut store, &mut history, 1);
    let actions = store.send_message("hello", None);
    let correlation = dispatched_correlation(&actions).unwrap_or(0);

    let optimistic_index = store.messages().len() - 1;
    assert!(store.messages()[optimistic_index].is_pending());

    let (result, actions) = store.reconcile_incoming(
        IncomingBuilder::new(500).own().body("hello").correlation(correlation).build(),
    );

    assert_eq!(result, ReconcileResult::Replaced);
    assert!(matches!(
        actions.as_slice(),
        [StoreAction::Apply(TimelineDelta::Replaced { index, .. })] if *index == optimistic_index
    ));

    let confirmed: Vec<_> =
        store.messages().iter().filter(|m| m.id == MessageId::Server(ServerId(500))).collect();
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].lifecycle, Lifecycle::Confirmed);
    assert_eq!(store.messages()[optimistic_index].id, MessageId::Server(ServerId(500)));
}

#[test]
fn duplicate_live_message_suppressed() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(Vec::new());

    open(&mut store, &mut history, 1);
    let incoming = IncomingBuilder::new(42).body("once").build();

    let (first, _) = store.reconcile_incoming(incoming.clone());
    let len_after_first = store.messages().len();
    let (second, actions) = store.reconcile_incoming(incoming);

    assert_eq!(first, ReconcileResult::Inserted);
    assert_eq!(second, ReconcileResult::Duplicate);
    assert!(actions.is_empty());
    assert_eq!(store.messages().len(), len_after_first);
}

#[test]
fn live_message_inserted_in_timestamp_order() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(Vec::new());

    open(&mut store, &mut history, 1);
    store.reconcile_incoming(IncomingBuilder::new(20).body("later").build());
    let (result, actions) =
        store.reconcile_incoming(IncomingBuilder::new(15).body("earlier").build());

    assert_eq!(result, ReconcileResult::Inserted);
    assert!(matches!(
        actions.first(),
        Some(StoreAction::Apply(TimelineDelta::Inserted { index: 0, .. }))
    ));
    assert_eq!(store.messages()[0].body, "earlier");
}

#[test]
fn heuristic_match_confirms_own_recent_echo_without_token() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(Vec::new());

    open(&mut store, &mut history, 1);
    store.send_message("hi there", None);

    let (result, _) =
        store.reconcile_incoming(IncomingBuilder::new(600).own().body("hi there").build());

    assert_eq!(result, ReconcileResult::Replaced);
    assert_eq!(store.messages().len(), 1);
    assert_eq!(store.messages()[0].lifecycle, Lifecycle::Confirmed);
}

#[test]
fn heuristic_match_expires_outside_recency_window() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(Vec::new());

    open(&mut store, &mut history, 1);
    store.send_message("hi there", None);
    env.advance(Duration::from_secs(6));

    let (result, _) =
        store.reconcile_incoming(IncomingBuilder::new(600).own().body("hi there").build());

    // Too old to be the echo: materialized as a second message, the pending
    // entry stays pending.
    assert_eq!(result, ReconcileResult::Inserted);
    assert_eq!(store.messages().len(), 2);
}

#[test]
fn heuristic_match_collapses_duplicate_text_sends() {
    // Known soft spot: two identical sends inside the window and a tokenless
    // echo collapse onto the older optimistic entry.
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(Vec::new());

    open(&mut store, &mut history, 1);
    store.send_message("same text", None);
    store.send_message("same text", None);

    let (result, _) =
        store.reconcile_incoming(IncomingBuilder::new(700).own().body("same text").build());

    assert_eq!(result, ReconcileResult::Replaced);
    assert_eq!(store.messages()[0].id, MessageId::Server(ServerId(700)));
    assert!(store.messages()[1].is_pending());
}

#[test]
fn edit_and_delete_reject_temporary_ids() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(Vec::new());

    open(&mut store, &mut history, 1);
    store.send_message("draft", None);
    let local_id = store.messages()[0].id;
    assert!(local_id.is_local());

    let edited = store.apply_edit(local_id, "changed".into(), env.now_utc());
    let deleted = store.apply_delete(local_id);

    assert!(edited.is_empty());
    assert!(deleted.is_empty());
    assert_eq!(store.messages().len(), 1);
    assert_eq!(store.messages()[0].body, "draft");
}

#[test]
fn edit_updates_single_entry_in_place() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(page(10..13));

    open(&mut store, &mut history, 1);
    let edited_at = env.now_utc();
    let actions =
        store.apply_edit(MessageId::Server(ServerId(11)), "amended".into(), edited_at);

    assert!(matches!(
        actions.as_slice(),
        [StoreAction::Apply(TimelineDelta::Updated { index: 1, .. })]
    ));
    assert_eq!(store.messages()[1].body, "amended");
    assert_eq!(store.messages()[1].edited_at, Some(edited_at));
    assert_eq!(store.messages().len(), 3);
}

#[test]
fn delete_prunes_orphaned_day_separator() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(vec![
        IncomingBuilder::new(10).body("jan 1").at_ms(1_704_067_200_000).build(),
        IncomingBuilder::new(11).body("jan 2").at_ms(1_704_153_600_000).build(),
    ]);

    open(&mut store, &mut history, 1);
    assert_eq!(store.day_markers().len(), 2);

    let actions = store.apply_delete(MessageId::Server(ServerId(11)));

    assert!(actions.contains(&StoreAction::RefreshMarkers));
    assert_eq!(store.day_markers().len(), 1);
}

#[test]
fn watchdog_releases_stuck_pagination_lock() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(page(100..150));

    open(&mut store, &mut history, 1);

    // Fetch issued but its completion never arrives.
    let _ = store.load_older();
    assert!(store.is_paginating());

    env.advance(Duration::from_secs(2));
    assert!(store.handle_tick().is_empty());
    assert!(store.is_paginating());

    env.advance(Duration::from_secs(2));
    let actions = store.handle_tick();

    assert!(actions.contains(&StoreAction::HideLoading));
    assert!(!store.is_paginating());
    // The user can retry without a reload.
    assert!(!store.load_older().is_empty());
}

#[test]
fn stale_completion_discarded_after_conversation_switch() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(page(100..150));

    open(&mut store, &mut history, 1);

    // Start an older fetch for conversation 1 but hold its completion.
    let in_flight = store.load_older();
    let (token, request) = in_flight
        .iter()
        .find_map(|a| match a {
            StoreAction::FetchHistory { token, request } => Some((*token, *request)),
            _ => None,
        })
        .unwrap_or_else(|| unreachable!("load_older must issue a fetch"));

    // Switch to conversation 2 before the response lands.
    history.push_page(vec![IncomingBuilder::new(9000).conversation(2).body("b").build()]);
    open(&mut store, &mut history, 2);
    let window_after_switch: Vec<_> = store.messages().to_vec();

    // The late response for conversation 1 arrives and must change nothing.
    let actions = store.handle_history(token, Ok(page(50..100)));
    let _ = request;

    assert!(actions.is_empty());
    assert_eq!(store.messages(), window_after_switch.as_slice());
}

#[test]
fn conversation_switch_discards_pending_sends() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(Vec::new());

    open(&mut store, &mut history, 1);
    let actions = store.send_message("unsent", None);
    let correlation = dispatched_correlation(&actions).unwrap_or(0);

    history.push_page(Vec::new());
    open(&mut store, &mut history, 2);
    assert!(store.messages().is_empty());

    // The old conversation's ack finds nothing to confirm; with conversation
    // 2 active the message is simply ignored.
    let (result, _) = store.reconcile_incoming(
        IncomingBuilder::new(800).own().body("unsent").correlation(correlation).build(),
    );
    assert_eq!(result, ReconcileResult::Ignored);
}

#[test]
fn unacknowledged_send_fails_after_bounded_wait() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(Vec::new());

    open(&mut store, &mut history, 1);
    store.send_message("into the void", None);
    assert!(store.messages()[0].is_pending());

    env.advance(Duration::from_secs(31));
    let actions = store.handle_tick();

    assert!(matches!(
        actions.as_slice(),
        [StoreAction::Apply(TimelineDelta::Updated { index: 0, .. })]
    ));
    // Failed, still visible: a failed send is never silently dropped.
    assert_eq!(store.messages()[0].lifecycle, Lifecycle::Failed);
}

#[test]
fn dispatch_failure_marks_entry_failed() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(Vec::new());

    open(&mut store, &mut history, 1);
    let actions = store.send_message("doomed", None);
    let correlation = dispatched_correlation(&actions).unwrap_or(0);

    let actions = store.mark_send_failed(correlation);

    assert!(actions.iter().any(|a| matches!(a, StoreAction::Notify { is_error: true, .. })));
    assert_eq!(store.messages()[0].lifecycle, Lifecycle::Failed);
}

#[test]
fn empty_body_send_is_rejected() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(Vec::new());

    open(&mut store, &mut history, 1);

    assert!(store.send_message("   ", None).is_empty());
    assert!(store.messages().is_empty());
}

#[test]
fn reply_snapshot_survives_edit_of_original() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(vec![IncomingBuilder::new(10).body("original words").build()]);

    open(&mut store, &mut history, 1);
    store.send_message("reply", Some(ServerId(10)));

    store.apply_edit(MessageId::Server(ServerId(10)), "rewritten".into(), env.now_utc());

    let snapshot = store.messages()[1].reply_to.clone();
    assert_eq!(snapshot.map(|s| s.excerpt), Some("original words".to_string()));
}

#[test]
fn live_message_for_other_conversation_ignored() {
    let env = SimEnv::with_seed(7);
    let mut store = new_store(&env);
    let mut history = ScriptedHistory::new();
    history.push_page(Vec::new());

    open(&mut store, &mut history, 1);
    let (result, actions) =
        store.reconcile_incoming(IncomingBuilder::new(5).conversation(2).body("elsewhere").build());

    assert_eq!(result, ReconcileResult::Ignored);
    assert!(actions.is_empty());
    assert!(store.messages().is_empty());
}
