//! Scroll/viewport controller.
//!
//! Tracks whether the user is pinned to the bottom of the conversation,
//! owns the unread badge and jump-to-bottom affordance, restores the scroll
//! anchor across history prepends, and debounces the load-older trigger.
//!
//! The controller superimposes a pagination lock over the bottom-tracking
//! state machine: while an older fetch or a programmatic scroll is in
//! progress, user-scroll handling is suppressed so programmatic adjustments
//! cannot feed back into trigger detection. The lock carries the same
//! watchdog bound as the store's in-flight flags.

use std::time::Duration;

use driftline_core::Environment;

/// Distance from the bottom (px) within which the user counts as pinned.
const BOTTOM_THRESHOLD_PX: f64 = 32.0;

/// Distance from the top (px) within which pagination triggers.
const TOP_THRESHOLD_PX: f64 = 5.0;

/// Minimum interval between load-older triggers.
const TRIGGER_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Watchdog bound on the superimposed lock (3 seconds).
const LOCK_FAILSAFE: Duration = Duration::from_secs(3);

/// Scroll container measurements, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    /// Scroll offset from the top of the content.
    pub scroll_top: f64,
    /// Total content height.
    pub scroll_height: f64,
    /// Visible container height.
    pub viewport_height: f64,
}

impl ScrollMetrics {
    /// Distance between the bottom of the viewport and the bottom of the
    /// content.
    pub fn distance_from_bottom(&self) -> f64 {
        (self.scroll_height - self.viewport_height - self.scroll_top).max(0.0)
    }
}

/// Bottom-tracking state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollPosition {
    /// Pinned to the newest message; arrivals auto-scroll.
    AtBottom,
    /// Reading history; arrivals increment the unread badge instead.
    ScrolledUp,
}

/// Instructions produced by the viewport controller.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewportAction {
    /// Scroll the container to the bottom.
    ScrollToBottom {
        /// Animate the scroll.
        smooth: bool,
    },
    /// Set the container scroll offset (anchor restoration).
    SetScrollTop(f64),
    /// Reveal the jump-to-bottom affordance.
    ShowJumpAffordance,
    /// Hide the jump-to-bottom affordance.
    HideJumpAffordance,
    /// Update the unread badge.
    SetUnreadBadge(u32),
    /// Ask the store for the next older page.
    RequestOlderPage,
}

/// Which operations currently hold the superimposed lock.
#[derive(Debug, Clone, Copy, Default)]
struct LockSources {
    pagination: bool,
    programmatic: bool,
}

impl LockSources {
    fn any(self) -> bool {
        self.pagination || self.programmatic
    }
}

/// Scroll state machine for one conversation container.
#[derive(Debug, Clone)]
pub struct ViewportController<E: Environment> {
    env: E,
    position: ScrollPosition,
    unread: u32,
    lock: LockSources,
    locked_since: Option<E::Instant>,
    /// Content height captured when a pagination fetch starts.
    height_before_prepend: Option<f64>,
    last_metrics: Option<ScrollMetrics>,
    last_trigger: Option<E::Instant>,
}

impl<E: Environment> ViewportController<E> {
    /// Create a controller pinned to the bottom.
    pub fn new(env: E) -> Self {
        Self {
            env,
            position: ScrollPosition::AtBottom,
            unread: 0,
            lock: LockSources::default(),
            locked_since: None,
            height_before_prepend: None,
            last_metrics: None,
            last_trigger: None,
        }
    }

    /// Current bottom-tracking state.
    pub fn position(&self) -> ScrollPosition {
        self.position
    }

    /// Unread messages accumulated while scrolled up.
    pub fn unread(&self) -> u32 {
        self.unread
    }

    /// True while the superimposed lock is held.
    pub fn is_locked(&self) -> bool {
        self.lock.any()
    }

    /// Reset for a conversation switch.
    pub fn reset(&mut self) -> Vec<ViewportAction> {
        self.position = ScrollPosition::AtBottom;
        self.unread = 0;
        self.lock = LockSources::default();
        self.locked_since = None;
        self.height_before_prepend = None;
        self.last_metrics = None;
        self.last_trigger = None;

        vec![ViewportAction::HideJumpAffordance, ViewportAction::SetUnreadBadge(0)]
    }

    /// Process a user scroll.
    ///
    /// Suppressed entirely while the lock is held, so programmatic scroll
    /// adjustments never masquerade as user intent.
    pub fn user_scrolled(&mut self, metrics: ScrollMetrics) -> Vec<ViewportAction> {
        self.last_metrics = Some(metrics);
        if self.lock.any() {
            tracing::debug!("scroll handling suppressed while locked");
            return vec![];
        }

        let mut actions = Vec::new();
        let distance = metrics.distance_from_bottom();
        match self.position {
            ScrollPosition::AtBottom if distance > BOTTOM_THRESHOLD_PX => {
                self.position = ScrollPosition::ScrolledUp;
                actions.push(ViewportAction::ShowJumpAffordance);
            },
            ScrollPosition::ScrolledUp if distance <= BOTTOM_THRESHOLD_PX => {
                self.position = ScrollPosition::AtBottom;
                self.unread = 0;
                actions.push(ViewportAction::HideJumpAffordance);
                actions.push(ViewportAction::SetUnreadBadge(0));
            },
            ScrollPosition::AtBottom | ScrollPosition::ScrolledUp => {},
        }

        if metrics.scroll_top <= TOP_THRESHOLD_PX {
            actions.extend(self.trigger_load());
        }

        actions
    }

    /// Pull-to-refresh gesture at the top edge.
    ///
    /// Routes through the same debounced trigger as top-of-scroll detection;
    /// there is deliberately a single load-older path.
    pub fn pull_to_refresh(&mut self) -> Vec<ViewportAction> {
        if self.lock.any() {
            tracing::debug!("pull-to-refresh suppressed while locked");
            return vec![];
        }
        self.trigger_load()
    }

    /// A new message was materialized at the tail.
    ///
    /// Own messages always snap to the bottom; others auto-scroll only while
    /// pinned, incrementing the unread badge otherwise.
    pub fn new_message(&mut self, own: bool) -> Vec<ViewportAction> {
        if own {
            self.position = ScrollPosition::AtBottom;
            self.unread = 0;
            return vec![
                ViewportAction::ScrollToBottom { smooth: true },
                ViewportAction::HideJumpAffordance,
                ViewportAction::SetUnreadBadge(0),
            ];
        }

        match self.position {
            ScrollPosition::AtBottom => vec![ViewportAction::ScrollToBottom { smooth: true }],
            ScrollPosition::ScrolledUp => {
                self.unread += 1;
                vec![ViewportAction::SetUnreadBadge(self.unread)]
            },
        }
    }

    /// Jump-to-bottom affordance invoked.
    pub fn jump_to_bottom(&mut self) -> Vec<ViewportAction> {
        self.position = ScrollPosition::AtBottom;
        self.unread = 0;
        vec![
            ViewportAction::ScrollToBottom { smooth: true },
            ViewportAction::HideJumpAffordance,
            ViewportAction::SetUnreadBadge(0),
        ]
    }

    /// An older fetch left the store; capture the anchor and take the lock.
    pub fn pagination_started(&mut self) {
        self.height_before_prepend = self.last_metrics.map(|m| m.scroll_height);
        self.lock.pagination = true;
        self.hold_lock();
    }

    /// Older content was materialized above the viewport; restore the anchor
    /// so the previously-topmost visible message stays in place.
    pub fn prepend_applied(&mut self, new_scroll_height: f64) -> Vec<ViewportAction> {
        let mut actions = Vec::new();
        if let Some(before) = self.height_before_prepend.take() {
            actions.push(ViewportAction::SetScrollTop(new_scroll_height - before));
        }
        self.release_pagination();
        actions
    }

    /// An older fetch completed without prepending (empty page or error).
    pub fn pagination_finished(&mut self) {
        self.height_before_prepend = None;
        self.release_pagination();
    }

    /// A programmatic scroll (search jump, edit-in-place) is starting.
    pub fn programmatic_scroll_started(&mut self) {
        self.lock.programmatic = true;
        self.hold_lock();
    }

    /// The programmatic scroll settled.
    pub fn programmatic_scroll_finished(&mut self) {
        self.lock.programmatic = false;
        if !self.lock.any() {
            self.locked_since = None;
        }
    }

    /// Watchdog sweep: force-release a lock held past the failsafe bound.
    pub fn handle_tick(&mut self) {
        if let Some(since) = self.locked_since
            && self.env.now() - since > LOCK_FAILSAFE
        {
            tracing::warn!("viewport lock watchdog fired; force-releasing");
            self.lock = LockSources::default();
            self.locked_since = None;
            self.height_before_prepend = None;
        }
    }

    fn trigger_load(&mut self) -> Vec<ViewportAction> {
        let now = self.env.now();
        if let Some(last) = self.last_trigger
            && now - last < TRIGGER_DEBOUNCE
        {
            tracing::debug!("load-older trigger debounced");
            return vec![];
        }
        self.last_trigger = Some(now);
        vec![ViewportAction::RequestOlderPage]
    }

    fn hold_lock(&mut self) {
        if self.locked_since.is_none() {
            self.locked_since = Some(self.env.now());
        }
    }

    fn release_pagination(&mut self) {
        self.lock.pagination = false;
        if !self.lock.any() {
            self.locked_since = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use driftline_harness::SimEnv;

    use super::*;

    fn controller(env: &SimEnv) -> ViewportController<SimEnv> {
        ViewportController::new(env.clone())
    }

    fn metrics(scroll_top: f64) -> ScrollMetrics {
        ScrollMetrics { scroll_top, scroll_height: 2_000.0, viewport_height: 600.0 }
    }

    #[test]
    fn scrolling_away_from_bottom_reveals_affordance() {
        let env = SimEnv::with_seed(1);
        let mut vp = controller(&env);

        // Bottom would be scroll_top = 1400; move well above it.
        let actions = vp.user_scrolled(metrics(800.0));

        assert_eq!(vp.position(), ScrollPosition::ScrolledUp);
        assert!(actions.contains(&ViewportAction::ShowJumpAffordance));
    }

    #[test]
    fn returning_to_bottom_clears_unread() {
        let env = SimEnv::with_seed(1);
        let mut vp = controller(&env);

        let _ = vp.user_scrolled(metrics(800.0));
        let _ = vp.new_message(false);
        let _ = vp.new_message(false);
        assert_eq!(vp.unread(), 2);

        let actions = vp.user_scrolled(metrics(1_390.0));

        assert_eq!(vp.position(), ScrollPosition::AtBottom);
        assert_eq!(vp.unread(), 0);
        assert!(actions.contains(&ViewportAction::SetUnreadBadge(0)));
    }

    #[test]
    fn arrivals_auto_scroll_only_at_bottom() {
        let env = SimEnv::with_seed(1);
        let mut vp = controller(&env);

        assert!(
            vp.new_message(false).contains(&ViewportAction::ScrollToBottom { smooth: true })
        );

        let _ = vp.user_scrolled(metrics(800.0));
        let actions = vp.new_message(false);
        assert_eq!(actions, vec![ViewportAction::SetUnreadBadge(1)]);
    }

    #[test]
    fn own_send_snaps_to_bottom_from_anywhere() {
        let env = SimEnv::with_seed(1);
        let mut vp = controller(&env);

        let _ = vp.user_scrolled(metrics(800.0));
        let actions = vp.new_message(true);

        assert_eq!(vp.position(), ScrollPosition::AtBottom);
        assert!(actions.contains(&ViewportAction::ScrollToBottom { smooth: true }));
    }

    #[test]
    fn top_edge_triggers_load_once_per_debounce_window() {
        let env = SimEnv::with_seed(1);
        let mut vp = controller(&env);

        let first = vp.user_scrolled(metrics(0.0));
        let second = vp.user_scrolled(metrics(2.0));

        assert!(first.contains(&ViewportAction::RequestOlderPage));
        assert!(!second.contains(&ViewportAction::RequestOlderPage));

        env.advance(Duration::from_millis(1_100));
        let third = vp.user_scrolled(metrics(1.0));
        assert!(third.contains(&ViewportAction::RequestOlderPage));
    }

    #[test]
    fn pull_to_refresh_shares_the_debounce() {
        let env = SimEnv::with_seed(1);
        let mut vp = controller(&env);

        assert!(vp.pull_to_refresh().contains(&ViewportAction::RequestOlderPage));
        assert!(vp.pull_to_refresh().is_empty());
    }

    #[test]
    fn scroll_handling_suppressed_while_locked() {
        let env = SimEnv::with_seed(1);
        let mut vp = controller(&env);

        let _ = vp.user_scrolled(metrics(700.0));
        vp.pagination_started();

        assert!(vp.user_scrolled(metrics(0.0)).is_empty());
        assert!(vp.is_locked());
    }

    #[test]
    fn prepend_restores_scroll_anchor() {
        let env = SimEnv::with_seed(1);
        let mut vp = controller(&env);

        let _ = vp.user_scrolled(metrics(10.0));
        vp.pagination_started();
        let actions = vp.prepend_applied(3_500.0);

        // Content grew by 1500px above the viewport; the offset moves by the
        // same amount so the anchor message stays put.
        assert_eq!(actions, vec![ViewportAction::SetScrollTop(1_500.0)]);
        assert!(!vp.is_locked());
    }

    #[test]
    fn lock_watchdog_force_releases() {
        let env = SimEnv::with_seed(1);
        let mut vp = controller(&env);

        vp.programmatic_scroll_started();
        assert!(vp.is_locked());

        env.advance(Duration::from_secs(4));
        vp.handle_tick();

        assert!(!vp.is_locked());
    }
}
