//! Property-based tests for the viewport controller.

use std::time::Duration;

use driftline_app::{ScrollMetrics, ScrollPosition, ViewportController};
use driftline_harness::SimEnv;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Scroll(f64),
    ForeignMessage,
    OwnMessage,
    Jump,
    Advance(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0.0f64..1_400.0).prop_map(Op::Scroll),
        3 => Just(Op::ForeignMessage),
        1 => Just(Op::OwnMessage),
        1 => Just(Op::Jump),
        1 => (0u64..3_000).prop_map(Op::Advance),
    ]
}

proptest! {
    /// The unread badge is always zero while pinned to the bottom, and own
    /// sends always re-pin.
    #[test]
    fn prop_unread_is_zero_at_bottom(ops in prop::collection::vec(op_strategy(), 0..80)) {
        let env = SimEnv::with_seed(17);
        let mut vp = ViewportController::new(env.clone());

        for op in ops {
            match op {
                Op::Scroll(scroll_top) => {
                    let _ = vp.user_scrolled(ScrollMetrics {
                        scroll_top,
                        scroll_height: 2_000.0,
                        viewport_height: 600.0,
                    });
                },
                Op::ForeignMessage => {
                    let _ = vp.new_message(false);
                },
                Op::OwnMessage => {
                    let _ = vp.new_message(true);
                    prop_assert_eq!(vp.position(), ScrollPosition::AtBottom);
                },
                Op::Jump => {
                    let _ = vp.jump_to_bottom();
                },
                Op::Advance(ms) => {
                    env.advance(Duration::from_millis(ms));
                    vp.handle_tick();
                },
            }

            if vp.position() == ScrollPosition::AtBottom {
                prop_assert_eq!(vp.unread(), 0);
            }
        }
    }
}
