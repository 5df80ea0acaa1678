//! Integration tests for the counter sample.

use counter::{CounterConfig, Msg, NUDGE_LIMIT, next_nudge, program};
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;
use teaflow::prelude::*;

fn config(max_ticks: u32) -> CounterConfig {
    CounterConfig {
        name: "counter-test".to_string(),
        tick: Duration::from_millis(100),
        max_ticks,
    }
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_ticks_stop_at_budget() {
    let handle = program(&config(3), Port::new("nudges")).init(());

    tokio::time::sleep(Duration::from_secs(2)).await;
    handle.settled().await;

    let model = handle.get_model();
    assert_eq!(model.ticks, 3);
    assert_eq!(model.count, 3);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_port_nudges_and_save() {
    let nudges = Port::new("nudges");
    let handle = program(&config(0), nudges.clone()).init(());
    handle.settled().await;

    assert!(nudges.send(5));
    handle.settled().await;
    handle.dispatch(Msg::Save).unwrap();
    handle.settled().await;

    let model = handle.get_model();
    assert_eq!(model.count, 5);
    assert_eq!(model.saved, Some(5));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_failed_save_is_recorded() {
    let nudges = Port::new("nudges");
    let handle = program(&config(0), nudges.clone()).init(());
    handle.settled().await;

    nudges.send(-4);
    handle.settled().await;
    handle.dispatch(Msg::Save).unwrap();
    handle.settled().await;

    let model = handle.get_model();
    assert_eq!(model.saved, None);
    assert!(model.last_error.as_deref().is_some_and(|e| e.contains("-4")));
}

#[rstest]
#[tokio::test]
async fn test_zero_nudge_keeps_model() {
    let nudges = Port::new("nudges");
    let handle = program(&config(0), nudges.clone()).init(());
    handle.settled().await;
    let before = handle.get_model();

    nudges.send(0);
    handle.settled().await;

    assert!(Arc::ptr_eq(&before, &handle.get_model()));
}

#[rstest]
#[case(1, -2)]
#[case(-2, 4)]
#[case(NUDGE_LIMIT, 1)]
#[case(-NUDGE_LIMIT, 1)]
fn test_next_nudge(#[case] n: i64, #[case] expected: i64) {
    assert_eq!(next_nudge(n), expected);
}

#[rstest]
fn test_nudges_stay_bounded() {
    let mut n = 1;
    for _ in 0..1_000 {
        n = next_nudge(n);
        assert!(n.unsigned_abs() <= 2 * NUDGE_LIMIT.unsigned_abs());
    }
}
