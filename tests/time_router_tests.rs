#![cfg(feature = "time")]
//! Integration tests for the time router running inside a program.
//!
//! All tests run on a paused clock, so intervals elapse deterministically.

use rstest::rstest;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use teaflow::prelude::*;
use teaflow::router::time;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Msg {
    Fast(SystemTime),
    Slow(SystemTime),
    Stop,
}

#[derive(Debug, Clone, Default)]
struct Clock {
    fast: u32,
    slow: u32,
    stopped: bool,
}

fn clock(with_slow: bool) -> Program<(), Clock, Msg> {
    Program::worker(
        |()| (Clock::default(), Cmd::none()),
        |message, model: &Arc<Clock>| {
            let mut next = (**model).clone();
            match message {
                Msg::Fast(_) => next.fast += 1,
                Msg::Slow(_) => next.slow += 1,
                Msg::Stop => next.stopped = true,
            }
            (Arc::new(next), Cmd::none())
        },
        move |model| {
            if model.stopped {
                return Sub::none();
            }
            let fast = time::every(Duration::from_millis(100), Msg::Fast);
            if with_slow {
                Sub::batch([fast, time::every(Duration::from_millis(250), Msg::Slow)])
            } else {
                fast
            }
        },
    )
}

async fn advance<M: Send + Sync + 'static, G: Send + 'static>(handle: &Handle<M, G>, by: Duration) {
    tokio::time::sleep(by).await;
    handle.settled().await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_every_ticks_at_interval() {
    let handle = clock(false).init(());

    advance(&handle, Duration::from_millis(350)).await;

    assert_eq!(handle.get_model().fast, 3);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_intervals_tick_independently() {
    let handle = clock(true).init(());

    advance(&handle, Duration::from_millis(520)).await;

    let model = handle.get_model();
    assert_eq!(model.fast, 5);
    assert_eq!(model.slow, 2);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_no_ticks_after_unsubscribe() {
    let handle = clock(false).init(());
    advance(&handle, Duration::from_millis(250)).await;
    assert_eq!(handle.get_model().fast, 2);

    handle.dispatch(Msg::Stop).unwrap();
    handle.settled().await;
    advance(&handle, Duration::from_secs(5)).await;

    assert_eq!(handle.get_model().fast, 2);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_duplicate_subscriptions_share_a_timer() {
    let handle = Program::worker(
        |()| (0_u32, Cmd::none()),
        |n: u32, model: &Arc<u32>| (Arc::new(**model + n), Cmd::none()),
        |_| {
            Sub::batch([
                time::every(Duration::from_millis(100), |_| 1),
                time::every(Duration::from_millis(100), |_| 10),
            ])
        },
    )
    .init(());

    advance(&handle, Duration::from_millis(150)).await;

    // One tick, delivered to both listeners.
    assert_eq!(*handle.get_model(), 11);
}

#[rstest]
#[tokio::test]
async fn test_now_reads_wall_clock() {
    let before = SystemTime::now();
    let now = time::now().run_safe().await;
    assert!(now >= before);
}
