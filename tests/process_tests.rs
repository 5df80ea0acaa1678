//! Integration tests for `Process`.

use rstest::rstest;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use teaflow::task::Process;

fn counted() -> (Process, Arc<AtomicUsize>) {
    let kills = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&kills);
    let process = Process::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (process, kills)
}

#[rstest]
#[tokio::test]
async fn test_kill_is_idempotent() {
    let (process, kills) = counted();
    let kill = process.kill();

    kill.run_safe().await;
    kill.run_safe().await;
    process.kill().run_safe().await;

    assert_eq!(kills.load(Ordering::SeqCst), 1);
    assert!(process.is_killed());
}

#[rstest]
#[tokio::test]
async fn test_kill_task_is_lazy() {
    let (process, kills) = counted();
    let _kill = process.kill();

    assert_eq!(kills.load(Ordering::SeqCst), 0);
    assert!(!process.is_killed());
}

#[rstest]
#[tokio::test]
async fn test_clones_share_kill_state() {
    let (process, kills) = counted();
    let clone = process.clone();

    clone.kill().run_safe().await;

    assert!(process.is_killed());
    assert_eq!(process.id(), clone.id());
    assert_eq!(kills.load(Ordering::SeqCst), 1);
}

#[rstest]
#[tokio::test]
async fn test_noop_process_can_be_killed() {
    let process = Process::noop();
    process.kill().run_safe().await;
    assert!(process.is_killed());
}

#[rstest]
fn test_debug_shows_state() {
    let process = Process::noop();
    let rendered = format!("{process:?}");
    assert!(rendered.contains("killed: false"));
}
