//! Progress monitor tests.
//!
//! These tests run the monitor alongside a real dispatch and check what
//! the report consumer observes.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use orchestra::monitor::observe;
use orchestra::{
    LifecycleState, OrchestrationRequest, ProgressMonitor, ProgressSnapshot, SharedTracker,
    SourceFlags,
};

use crate::fixtures::{abc_catalog, orchestrator, FailFor, Slow};

fn drain(rx: &mut mpsc::UnboundedReceiver<ProgressSnapshot>) -> Vec<ProgressSnapshot> {
    let mut snapshots = Vec::new();
    while let Ok(snapshot) = rx.try_recv() {
        snapshots.push(snapshot);
    }
    snapshots
}

/// Snapshots show running units and end with everything complete.
#[tokio::test]
async fn test_snapshots_during_dispatch() {
    let orchestrator = orchestrator(abc_catalog(), Slow::all(Duration::from_millis(60)));
    let request = OrchestrationRequest::new(["A", "B", "C"], SourceFlags::local_only());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let report = orchestrator
        .dispatch_with_progress(request, tx, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.len(), 3);

    let snapshots = drain(&mut rx);
    assert!(snapshots.len() >= 2, "got {} snapshots", snapshots.len());
    assert!(snapshots.iter().all(|s| s.total_count == 3));
    assert!(snapshots.iter().any(|s| !s.active.is_empty()));
    for snapshot in &snapshots {
        for unit in &snapshot.active {
            assert!(!unit.state.is_terminal());
        }
    }

    let last = snapshots.last().unwrap();
    assert!(last.is_done());
    assert_eq!(last.completed_count, 3);
    assert!(last.active.is_empty());
}

/// Completed counts never go backwards.
#[tokio::test]
async fn test_completed_count_is_monotonic() {
    let orchestrator = orchestrator(abc_catalog(), Slow::only("C", Duration::from_millis(80)));
    let request = OrchestrationRequest::new(["A", "B", "C"], SourceFlags::local_only());
    let (tx, mut rx) = mpsc::unbounded_channel();

    orchestrator
        .dispatch_with_progress(request, tx, CancellationToken::new())
        .await
        .unwrap();

    let counts: Vec<usize> = drain(&mut rx).iter().map(|s| s.completed_count).collect();
    assert!(counts.windows(2).all(|w| w[0] <= w[1]), "{:?}", counts);
    assert_eq!(counts.last(), Some(&3));
}

/// Failed units count as completed.
#[tokio::test]
async fn test_failed_units_count_as_completed() {
    let orchestrator = orchestrator(abc_catalog(), FailFor::new(&["A", "B"]));
    let request = OrchestrationRequest::new(["A", "B", "C"], SourceFlags::local_only());
    let (tx, mut rx) = mpsc::unbounded_channel();

    orchestrator
        .dispatch_with_progress(request, tx, CancellationToken::new())
        .await
        .unwrap();

    let last = drain(&mut rx).pop().unwrap();
    assert_eq!(last.completed_count, 3);
}

/// A consumer that goes away does not disturb the dispatch.
#[tokio::test]
async fn test_dropped_consumer_is_harmless() {
    let orchestrator = orchestrator(abc_catalog(), Slow::all(Duration::from_millis(30)));
    let request = OrchestrationRequest::new(["A", "B", "C"], SourceFlags::local_only());
    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx);

    let report = orchestrator
        .dispatch_with_progress(request, tx, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.succeeded().count(), 3);
}

/// Fan-in does not wait for the next poll tick.
#[tokio::test]
async fn test_dispatch_returns_before_next_tick() {
    let orchestrator = orchestrator(abc_catalog(), Slow::all(Duration::from_millis(20)))
        .with_poll_interval(Duration::from_millis(500));
    let request = OrchestrationRequest::new(["A", "B"], SourceFlags::local_only());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let started = Instant::now();
    let report = orchestrator
        .dispatch_with_progress(request, tx, CancellationToken::new())
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.succeeded().count(), 2);
    assert!(elapsed < Duration::from_millis(250), "took {:?}", elapsed);

    let last = drain(&mut rx).pop().unwrap();
    assert!(last.is_done());
    assert_eq!(last.completed_count, 2);
}

/// Cancelling the caller's token stops snapshots but not units.
#[tokio::test]
async fn test_cancel_token_stops_snapshots_mid_dispatch() {
    let orchestrator = orchestrator(abc_catalog(), Slow::all(Duration::from_millis(150)));
    let request = OrchestrationRequest::new(["A", "B", "C"], SourceFlags::local_only());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let dispatch = {
        let orchestrator = orchestrator.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            orchestrator
                .dispatch_with_progress(request, tx, cancel)
                .await
        })
    };

    let first = rx.recv().await.unwrap();
    assert!(!first.is_done());
    cancel.cancel();

    let report = dispatch.await.unwrap().unwrap();
    assert_eq!(report.succeeded().count(), 3);

    // Nothing after cancellation reports the finished dispatch.
    let rest = drain(&mut rx);
    assert!(rest.iter().all(|s| !s.is_done()), "{:?}", rest);
    assert!(rx.recv().await.is_none());
}

/// Cancelling the monitor leaves in-flight units untouched.
#[tokio::test]
async fn test_cancel_monitor_while_units_run() {
    let trackers: Vec<SharedTracker> = ["A", "B"].iter().map(|n| SharedTracker::new(*n)).collect();
    for tracker in &trackers {
        tracker.start().await;
        tracker.advance(LifecycleState::Active).await;
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = ProgressMonitor::new(Duration::from_millis(5)).spawn(trackers.clone(), tx);
    let first = rx.recv().await.unwrap();
    assert_eq!(first.active.len(), 2);

    handle.cancel();
    handle.join().await;

    // Units carry on after the monitor is gone.
    for tracker in &trackers {
        tracker.advance(LifecycleState::Processing).await;
        tracker.advance(LifecycleState::Completing).await;
        tracker.complete().await;
    }
    let snapshot = observe(&trackers).await;
    assert!(snapshot.is_done());
}
