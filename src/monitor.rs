//! Progress monitor.
//!
//! A background task that polls the dispatched trackers at a fixed interval
//! and sends a [`ProgressSnapshot`] on every tick. It only reads trackers.
//! Snapshots may lag the true state by up to one interval.
//!
//! The monitor stops on its own once every tracker is terminal, or earlier
//! when cancelled through its [`MonitorHandle`]. Errors inside the poll loop
//! are logged and never end orchestration.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::DEFAULT_POLL_INTERVAL_MS;
use crate::error::Error;
use crate::lifecycle::{LifecycleState, SharedTracker};

/// A unit that has not reached a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveUnit {
    pub name: String,
    pub state: LifecycleState,
    pub elapsed: Option<Duration>,
}

/// Aggregate progress at one poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub completed_count: usize,
    pub total_count: usize,
    pub active: Vec<ActiveUnit>,
}

impl ProgressSnapshot {
    /// Completed share of all units; 1.0 for an empty dispatch.
    pub fn fraction(&self) -> f64 {
        if self.total_count == 0 {
            1.0
        } else {
            self.completed_count as f64 / self.total_count as f64
        }
    }

    pub fn is_done(&self) -> bool {
        self.completed_count == self.total_count
    }
}

impl std::fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} tasks complete ({:.0}%)",
            self.completed_count,
            self.total_count,
            self.fraction() * 100.0
        )?;
        for unit in &self.active {
            match unit.elapsed {
                Some(elapsed) => write!(
                    f,
                    "\n  {} [{}] {:.1}s",
                    unit.name,
                    unit.state,
                    elapsed.as_secs_f64()
                )?,
                None => write!(f, "\n  {} [{}]", unit.name, unit.state)?,
            }
        }
        Ok(())
    }
}

/// Read every tracker once.
pub async fn observe(trackers: &[SharedTracker]) -> ProgressSnapshot {
    let mut completed_count = 0;
    let mut active = Vec::new();
    for tracker in trackers {
        let view = tracker.snapshot().await;
        if view.is_terminal() {
            completed_count += 1;
        } else {
            active.push(ActiveUnit {
                name: view.name,
                state: view.state,
                elapsed: view.elapsed,
            });
        }
    }
    ProgressSnapshot {
        completed_count,
        total_count: trackers.len(),
        active,
    }
}

/// Handle to a running monitor.
#[derive(Debug)]
pub struct MonitorHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Stop the monitor. Safe to call at any time, any number of times.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the monitor loop to exit.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            let err = Error::MonitorObservation(e.to_string());
            tracing::debug!(error = %err, "monitor task ended abnormally");
        }
    }
}

/// Fixed-interval observer of dispatched trackers.
#[derive(Debug, Clone, Copy)]
pub struct ProgressMonitor {
    interval: Duration,
}

impl Default for ProgressMonitor {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS))
    }
}

impl ProgressMonitor {
    /// A zero interval is raised to one millisecond.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start polling `trackers`, sending snapshots to `sink`.
    pub fn spawn(
        self,
        trackers: Vec<SharedTracker>,
        sink: mpsc::UnboundedSender<ProgressSnapshot>,
    ) -> MonitorHandle {
        self.spawn_with_cancel(trackers, sink, CancellationToken::new())
    }

    /// Like [`spawn`](Self::spawn), stopping when `cancel` fires.
    pub fn spawn_with_cancel(
        self,
        trackers: Vec<SharedTracker>,
        sink: mpsc::UnboundedSender<ProgressSnapshot>,
        cancel: CancellationToken,
    ) -> MonitorHandle {
        let cancel_clone = cancel.clone();

        tracing::debug!(
            units = trackers.len(),
            interval_ms = self.interval.as_millis() as u64,
            "progress monitor started"
        );

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel_clone.cancelled() => {
                        tracing::debug!("progress monitor cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        let snapshot = observe(&trackers).await;
                        let done = snapshot.is_done();
                        tracing::trace!(
                            completed = snapshot.completed_count,
                            total = snapshot.total_count,
                            "progress snapshot"
                        );

                        if let Err(e) = sink.send(snapshot) {
                            let err = Error::MonitorObservation(format!(
                                "snapshot sink closed: {}",
                                e
                            ));
                            tracing::debug!(error = %err, "dropping progress snapshot");
                        }

                        if done {
                            tracing::debug!("progress monitor finished");
                            break;
                        }
                    }
                }
            }
        });

        MonitorHandle { cancel, task }
    }
}
