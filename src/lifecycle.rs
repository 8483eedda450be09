//! Per-unit execution lifecycle.
//!
//! A [`LifecycleTracker`] records the phase and timing of one dispatched
//! unit of work. Phases move forward along
//! `PENDING -> STARTING -> ACTIVE -> PROCESSING -> COMPLETING -> COMPLETED`;
//! `ERROR` is reachable from any non-terminal phase.
//!
//! Illegal transitions are programming errors and panic. Callers that need
//! to check first use [`LifecycleTracker::can_transition`].
//!
//! [`SharedTracker`] wraps a tracker for the single-writer, multi-reader
//! access pattern between a unit and the progress monitor.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Execution phase of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Pending,
    Starting,
    Active,
    Processing,
    Completing,
    Completed,
    Error,
}

impl LifecycleState {
    /// `Completed` and `Error` end the lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Completed | LifecycleState::Error)
    }

    /// The next phase on the success path, if any.
    pub fn next(&self) -> Option<LifecycleState> {
        match self {
            LifecycleState::Pending => Some(LifecycleState::Starting),
            LifecycleState::Starting => Some(LifecycleState::Active),
            LifecycleState::Active => Some(LifecycleState::Processing),
            LifecycleState::Processing => Some(LifecycleState::Completing),
            LifecycleState::Completing => Some(LifecycleState::Completed),
            LifecycleState::Completed | LifecycleState::Error => None,
        }
    }

    /// Nominal completion fraction for progress display.
    pub fn progress(&self) -> f64 {
        match self {
            LifecycleState::Pending => 0.0,
            LifecycleState::Starting => 0.1,
            LifecycleState::Active => 0.3,
            LifecycleState::Processing => 0.6,
            LifecycleState::Completing => 0.9,
            LifecycleState::Completed | LifecycleState::Error => 1.0,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Pending => "PENDING",
            LifecycleState::Starting => "STARTING",
            LifecycleState::Active => "ACTIVE",
            LifecycleState::Processing => "PROCESSING",
            LifecycleState::Completing => "COMPLETING",
            LifecycleState::Completed => "COMPLETED",
            LifecycleState::Error => "ERROR",
        };
        write!(f, "{}", name)
    }
}

/// Phase and timing of one dispatched unit.
///
/// `end_time` is set iff the state is terminal and `error_message` is set
/// iff the state is `Error`. A terminal tracker never changes again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleTracker {
    name: String,
    state: LifecycleState,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

impl LifecycleTracker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: LifecycleState::Pending,
            start_time: None,
            end_time: None,
            error_message: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Whether moving to `target` is legal from the current state.
    pub fn can_transition(&self, target: LifecycleState) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        target == LifecycleState::Error || self.state.next() == Some(target)
    }

    /// Begin execution.
    ///
    /// # Panics
    ///
    /// Panics unless the tracker is `Pending`.
    pub fn start(&mut self) {
        self.transition(LifecycleState::Starting);
        self.start_time = Some(Utc::now());
    }

    /// Move to an intermediate phase.
    ///
    /// # Panics
    ///
    /// Panics if `next` is not `Active`, `Processing` or `Completing`, or is
    /// not the immediate successor of the current state.
    pub fn advance(&mut self, next: LifecycleState) {
        if !matches!(
            next,
            LifecycleState::Active | LifecycleState::Processing | LifecycleState::Completing
        ) {
            panic!(
                "tracker {}: advance only accepts ACTIVE, PROCESSING or COMPLETING, got {}",
                self.name, next
            );
        }
        self.transition(next);
    }

    /// Finish successfully.
    ///
    /// # Panics
    ///
    /// Panics unless the tracker is `Completing`.
    pub fn complete(&mut self) {
        self.transition(LifecycleState::Completed);
        self.end_time = Some(Utc::now());
    }

    /// Finish with an error. Legal from any non-terminal state.
    ///
    /// # Panics
    ///
    /// Panics if the tracker is already terminal.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.transition(LifecycleState::Error);
        self.end_time = Some(Utc::now());
        self.error_message = Some(message.into());
    }

    /// `end - start`, once both timestamps exist.
    pub fn duration(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => (end - start).to_std().ok(),
            _ => None,
        }
    }

    /// Time spent so far: `now - start` while running, the full duration
    /// once terminal, `None` before `start`.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        let start = self.start_time?;
        let end = self.end_time.unwrap_or(now);
        Some((end - start).to_std().unwrap_or(Duration::ZERO))
    }

    fn transition(&mut self, target: LifecycleState) {
        if !self.can_transition(target) {
            panic!(
                "tracker {}: illegal transition {} -> {}",
                self.name, self.state, target
            );
        }
        self.state = target;
    }
}

/// Point-in-time copy of a tracker, as seen by observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerView {
    pub name: String,
    pub state: LifecycleState,
    pub elapsed: Option<Duration>,
    pub error_message: Option<String>,
}

impl TrackerView {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Tracker handle shared between its owning unit and the monitor.
///
/// Only the owning unit calls the mutators. Each mutation runs under the
/// write lock, so a snapshot never sees a state without its timestamps.
#[derive(Debug, Clone)]
pub struct SharedTracker {
    inner: Arc<RwLock<LifecycleTracker>>,
}

impl SharedTracker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(LifecycleTracker::new(name))),
        }
    }

    pub async fn start(&self) {
        self.inner.write().await.start();
    }

    pub async fn advance(&self, next: LifecycleState) {
        self.inner.write().await.advance(next);
    }

    pub async fn complete(&self) {
        self.inner.write().await.complete();
    }

    pub async fn fail(&self, message: impl Into<String>) {
        self.inner.write().await.fail(message);
    }

    /// Fail unless already terminal. Returns whether the tracker changed.
    pub async fn fail_if_running(&self, message: impl Into<String>) -> bool {
        let mut tracker = self.inner.write().await;
        if tracker.is_terminal() {
            return false;
        }
        tracker.fail(message);
        true
    }

    pub async fn state(&self) -> LifecycleState {
        self.inner.read().await.state()
    }

    pub async fn duration(&self) -> Option<Duration> {
        self.inner.read().await.duration()
    }

    /// Full copy of the underlying tracker.
    pub async fn tracker(&self) -> LifecycleTracker {
        self.inner.read().await.clone()
    }

    pub async fn snapshot(&self) -> TrackerView {
        let tracker = self.inner.read().await;
        TrackerView {
            name: tracker.name().to_string(),
            state: tracker.state(),
            elapsed: tracker.elapsed(Utc::now()),
            error_message: tracker.error_message.clone(),
        }
    }
}
