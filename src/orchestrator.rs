//! Fan-out/fan-in dispatch of task units.
//!
//! [`Orchestrator::dispatch`] validates a request, starts one tracked unit
//! of work per selected task, waits for every unit to reach a terminal
//! state and returns one [`TaskResult`] per task.
//!
//! Units are isolated: a strategy error or a panic in one unit is caught at
//! that unit's boundary and recorded as a failed result. Siblings keep
//! running. There is no way to cancel an in-flight unit and the core adds
//! no timeout; a strategy that never returns holds up the fan-in.

use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::{TaskCatalog, TaskDefinition};
use crate::config::{Config, DEFAULT_POLL_INTERVAL_MS};
use crate::error::{ConfigurationError, Error, TaskExecutionError};
use crate::lifecycle::{LifecycleState, SharedTracker};
use crate::monitor::{self, ProgressMonitor, ProgressSnapshot};
use crate::provenance::{ProvenanceScorer, SourceFlags};
use crate::report::{OrchestrationReport, TaskResult};
use crate::strategy::{GenerationContext, GenerationStrategy};

/// Tasks to run and the inputs they share.
#[derive(Debug, Clone)]
pub struct OrchestrationRequest {
    /// Selected task names. Repeats collapse to one unit.
    pub selected: Vec<String>,
    pub local_corpus: Arc<str>,
    pub reference_corpus: Arc<str>,
    pub flags: SourceFlags,
}

impl OrchestrationRequest {
    pub fn new<I, S>(selected: I, flags: SourceFlags) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selected: selected.into_iter().map(Into::into).collect(),
            local_corpus: Arc::from(""),
            reference_corpus: Arc::from(""),
            flags,
        }
    }

    /// Select every task in the catalog.
    pub fn all(catalog: &TaskCatalog, flags: SourceFlags) -> Self {
        Self::new(catalog.names(), flags)
    }

    pub fn with_local_corpus(mut self, corpus: impl Into<Arc<str>>) -> Self {
        self.local_corpus = corpus.into();
        self
    }

    pub fn with_reference_corpus(mut self, corpus: impl Into<Arc<str>>) -> Self {
        self.reference_corpus = corpus.into();
        self
    }
}

/// Dispatches requests against a catalog with one generation strategy.
#[derive(Clone)]
pub struct Orchestrator {
    catalog: Arc<TaskCatalog>,
    strategy: Arc<dyn GenerationStrategy>,
    scorer: Arc<ProvenanceScorer>,
    poll_interval: Duration,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("tasks", &self.catalog.len())
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(catalog: Arc<TaskCatalog>, strategy: Arc<dyn GenerationStrategy>) -> Self {
        Self {
            catalog,
            strategy,
            scorer: Arc::new(ProvenanceScorer::default()),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Use the scoring constants and poll interval from `config`.
    pub fn from_config(
        catalog: Arc<TaskCatalog>,
        strategy: Arc<dyn GenerationStrategy>,
        config: &Config,
    ) -> Self {
        Self::new(catalog, strategy)
            .with_scorer(ProvenanceScorer::new(config.scoring.clone()))
            .with_poll_interval(config.poll_interval())
    }

    pub fn with_scorer(mut self, scorer: ProvenanceScorer) -> Self {
        self.scorer = Arc::new(scorer);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    /// Check a request and resolve its task definitions, in selection order.
    ///
    /// # Errors
    ///
    /// - `EmptySelection` when no task is selected
    /// - `UnknownTask` for the first name missing from the catalog
    /// - `NoSourceEnabled` when every source flag is off
    pub fn validate(
        &self,
        request: &OrchestrationRequest,
    ) -> Result<Vec<TaskDefinition>, ConfigurationError> {
        if request.selected.is_empty() {
            return Err(ConfigurationError::EmptySelection);
        }

        let mut seen = HashSet::new();
        let mut tasks = Vec::with_capacity(request.selected.len());
        for name in &request.selected {
            let task = self
                .catalog
                .get(name)
                .ok_or_else(|| ConfigurationError::UnknownTask(name.clone()))?;
            if seen.insert(name.as_str()) {
                tasks.push(task.clone());
            }
        }

        if !request.flags.any() {
            return Err(ConfigurationError::NoSourceEnabled);
        }

        Ok(tasks)
    }

    /// Run every selected task and collect one result per task.
    ///
    /// # Errors
    ///
    /// Only configuration errors are returned, before any unit starts.
    /// Unit failures are recorded in the report.
    pub async fn dispatch(
        &self,
        request: OrchestrationRequest,
    ) -> Result<OrchestrationReport, ConfigurationError> {
        self.run(request, None).await
    }

    /// Like [`dispatch`](Self::dispatch), with a progress monitor sending
    /// snapshots to `sink`.
    ///
    /// The last snapshot shows every unit terminal. Cancelling `cancel`
    /// stops the snapshots, including that last one, but never the units.
    pub async fn dispatch_with_progress(
        &self,
        request: OrchestrationRequest,
        sink: mpsc::UnboundedSender<ProgressSnapshot>,
        cancel: CancellationToken,
    ) -> Result<OrchestrationReport, ConfigurationError> {
        self.run(request, Some((sink, cancel))).await
    }

    async fn run(
        &self,
        request: OrchestrationRequest,
        progress: Option<(mpsc::UnboundedSender<ProgressSnapshot>, CancellationToken)>,
    ) -> Result<OrchestrationReport, ConfigurationError> {
        let tasks = self.validate(&request)?;
        let dispatch_id = Uuid::new_v4();
        info!(
            dispatch_id = %dispatch_id,
            units = tasks.len(),
            sources = %request.flags.labels().join(","),
            "dispatch started"
        );

        let mut trackers = Vec::with_capacity(tasks.len());
        for task in &tasks {
            let tracker = SharedTracker::new(task.name.clone());
            tracker.start().await;
            trackers.push(tracker);
        }

        let running_monitor = progress.map(|(sink, cancel)| {
            let handle = ProgressMonitor::new(self.poll_interval).spawn_with_cancel(
                trackers.clone(),
                sink.clone(),
                cancel.child_token(),
            );
            (handle, sink, cancel)
        });

        let units: Vec<_> = tasks
            .into_iter()
            .zip(trackers.iter().cloned())
            .map(|(task, tracker)| {
                let name = task.name.clone();
                let ctx = GenerationContext {
                    task,
                    local_corpus: Arc::clone(&request.local_corpus),
                    reference_corpus: Arc::clone(&request.reference_corpus),
                    flags: request.flags,
                };
                let handle = tokio::spawn(run_unit(
                    Arc::clone(&self.strategy),
                    Arc::clone(&self.scorer),
                    ctx,
                    tracker.clone(),
                ));
                (name, tracker, handle)
            })
            .collect();

        let results = join_all(units.into_iter().map(|(name, tracker, handle)| async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    let err = TaskExecutionError::Panicked(join_error_message(e));
                    warn!(task = %name, error = %err, "unit aborted");
                    tracker.fail_if_running(err.to_string()).await;
                    let duration = tracker.duration().await.unwrap_or_default();
                    TaskResult::failure(&name, &err, duration)
                }
            }
        }))
        .await;

        let mut report = OrchestrationReport::new();
        for result in results {
            report.insert(result);
        }

        if let Some((handle, sink, cancel)) = running_monitor {
            handle.cancel();
            handle.join().await;
            if !cancel.is_cancelled() {
                let snapshot = monitor::observe(&trackers).await;
                if let Err(e) = sink.send(snapshot) {
                    let err = Error::MonitorObservation(e.to_string());
                    debug!(error = %err, "final snapshot not delivered");
                }
            }
        }

        let summary = report.summary();
        info!(
            dispatch_id = %dispatch_id,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "dispatch finished"
        );
        Ok(report)
    }
}

/// One unit of work. Strategy errors end here as a failed result.
async fn run_unit(
    strategy: Arc<dyn GenerationStrategy>,
    scorer: Arc<ProvenanceScorer>,
    ctx: GenerationContext,
    tracker: SharedTracker,
) -> TaskResult {
    let name = ctx.task.name.clone();

    tracker.advance(LifecycleState::Active).await;
    tracker.advance(LifecycleState::Processing).await;
    debug!(task = %name, state = %LifecycleState::Processing, "generating");

    match strategy.generate(&ctx).await {
        Ok(content) => {
            tracker.advance(LifecycleState::Completing).await;
            let provenance = scorer.compute(ctx.flags, &ctx.local_corpus);
            tracker.complete().await;
            let duration = tracker.duration().await.unwrap_or_default();
            debug!(
                task = %name,
                state = %LifecycleState::Completed,
                elapsed_ms = duration.as_millis() as u64,
                "unit completed"
            );
            TaskResult::success(&name, content, provenance, duration)
        }
        Err(err) => {
            warn!(task = %name, error = %err, "unit failed");
            tracker.fail(err.to_string()).await;
            let duration = tracker.duration().await.unwrap_or_default();
            TaskResult::failure(&name, &err, duration)
        }
    }
}

fn join_error_message(err: tokio::task::JoinError) -> String {
    if err.is_panic() {
        panic_message(err.into_panic())
    } else {
        err.to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => (*message).to_string(),
            Err(_) => "unknown panic".to_string(),
        },
    }
}
