//! Orchestration results.
//!
//! A dispatch produces one [`TaskResult`] per selected task, collected in an
//! [`OrchestrationReport`]. Failed units are ordinary entries with
//! `succeeded == false`, zero provenance and a diagnostic body.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::catalog::TaskCatalog;
use crate::error::TaskExecutionError;
use crate::provenance::ProvenanceWeights;

fn duration_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Outcome of one unit of work.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskResult {
    pub task_name: String,
    pub content: String,
    pub provenance: ProvenanceWeights,
    pub succeeded: bool,
    #[serde(serialize_with = "duration_secs")]
    pub duration: Duration,
    pub error: Option<String>,
}

impl TaskResult {
    pub fn success(
        task_name: &str,
        content: String,
        provenance: ProvenanceWeights,
        duration: Duration,
    ) -> Self {
        Self {
            task_name: task_name.to_string(),
            content,
            provenance,
            succeeded: true,
            duration,
            error: None,
        }
    }

    /// A failed result with a placeholder body naming the task.
    pub fn failure(task_name: &str, error: &TaskExecutionError, duration: Duration) -> Self {
        let message = error.to_string();
        Self {
            task_name: task_name.to_string(),
            content: format!("Error generating {}: {}", task_name, message),
            provenance: ProvenanceWeights::ZERO,
            succeeded: false,
            duration,
            error: Some(message),
        }
    }
}

/// One result per dispatched task, keyed by task name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrchestrationReport {
    results: HashMap<String, TaskResult>,
}

impl OrchestrationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a result, replacing any previous one for the same task.
    pub fn insert(&mut self, result: TaskResult) {
        self.results.insert(result.task_name.clone(), result);
    }

    pub fn get(&self, task_name: &str) -> Option<&TaskResult> {
        self.results.get(task_name)
    }

    pub fn contains(&self, task_name: &str) -> bool {
        self.results.contains_key(task_name)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// All results, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &TaskResult> {
        self.results.values()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &TaskResult> {
        self.iter().filter(|r| r.succeeded)
    }

    pub fn failed(&self) -> impl Iterator<Item = &TaskResult> {
        self.iter().filter(|r| !r.succeeded)
    }

    /// Results in catalog order. Tasks outside the catalog are left out.
    pub fn ordered<'a>(&'a self, catalog: &TaskCatalog) -> Vec<&'a TaskResult> {
        catalog.names().filter_map(|name| self.get(name)).collect()
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary::from_results(self.iter())
    }
}

/// Aggregate statistics over a report.
///
/// Averages cover successful results only; `total_duration` covers all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub success_rate: f64,
    #[serde(serialize_with = "duration_secs")]
    pub average_duration: Duration,
    #[serde(serialize_with = "duration_secs")]
    pub total_duration: Duration,
    pub average_provenance: ProvenanceWeights,
}

impl ReportSummary {
    fn from_results<'a>(results: impl Iterator<Item = &'a TaskResult>) -> Self {
        let mut total = 0;
        let mut succeeded = 0;
        let mut total_duration = Duration::ZERO;
        let mut success_duration = Duration::ZERO;
        let mut provenance = ProvenanceWeights::ZERO;

        for result in results {
            total += 1;
            total_duration += result.duration;
            if result.succeeded {
                succeeded += 1;
                success_duration += result.duration;
                provenance.local += result.provenance.local;
                provenance.world += result.provenance.world;
                provenance.online += result.provenance.online;
            }
        }

        let (average_duration, average_provenance) = if succeeded == 0 {
            (Duration::ZERO, ProvenanceWeights::ZERO)
        } else {
            let n = succeeded as f64;
            (
                success_duration / succeeded as u32,
                ProvenanceWeights {
                    local: provenance.local / n,
                    world: provenance.world / n,
                    online: provenance.online / n,
                },
            )
        };

        Self {
            total,
            succeeded,
            failed: total - succeeded,
            success_rate: if total == 0 {
                0.0
            } else {
                succeeded as f64 / total as f64
            },
            average_duration,
            total_duration,
            average_provenance,
        }
    }
}
