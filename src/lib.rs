//! Concurrent multi-task content orchestration.
//!
//! A request selects tasks from a [`TaskCatalog`]. The [`Orchestrator`]
//! runs one unit of work per task through a [`GenerationStrategy`], tracks
//! each unit's lifecycle, optionally reports progress through a
//! [`ProgressMonitor`], and returns an [`OrchestrationReport`] holding one
//! result per task. Failed units never affect their siblings.

pub mod catalog;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod log;
pub mod monitor;
pub mod orchestrator;
pub mod provenance;
pub mod report;
pub mod strategy;

pub use catalog::{TaskCatalog, TaskDefinition, TaskProfile};
pub use config::Config;
pub use error::{ConfigurationError, Error, Result, TaskExecutionError};
pub use lifecycle::{LifecycleState, LifecycleTracker, SharedTracker};
pub use monitor::{MonitorHandle, ProgressMonitor, ProgressSnapshot};
pub use orchestrator::{OrchestrationRequest, Orchestrator};
pub use provenance::{ProvenanceScorer, ProvenanceWeights, SourceFlags};
pub use report::{OrchestrationReport, ReportSummary, TaskResult};
pub use strategy::{CommandStrategy, GenerationContext, GenerationStrategy};
