//! Generation strategies.
//!
//! A [`GenerationStrategy`] produces the text for one task. The orchestrator
//! treats it as an opaque collaborator: it is called once per unit of work,
//! may take arbitrarily long, and may fail.
//!
//! One parameterized strategy serves every task. Per-task differences live
//! in the [`TaskProfile`](crate::catalog::TaskProfile) carried by the task
//! definition and are turned into a prompt by [`PromptBuilder`].

mod command;
mod prompt;

pub use command::{CommandStrategy, GeneratorResponse};
pub use prompt::{PromptBuilder, DEFAULT_SUBJECT};

use std::sync::Arc;

use async_trait::async_trait;

use crate::catalog::TaskDefinition;
use crate::error::TaskExecutionError;
use crate::provenance::SourceFlags;

/// Everything a strategy needs to generate one task.
///
/// The corpora are shared between all units of a dispatch.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    pub task: TaskDefinition,
    pub local_corpus: Arc<str>,
    pub reference_corpus: Arc<str>,
    pub flags: SourceFlags,
}

impl GenerationContext {
    pub fn task_name(&self) -> &str {
        &self.task.name
    }
}

/// Produces content for a single task.
#[async_trait]
pub trait GenerationStrategy: Send + Sync {
    /// Generate the text for `ctx.task`.
    ///
    /// # Errors
    ///
    /// Returns a [`TaskExecutionError`] describing why no content was
    /// produced. The orchestrator records it against this task only.
    async fn generate(&self, ctx: &GenerationContext) -> Result<String, TaskExecutionError>;
}

#[async_trait]
impl<S: GenerationStrategy + ?Sized> GenerationStrategy for Arc<S> {
    async fn generate(&self, ctx: &GenerationContext) -> Result<String, TaskExecutionError> {
        (**self).generate(ctx).await
    }
}
