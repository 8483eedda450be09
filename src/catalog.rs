//! Task catalog.
//!
//! The catalog is the immutable registry of every task an orchestration
//! request may select. It is built once at startup and shared read-only
//! (behind an `Arc`) with the orchestrator.
//!
//! Each [`TaskDefinition`] carries a [`TaskProfile`]: the per-task record
//! that drives prompt construction, so one parameterized strategy serves
//! every task.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Default number of local corpus characters quoted into a prompt.
pub const DEFAULT_LOCAL_EXCERPT_CHARS: usize = 4000;

/// Default number of reference corpus characters quoted into a prompt.
pub const DEFAULT_REFERENCE_EXCERPT_CHARS: usize = 3000;

/// Per-task generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProfile {
    /// What the generator is asked to act as.
    pub role: String,
    /// Knowledge the generator should bring to the task.
    pub expertise: String,
    /// Numbered deliverables listed at the end of the prompt.
    pub requirements: Vec<String>,
    pub local_excerpt_chars: usize,
    /// Zero leaves the reference corpus out of the prompt.
    pub reference_excerpt_chars: usize,
}

impl TaskProfile {
    pub fn new(role: &str, expertise: &str) -> Self {
        Self {
            role: role.to_string(),
            expertise: expertise.to_string(),
            requirements: Vec::new(),
            local_excerpt_chars: DEFAULT_LOCAL_EXCERPT_CHARS,
            reference_excerpt_chars: 0,
        }
    }

    pub fn with_requirements(mut self, requirements: &[&str]) -> Self {
        self.requirements = requirements.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_excerpts(mut self, local_chars: usize, reference_chars: usize) -> Self {
        self.local_excerpt_chars = local_chars;
        self.reference_excerpt_chars = reference_chars;
        self
    }
}

/// One selectable unit of the final document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub name: String,
    pub description: String,
    pub profile: TaskProfile,
}

impl TaskDefinition {
    pub fn new(name: &str, description: &str, profile: TaskProfile) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            profile,
        }
    }
}

/// Immutable, ordered registry of task definitions.
#[derive(Debug, Clone)]
pub struct TaskCatalog {
    tasks: Vec<TaskDefinition>,
    index: HashMap<String, usize>,
}

impl TaskCatalog {
    /// Build a catalog, keeping the given order.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateTask` if two definitions share a name.
    pub fn new(tasks: Vec<TaskDefinition>) -> Result<Self, ConfigurationError> {
        let mut index = HashMap::with_capacity(tasks.len());
        for (position, task) in tasks.iter().enumerate() {
            if index.insert(task.name.clone(), position).is_some() {
                return Err(ConfigurationError::DuplicateTask(task.name.clone()));
            }
        }
        Ok(Self { tasks, index })
    }

    /// The ten sections of a services proposal.
    pub fn standard() -> Self {
        let tasks = standard_tasks();
        let index = tasks
            .iter()
            .enumerate()
            .map(|(position, task)| (task.name.clone(), position))
            .collect();
        Self { tasks, index }
    }

    pub fn get(&self, name: &str) -> Option<&TaskDefinition> {
        self.index.get(name).map(|&position| &self.tasks[position])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Position of a task in catalog order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskDefinition> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

fn standard_tasks() -> Vec<TaskDefinition> {
    vec![
        TaskDefinition::new(
            "Executive Summary",
            "Elevator pitch and summary of the proposal",
            TaskProfile::new(
                "proposal lead writing an executive summary",
                "industry best practices and AI implementation strategies",
            )
            .with_requirements(&[
                "Summarize the key value proposition",
                "Highlight the most important benefits",
                "Provide a clear call to action",
                "Keep it concise but impactful (3-4 paragraphs)",
            ])
            .with_excerpts(4000, 3000),
        ),
        TaskDefinition::new(
            "Problem Statement",
            "Problems, pain points, explicit asks, and latent needs",
            TaskProfile::new(
                "business analyst articulating the company's problems",
                "typical challenges faced by companies in this industry",
            )
            .with_requirements(&[
                "Explicit problems stated",
                "Implicit or latent needs",
                "Strategic pain points",
                "Operational challenges",
            ])
            .with_excerpts(2000, 0),
        ),
        TaskDefinition::new(
            "Industry Trends",
            "Relevant industry trends for company growth",
            TaskProfile::new(
                "industry analyst",
                "major industry trends and transformations",
            )
            .with_requirements(&[
                "Identify the trends most relevant to the company's growth",
                "Explain the impact of each trend",
            ])
            .with_excerpts(1500, 0),
        ),
        TaskDefinition::new(
            "Competition",
            "Competitive landscape and required responses",
            TaskProfile::new(
                "competitive intelligence analyst",
                "competitive AI adoption strategies in the industry",
            )
            .with_requirements(&[
                "Map the main competitors",
                "Describe the responses the company needs",
            ])
            .with_excerpts(2000, 0),
        ),
        TaskDefinition::new(
            "Market Segments",
            "Market segments and opportunity gaps",
            TaskProfile::new(
                "market strategist",
                "market segment characteristics and growth potential",
            )
            .with_requirements(&[
                "Describe the segments the company serves",
                "Identify opportunity gaps",
            ])
            .with_excerpts(2000, 0),
        ),
        TaskDefinition::new(
            "Technology Strategy",
            "Current technology and strategic recommendations",
            TaskProfile::new(
                "technology strategist",
                "modern technology patterns and best practices",
            )
            .with_requirements(&[
                "Assess the current technology stack",
                "Recommend strategic improvements",
            ])
            .with_excerpts(2000, 0),
        ),
        TaskDefinition::new(
            "AWS AI Services",
            "Matching AWS AI services to company needs",
            TaskProfile::new(
                "cloud solutions architect",
                "AWS AI service benefits and integration patterns",
            )
            .with_requirements(&[
                "Recommend specific services such as SageMaker, Bedrock and Comprehend",
                "Tie each service to a company need",
            ])
            .with_excerpts(2000, 3000),
        ),
        TaskDefinition::new(
            "Adoption Plan",
            "Timeline for AWS AI services adoption",
            TaskProfile::new(
                "delivery manager",
                "typical implementation timelines and milestones",
            )
            .with_requirements(&["Provide a quarterly timeline with milestones and deliverables"])
            .with_excerpts(2000, 2000),
        ),
        TaskDefinition::new(
            "Spend",
            "Monthly and annual spend predictions",
            TaskProfile::new(
                "cloud cost analyst",
                "typical AWS pricing models and volume estimates",
            )
            .with_requirements(&[
                "Provide monthly and annual spend estimates",
                "Break the spend down by service",
            ])
            .with_excerpts(1500, 2000),
        ),
        TaskDefinition::new(
            "Returns",
            "Spend vs returns and break-even analysis",
            TaskProfile::new(
                "financial analyst",
                "typical ROI metrics for AI implementations",
            )
            .with_requirements(&[
                "Show spend against returns over time",
                "Include a break-even analysis",
            ])
            .with_excerpts(1500, 0),
        ),
    ]
}
