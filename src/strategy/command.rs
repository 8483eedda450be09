//! External generator process.
//!
//! [`CommandStrategy`] runs a text-generation CLI in headless mode
//! (`<command> -p <prompt> --output-format json`) and reads the JSON
//! envelope it prints on stdout.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::config::{GeneratorConfig, DEFAULT_GENERATOR_TIMEOUT_SECS, DEFAULT_OUTPUT_FORMAT};
use crate::error::{ConfigurationError, TaskExecutionError};

use super::{GenerationContext, GenerationStrategy, PromptBuilder};

/// Parsed generator output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorResponse {
    Success(String),
    Error(String),
}

impl GeneratorResponse {
    /// Parse the JSON envelope printed by the generator.
    ///
    /// `subtype` decides the outcome when present; otherwise an `error`
    /// field wins over a `result` field.
    pub fn parse_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: RawResponse = serde_json::from_str(json)?;
        let response = match raw.subtype.as_deref() {
            Some("success") => GeneratorResponse::Success(raw.result.unwrap_or_default()),
            Some(_) if raw.is_error.unwrap_or(true) => GeneratorResponse::Error(
                raw.error
                    .or(raw.result)
                    .unwrap_or_else(|| "generator reported an error".to_string()),
            ),
            _ => match (raw.error, raw.result) {
                (Some(error), _) => GeneratorResponse::Error(error),
                (None, Some(result)) => GeneratorResponse::Success(result),
                (None, None) => GeneratorResponse::Error("unknown response format".to_string()),
            },
        };
        Ok(response)
    }

    pub fn into_result(self) -> Result<String, TaskExecutionError> {
        match self {
            GeneratorResponse::Success(text) if text.trim().is_empty() => {
                Err(TaskExecutionError::EmptyOutput)
            }
            GeneratorResponse::Success(text) => Ok(text.trim().to_string()),
            GeneratorResponse::Error(message) => Err(TaskExecutionError::Generation(message)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    subtype: Option<String>,
    result: Option<String>,
    #[serde(default)]
    is_error: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

/// Strategy backed by an external generator binary.
#[derive(Debug, Clone)]
pub struct CommandStrategy {
    binary: PathBuf,
    args: Vec<String>,
    output_format: String,
    timeout: Duration,
    prompts: PromptBuilder,
}

impl CommandStrategy {
    /// Use an explicit binary, without a `PATH` lookup.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            args: Vec::new(),
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            timeout: Duration::from_secs(DEFAULT_GENERATOR_TIMEOUT_SECS),
            prompts: PromptBuilder::new(),
        }
    }

    /// Build from settings. The command is split on whitespace; the first
    /// word is resolved on `PATH` and the rest are passed before `-p`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSetting` if the command is empty or the binary
    /// cannot be found.
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, ConfigurationError> {
        let mut words = config.command.split_whitespace();
        let program = words.next().ok_or_else(|| {
            ConfigurationError::InvalidSetting("generator.command must not be empty".to_string())
        })?;
        let binary = which::which(program).map_err(|e| {
            ConfigurationError::InvalidSetting(format!("generator binary {}: {}", program, e))
        })?;

        Ok(Self::with_binary(binary)
            .with_args(words.map(str::to_string).collect())
            .with_output_format(&config.output_format)
            .with_timeout(config.timeout()))
    }

    /// Arguments placed before the prompt flags.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_output_format(mut self, format: &str) -> Self {
        self.output_format = format.to_string();
        self
    }

    /// Upper bound on one generator run.
    ///
    /// # Arguments
    ///
    /// * `timeout` - How long to wait before the child is killed and the
    ///   unit fails with `TaskExecutionError::Timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the generator on a prompt.
    ///
    /// # Errors
    ///
    /// - `Spawn` if the process cannot be started
    /// - `Timeout` if it runs longer than the configured timeout
    /// - `Generation` for error envelopes or a non-zero exit
    /// - `EmptyOutput` when it succeeds without text
    pub async fn run(&self, prompt: &str) -> Result<String, TaskExecutionError> {
        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.binary)
                .args(&self.args)
                .arg("-p")
                .arg(prompt)
                .arg("--output-format")
                .arg(&self.output_format)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| TaskExecutionError::Timeout(self.timeout))?
        .map_err(|e| TaskExecutionError::Spawn(format!("{}: {}", self.binary.display(), e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if let Ok(response) = GeneratorResponse::parse_json(stdout.trim()) {
            return response.into_result();
        }

        if !output.status.success() {
            let message = if stderr.trim().is_empty() {
                format!(
                    "generator exited with code {}",
                    output.status.code().unwrap_or(-1)
                )
            } else {
                stderr.trim().to_string()
            };
            return Err(TaskExecutionError::Generation(message));
        }

        GeneratorResponse::Success(stdout.into_owned()).into_result()
    }
}

#[async_trait]
impl GenerationStrategy for CommandStrategy {
    async fn generate(&self, ctx: &GenerationContext) -> Result<String, TaskExecutionError> {
        let prompt = self.prompts.build(ctx);
        tracing::debug!(
            task = %ctx.task_name(),
            prompt_chars = prompt.chars().count(),
            binary = %self.binary.display(),
            "running generator"
        );
        self.run(&prompt).await
    }
}
