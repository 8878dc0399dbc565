//! Stage executor: walks the stage table in order, one gateway call per stage.
//!
//! The table is validated when the executor is built, so a misconfigured
//! pipeline fails before any request leaves the process.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stage::{Stage, keys};
use super::state::PipelineState;
use crate::document::Document;
use crate::error::{RedlineError, Result};
use crate::llm::{CompletionOptions, CompletionRequest, GatewayError, LlmGateway, Usage};
use crate::prompt::PromptRenderer;

/// Default time allowed for one stage's gateway call, retries included
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(300);

/// Timing and usage of one completed stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: String,
    pub output: String,
    pub elapsed_ms: u64,
    pub usage: Usage,
    /// The reply parsed as JSON
    pub structured: bool,
    /// The reply hit the token limit
    pub truncated: bool,
}

/// What happened during one run, in stage order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub gateway: String,
    pub model: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stages: Vec<StageTiming>,
    pub usage: Usage,
}

/// Check that every stage only reads keys produced before it.
pub fn validate_stages(stages: &[Stage]) -> Result<()> {
    let mut available: HashSet<&str> = keys::INITIAL.into_iter().collect();

    for stage in stages {
        if let Some(missing) = stage.inputs.iter().find(|key| !available.contains(key.as_str())) {
            return Err(RedlineError::MissingDependency {
                stage: stage.name.clone(),
                key: missing.clone(),
            });
        }

        if let Some(undeclared) = stage
            .placeholders()
            .into_iter()
            .find(|name| !stage.inputs.iter().any(|input| input == name))
        {
            return Err(RedlineError::Template(format!(
                "stage '{}' template references '{}' which is not a declared input",
                stage.name, undeclared
            )));
        }

        if !available.insert(stage.output.as_str()) {
            return Err(RedlineError::KeyAlreadySet(stage.output.clone()));
        }
    }

    Ok(())
}

/// Runs a fixed stage table against a gateway. Shareable across concurrent runs;
/// each run owns its own state.
pub struct PipelineExecutor {
    stages: Vec<Stage>,
    gateway: Arc<dyn LlmGateway>,
    renderer: PromptRenderer,
    options: CompletionOptions,
    stage_timeout: Duration,
}

impl PipelineExecutor {
    /// Validate the stage table and compile its templates
    pub fn new(stages: Vec<Stage>, gateway: Arc<dyn LlmGateway>, options: CompletionOptions) -> Result<Self> {
        validate_stages(&stages)?;

        let mut renderer = PromptRenderer::new();
        for stage in &stages {
            renderer.register_template(&stage.name, &stage.template)?;
            // Strict trial render with only the declared inputs bound
            let context: HashMap<String, String> =
                stage.inputs.iter().map(|key| (key.clone(), "-".to_string())).collect();
            renderer.render_named(&stage.name, &context).map_err(|e| {
                RedlineError::Template(format!("stage '{}' template reads an undeclared input: {}", stage.name, e))
            })?;
        }

        Ok(Self {
            stages,
            gateway,
            renderer,
            options,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
        })
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn options(&self) -> &CompletionOptions {
        &self.options
    }

    /// State holding the two documents under `doc1` and `doc2`
    pub fn initial_state(doc1: &Document, doc2: &Document) -> Result<PipelineState> {
        let mut state = PipelineState::new();
        state.set(keys::DOC1, doc1.text.as_str())?;
        state.set(keys::DOC2, doc2.text.as_str())?;
        Ok(state)
    }

    /// Compare two documents with a fresh state
    pub async fn run(&self, doc1: &Document, doc2: &Document) -> Result<(PipelineState, RunMetadata)> {
        log::info!(
            "Comparing '{}' ({}, {} chars) with '{}' ({}, {} chars)",
            doc1.name,
            doc1.format,
            doc1.text.len(),
            doc2.name,
            doc2.format,
            doc2.text.len()
        );
        self.execute(Self::initial_state(doc1, doc2)?).await
    }

    /// Run every stage in order against an existing state
    pub async fn execute(&self, mut state: PipelineState) -> Result<(PipelineState, RunMetadata)> {
        let started_at = Utc::now();
        let mut timings = Vec::with_capacity(self.stages.len());
        let mut usage = Usage::default();

        for stage in &self.stages {
            let timing = self.run_stage(stage, &mut state).await?;
            usage.add(&timing.usage);
            timings.push(timing);
        }

        let metadata = RunMetadata {
            gateway: self.gateway.name().to_string(),
            model: self.options.model.clone(),
            started_at,
            finished_at: Utc::now(),
            stages: timings,
            usage,
        };
        log::info!(
            "Pipeline finished: {} stages, {} tokens",
            metadata.stages.len(),
            metadata.usage.total()
        );
        Ok((state, metadata))
    }

    /// Render a stage's prompt from the current state
    pub fn render_prompt(&self, stage: &Stage, state: &PipelineState) -> Result<String> {
        let mut context = HashMap::with_capacity(stage.inputs.len());
        for key in &stage.inputs {
            let value = state.get(key).map_err(|_| RedlineError::MissingDependency {
                stage: stage.name.clone(),
                key: key.clone(),
            })?;
            context.insert(key.clone(), value.as_prompt_text());
        }
        self.renderer.render_named(&stage.name, &context)
    }

    async fn run_stage(&self, stage: &Stage, state: &mut PipelineState) -> Result<StageTiming> {
        let prompt = self.render_prompt(stage, state)?;
        log::info!("Stage '{}' started ({} prompt chars)", stage.name, prompt.len());
        log::debug!("Stage '{}' prompt:\n{}", stage.name, prompt);

        let request = CompletionRequest::new(prompt)
            .with_system(stage.persona.clone())
            .with_options(self.options.clone());

        let started = Instant::now();
        let response = tokio::time::timeout(self.stage_timeout, self.gateway.complete(request))
            .await
            .unwrap_or_else(|_| {
                Err(GatewayError::ServiceUnavailable(format!(
                    "no response within {:?}",
                    self.stage_timeout
                )))
            })
            .map_err(|source| {
                log::error!("Stage '{}' failed: {}", stage.name, source);
                RedlineError::Stage {
                    stage: stage.name.clone(),
                    source,
                }
            })?;
        let elapsed = started.elapsed();

        if response.stop_reason.is_truncated() {
            log::warn!("Stage '{}' reply was cut off at the token limit", stage.name);
        }

        let value = stage.kind.parse(&stage.name, &response.content);
        let timing = StageTiming {
            stage: stage.name.clone(),
            output: stage.output.clone(),
            elapsed_ms: elapsed.as_millis() as u64,
            usage: response.usage,
            structured: value.is_structured(),
            truncated: response.stop_reason.is_truncated(),
        };
        state.set(stage.output.clone(), value)?;

        log::info!(
            "Stage '{}' completed in {:?} ({} tokens)",
            stage.name,
            elapsed,
            timing.usage.total()
        );
        Ok(timing)
    }
}
