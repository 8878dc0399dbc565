//! End-to-end comparison of two documents: pipeline run, then report.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::config::Config;
use crate::document::Document;
use crate::error::Result;
use crate::llm::LlmGateway;
use crate::pipeline::{PipelineExecutor, PipelineState, RunMetadata, load_stages};
use crate::report::{Report, ReportFormatter};

/// Everything a finished comparison produced
#[derive(Debug, Clone)]
pub struct ComparisonOutcome {
    pub state: PipelineState,
    pub report: Report,
    pub metadata: RunMetadata,
}

#[derive(Serialize)]
struct StateDump<'a> {
    metadata: &'a RunMetadata,
    state: &'a PipelineState,
}

impl ComparisonOutcome {
    /// Pretty JSON of the run metadata and every state key
    pub fn state_json(&self) -> Result<String> {
        let dump = StateDump {
            metadata: &self.metadata,
            state: &self.state,
        };
        Ok(serde_json::to_string_pretty(&dump)?)
    }

    pub fn write_state_json(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.state_json()?)?;
        Ok(())
    }
}

pub struct ContractComparison {
    executor: PipelineExecutor,
    formatter: ReportFormatter,
}

impl ContractComparison {
    pub fn new(executor: PipelineExecutor, formatter: ReportFormatter) -> Self {
        Self { executor, formatter }
    }

    /// Build the default pipeline (with any template overrides) from configuration
    pub fn from_config(config: &Config, gateway: Arc<dyn LlmGateway>) -> Result<Self> {
        let stages = load_stages(config.prompts.dir.as_deref())?;
        let executor = PipelineExecutor::new(stages, gateway, config.llm.completion_options())?
            .with_stage_timeout(config.llm.timeout());
        Ok(Self::new(executor, ReportFormatter::new(config.report.title.clone())))
    }

    pub fn executor(&self) -> &PipelineExecutor {
        &self.executor
    }

    /// Run every stage and format the report. Any failure yields no report.
    pub async fn run(&self, doc1: &Document, doc2: &Document) -> Result<ComparisonOutcome> {
        let (state, metadata) = self.executor.run(doc1, doc2).await?;
        let report = self.formatter.format(&state)?;
        Ok(ComparisonOutcome {
            state,
            report,
            metadata,
        })
    }
}
