//! Stage definitions: the declarative table the executor walks.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::parse::parse_json_reply;
use super::state::StageValue;
use crate::error::Result;
use crate::prompt::PromptLoader;
use crate::prompt::templates::*;

/// Well-known state keys
pub mod keys {
    pub const DOC1: &str = "doc1";
    pub const DOC2: &str = "doc2";
    pub const STRUCTURAL_COMPARISON: &str = "structural_comparison";
    pub const SEMANTIC_COMPARISON: &str = "semantic_comparison";
    pub const FINAL_COMPARISON: &str = "final_comparison";
    pub const RISK_ANALYSIS: &str = "risk_analysis";
    pub const SUMMARY: &str = "summary";

    /// Keys present before the first stage runs
    pub const INITIAL: [&str; 2] = [DOC1, DOC2];
}

/// What a stage's reply is expected to contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// A JSON record; unparseable replies are kept as raw text
    Json,
    /// Free markdown, stored as-is
    Markdown,
}

impl OutputKind {
    pub fn parse(&self, stage: &str, reply: &str) -> StageValue {
        match self {
            OutputKind::Json => parse_json_reply(stage, reply),
            OutputKind::Markdown => StageValue::Text(reply.to_string()),
        }
    }
}

/// One named step: reads `inputs`, writes `output`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub name: String,
    pub inputs: Vec<String>,
    pub output: String,
    pub persona: String,
    pub template: String,
    pub kind: OutputKind,
}

impl Stage {
    pub fn new(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            output: output.into(),
            persona: String::new(),
            template: String::new(),
            kind: OutputKind::Markdown,
        }
    }

    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_kind(mut self, kind: OutputKind) -> Self {
        self.kind = kind;
        self
    }

    /// Variables referenced by `{{name}}`, `{{{name}}}` or `{{name.path}}`, in order
    /// of appearance. Block helpers and other expressions are skipped.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut found = Vec::new();
        let mut rest = self.template.as_str();
        while let Some(start) = rest.find("{{") {
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else { break };
            let expr = after[..end].trim_start_matches('{').trim();
            let name = expr.split('.').next().unwrap_or(expr).trim();
            if !name.is_empty()
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                && !found.contains(&name)
            {
                found.push(name);
            }
            rest = &after[end + 2..];
        }
        found
    }
}

/// The five comparison stages in execution order
pub fn default_stages() -> Vec<Stage> {
    use keys::*;

    vec![
        Stage::new("structural_analysis", STRUCTURAL_COMPARISON)
            .with_inputs([DOC1, DOC2])
            .with_persona(STRUCTURAL_PERSONA)
            .with_template(STRUCTURAL_TEMPLATE)
            .with_kind(OutputKind::Json),
        Stage::new("semantic_analysis", SEMANTIC_COMPARISON)
            .with_inputs([DOC1, DOC2])
            .with_persona(SEMANTIC_PERSONA)
            .with_template(SEMANTIC_TEMPLATE)
            .with_kind(OutputKind::Json),
        Stage::new("final_analysis", FINAL_COMPARISON)
            .with_inputs([STRUCTURAL_COMPARISON, SEMANTIC_COMPARISON])
            .with_persona(FINAL_PERSONA)
            .with_template(FINAL_TEMPLATE)
            .with_kind(OutputKind::Json),
        Stage::new("risk_analyzer", RISK_ANALYSIS)
            .with_inputs([DOC1, DOC2, STRUCTURAL_COMPARISON, SEMANTIC_COMPARISON, FINAL_COMPARISON])
            .with_persona(RISK_PERSONA)
            .with_template(RISK_TEMPLATE)
            .with_kind(OutputKind::Json),
        Stage::new("summary_generation", SUMMARY)
            .with_inputs([FINAL_COMPARISON, RISK_ANALYSIS])
            .with_persona(SUMMARY_PERSONA)
            .with_template(SUMMARY_TEMPLATE)
            .with_kind(OutputKind::Markdown),
    ]
}

/// Default stages with templates replaced by `<stage_name>.md` files from `prompts_dir`
pub fn load_stages(prompts_dir: Option<&Path>) -> Result<Vec<Stage>> {
    let mut stages = default_stages();
    let Some(dir) = prompts_dir else {
        return Ok(stages);
    };

    let loader = PromptLoader::new(dir);
    for stage in &mut stages {
        if let Some(template) = loader.load_optional(&stage.name)? {
            log::info!(
                "Using template override for stage '{}' from {}",
                stage.name,
                loader.template_path(&stage.name).display()
            );
            stage.template = template;
        }
    }
    Ok(stages)
}
