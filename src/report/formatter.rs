//! Report Formatter - assembles a finished pipeline state into the markdown report

use std::fmt::Write as _;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::markdown::{close_open_fence, demote_headings, escape_cell, extract_section, inline};
use crate::analysis::{
    FinalComparison, RiskAnalysis, RiskCategory, SemanticComparison, StructuralComparison, decode,
};
use crate::error::Result;
use crate::pipeline::{PipelineState, StageValue, keys};

pub const DEFAULT_TITLE: &str = "Contract Comparison Report";

pub const EXECUTIVE_SUMMARY: &str = "Executive Summary";
pub const DETAILED_CHANGES: &str = "Detailed Changes Analysis";
pub const RISK_ASSESSMENT: &str = "Risk Assessment";
pub const RECOMMENDATIONS: &str = "Recommendations";

/// Top-level section titles in report order
pub const SECTION_TITLES: [&str; 4] = [EXECUTIVE_SUMMARY, DETAILED_CHANGES, RISK_ASSESSMENT, RECOMMENDATIONS];

const NO_RECOMMENDATIONS: &str = "No specific recommendations were identified.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSection {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub title: String,
    pub sections: Vec<ReportSection>,
}

impl Report {
    pub fn section(&self, title: &str) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.title == title)
    }

    pub fn to_markdown(&self) -> String {
        let mut out = format!("# {}\n", self.title);
        for section in &self.sections {
            out.push_str(&format!("\n## {}\n\n{}\n", section.title, section.body.trim()));
        }
        out
    }
}

/// Renders a final state into a [`Report`]. Pure: no clock, no I/O.
#[derive(Debug, Clone)]
pub struct ReportFormatter {
    title: String,
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE)
    }
}

impl ReportFormatter {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }

    pub fn format(&self, state: &PipelineState) -> Result<Report> {
        let summary = state.get(keys::SUMMARY)?.as_prompt_text();
        let structural = state.get(keys::STRUCTURAL_COMPARISON)?;
        let semantic = state.get(keys::SEMANTIC_COMPARISON)?;
        let final_comparison = state.get(keys::FINAL_COMPARISON)?;
        let risk = state.get(keys::RISK_ANALYSIS)?;

        let sections = vec![
            ReportSection {
                title: EXECUTIVE_SUMMARY.to_string(),
                body: executive_summary(&summary),
            },
            ReportSection {
                title: DETAILED_CHANGES.to_string(),
                body: detailed_changes(structural, semantic, final_comparison),
            },
            ReportSection {
                title: RISK_ASSESSMENT.to_string(),
                body: render_or_raw::<RiskAnalysis>(risk, 3, render_risks),
            },
            ReportSection {
                title: RECOMMENDATIONS.to_string(),
                body: recommendations(&summary, risk),
            },
        ];

        Ok(Report {
            title: self.title.clone(),
            sections,
        })
    }
}

fn executive_summary(summary: &str) -> String {
    let body = extract_section(summary, EXECUTIVE_SUMMARY).unwrap_or_else(|| summary.trim().to_string());
    model_text(&body, 3)
}

fn detailed_changes(structural: &StageValue, semantic: &StageValue, final_comparison: &StageValue) -> String {
    format!(
        "### Structural Changes\n\n{}\n\n### Semantic Changes\n\n{}\n\n### Impact Assessment\n\n{}",
        render_or_raw::<StructuralComparison>(structural, 4, render_structural),
        render_or_raw::<SemanticComparison>(semantic, 4, render_semantic),
        render_or_raw::<FinalComparison>(final_comparison, 4, render_impact),
    )
}

fn recommendations(summary: &str, risk: &StageValue) -> String {
    if let Some(body) = extract_section(summary, RECOMMENDATIONS) {
        return model_text(&body, 3);
    }

    let mitigations: Vec<String> = decode::<RiskAnalysis>(risk)
        .map(|analysis| {
            analysis
                .all()
                .filter(|(_, r)| !r.mitigation.trim().is_empty())
                .map(|(category, r)| format!("- {} ({}, {})", inline(&r.mitigation), category.name(), r.severity))
                .collect()
        })
        .unwrap_or_default();

    if mitigations.is_empty() {
        NO_RECOMMENDATIONS.to_string()
    } else {
        mitigations.join("\n")
    }
}

/// Model-written markdown made safe to nest under a report section
fn model_text(text: &str, min_level: usize) -> String {
    demote_headings(&close_open_fence(text), min_level)
}

/// Render a stage value through its typed record, or fall back to the raw
/// reply: text with headings demoted, unexpected JSON pretty-printed.
fn render_or_raw<T: DeserializeOwned>(value: &StageValue, min_level: usize, render: fn(&T) -> String) -> String {
    if let Some(record) = decode::<T>(value) {
        return render(&record);
    }
    match value {
        StageValue::Text(text) => model_text(text.trim(), min_level),
        StageValue::Structured(json) => {
            let pretty = serde_json::to_string_pretty(json).unwrap_or_else(|_| json.to_string());
            format!("```json\n{}\n```", pretty)
        }
    }
}

fn render_structural(s: &StructuralComparison) -> String {
    if s.is_empty() {
        return "No structural changes identified.".to_string();
    }
    let mut out = String::new();
    if !s.added_sections.is_empty() {
        out.push_str("**Added sections**\n\n");
        for c in &s.added_sections {
            let _ = writeln!(out, "- **{}**: {}", inline(&c.section), inline(&c.content));
        }
        out.push('\n');
    }
    if !s.removed_sections.is_empty() {
        out.push_str("**Removed sections**\n\n");
        for c in &s.removed_sections {
            let _ = writeln!(out, "- **{}**: {}", inline(&c.section), inline(&c.content));
        }
        out.push('\n');
    }
    if !s.reorganized_sections.is_empty() {
        out.push_str("**Reorganized sections**\n\n");
        for m in &s.reorganized_sections {
            let _ = writeln!(out, "- {} → {}", inline(&m.old_section), inline(&m.new_section));
        }
    }
    out.trim_end().to_string()
}

fn render_semantic(s: &SemanticComparison) -> String {
    if s.is_empty() {
        return "No semantic changes identified.".to_string();
    }
    let mut out = String::new();
    if !s.term_changes.is_empty() {
        out.push_str("**Term changes**\n\n");
        for c in &s.term_changes {
            let _ = writeln!(
                out,
                "- **{}**: {} → {}",
                inline(&c.term),
                inline(&c.old_definition),
                inline(&c.new_definition)
            );
        }
        out.push('\n');
    }
    if !s.obligation_changes.is_empty() {
        out.push_str("**Obligation changes**\n\n");
        for c in &s.obligation_changes {
            let _ = writeln!(
                out,
                "- **{}**: {} → {}",
                inline(&c.party),
                inline(&c.old_obligation),
                inline(&c.new_obligation)
            );
        }
        out.push('\n');
    }
    if !s.condition_changes.is_empty() {
        out.push_str("**Condition changes**\n\n");
        for c in &s.condition_changes {
            let _ = writeln!(
                out,
                "- **{}**: {} → {}",
                inline(&c.condition),
                inline(&c.old_text),
                inline(&c.new_text)
            );
        }
    }
    out.trim_end().to_string()
}

fn render_impact(f: &FinalComparison) -> String {
    if f.is_empty() {
        return "No impact assessment available.".to_string();
    }
    let mut out = String::new();
    if !f.overall_assessment.trim().is_empty() {
        out.push_str(&close_open_fence(f.overall_assessment.trim()));
        out.push_str("\n\n");
    }
    if !f.significant_changes.is_empty() {
        out.push_str("**Significant changes**\n\n");
        for c in &f.significant_changes {
            let _ = write!(out, "- **{}**: {}", inline(&c.category), inline(&c.description));
            if !c.impact.trim().is_empty() {
                let _ = write!(out, " _Impact:_ {}", inline(&c.impact));
            }
            out.push('\n');
        }
        out.push('\n');
    }
    if !f.potential_inconsistencies.is_empty() {
        out.push_str("**Potential inconsistencies**\n\n");
        for i in &f.potential_inconsistencies {
            if i.location.trim().is_empty() {
                let _ = writeln!(out, "- {}", inline(&i.description));
            } else {
                let _ = writeln!(out, "- {} ({})", inline(&i.description), inline(&i.location));
            }
        }
    }
    out.trim_end().to_string()
}

fn render_risks(analysis: &RiskAnalysis) -> String {
    let mut out = String::new();

    let counts = analysis.severity_counts();
    if counts.is_empty() {
        out.push_str("**Severity overview:** no risks identified.\n");
    } else {
        let overview: Vec<String> = counts.iter().map(|(s, n)| format!("{}: {}", s, n)).collect();
        let _ = writeln!(
            out,
            "**Severity overview:** {} ({} total)",
            overview.join(", "),
            analysis.len()
        );
    }

    for category in RiskCategory::ALL {
        let _ = write!(out, "\n### {} Risks\n\n", category.name());
        let risks = analysis.risks(category);
        if risks.is_empty() {
            let _ = writeln!(out, "No {} risks identified.", category.name().to_lowercase());
            continue;
        }
        out.push_str("| Severity | Risk | Explanation | Mitigation |\n");
        out.push_str("|----------|------|-------------|------------|\n");
        for risk in risks {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                risk.severity,
                escape_cell(&risk.description),
                escape_cell(&risk.explanation),
                escape_cell(&risk.mitigation)
            );
        }
    }
    out.trim_end().to_string()
}
