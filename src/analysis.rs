//! Typed views over the JSON records the analysis stages ask the model for.
//!
//! Every field defaults when absent so a partially filled reply still decodes.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pipeline::StageValue;

/// Decode a structured stage value into one of the record types below.
///
/// Returns None for text values and for JSON that does not fit the record.
pub fn decode<T: DeserializeOwned>(value: &StageValue) -> Option<T> {
    let json = value.as_structured()?;
    if !json.is_object() {
        return None;
    }
    serde_json::from_value(json.clone()).ok()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionChange {
    pub section: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionMove {
    pub old_section: String,
    pub new_section: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuralComparison {
    pub added_sections: Vec<SectionChange>,
    pub removed_sections: Vec<SectionChange>,
    pub reorganized_sections: Vec<SectionMove>,
}

impl StructuralComparison {
    pub fn is_empty(&self) -> bool {
        self.added_sections.is_empty() && self.removed_sections.is_empty() && self.reorganized_sections.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TermChange {
    pub term: String,
    pub old_definition: String,
    pub new_definition: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObligationChange {
    pub party: String,
    pub old_obligation: String,
    pub new_obligation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionChange {
    pub condition: String,
    pub old_text: String,
    pub new_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticComparison {
    pub term_changes: Vec<TermChange>,
    pub obligation_changes: Vec<ObligationChange>,
    pub condition_changes: Vec<ConditionChange>,
}

impl SemanticComparison {
    pub fn is_empty(&self) -> bool {
        self.term_changes.is_empty() && self.obligation_changes.is_empty() && self.condition_changes.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignificantChange {
    pub category: String,
    pub description: String,
    pub impact: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Inconsistency {
    pub description: String,
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalComparison {
    pub significant_changes: Vec<SignificantChange>,
    pub overall_assessment: String,
    pub potential_inconsistencies: Vec<Inconsistency>,
}

impl FinalComparison {
    pub fn is_empty(&self) -> bool {
        self.significant_changes.is_empty()
            && self.overall_assessment.trim().is_empty()
            && self.potential_inconsistencies.is_empty()
    }
}

/// Risk severity as reported by the model. Matching is case-insensitive;
/// anything unrecognised (including a missing value) is `Unknown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Value")]
pub enum Severity {
    #[default]
    Unknown,
    Low,
    Medium,
    High,
}

impl Severity {
    /// Highest first
    pub const ALL: [Severity; 4] = [Severity::High, Severity::Medium, Severity::Low, Severity::Unknown];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
            Severity::Unknown => "Unknown",
        }
    }
}

impl From<&str> for Severity {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "critical" => Severity::High,
            "medium" | "moderate" => Severity::Medium,
            "low" => Severity::Low,
            _ => Severity::Unknown,
        }
    }
}

impl From<Value> for Severity {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Severity::from(s.as_str()),
            _ => Severity::Unknown,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Risk {
    pub description: String,
    pub explanation: String,
    pub severity: Severity,
    pub mitigation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskCategory {
    Legal,
    Business,
    Operational,
    Strategic,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 4] = [
        RiskCategory::Legal,
        RiskCategory::Business,
        RiskCategory::Operational,
        RiskCategory::Strategic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RiskCategory::Legal => "Legal",
            RiskCategory::Business => "Business",
            RiskCategory::Operational => "Operational",
            RiskCategory::Strategic => "Strategic",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskAnalysis {
    pub legal_risks: Vec<Risk>,
    pub business_risks: Vec<Risk>,
    pub operational_risks: Vec<Risk>,
    pub strategic_risks: Vec<Risk>,
}

impl RiskAnalysis {
    pub fn risks(&self, category: RiskCategory) -> &[Risk] {
        match category {
            RiskCategory::Legal => &self.legal_risks,
            RiskCategory::Business => &self.business_risks,
            RiskCategory::Operational => &self.operational_risks,
            RiskCategory::Strategic => &self.strategic_risks,
        }
    }

    /// Every risk with its category, in category order
    pub fn all(&self) -> impl Iterator<Item = (RiskCategory, &Risk)> {
        RiskCategory::ALL
            .into_iter()
            .flat_map(move |category| self.risks(category).iter().map(move |risk| (category, risk)))
    }

    pub fn len(&self) -> usize {
        self.all().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of risks per severity, highest first, omitting zero counts
    pub fn severity_counts(&self) -> Vec<(Severity, usize)> {
        Severity::ALL
            .into_iter()
            .map(|severity| (severity, self.all().filter(|(_, r)| r.severity == severity).count()))
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}
