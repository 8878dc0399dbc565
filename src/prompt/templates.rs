//! Built-in prompt templates, one per pipeline stage.
//!
//! Placeholders use Handlebars syntax and must name a key the stage declares
//! as an input. JSON shapes are shown without code fences so an echoed prompt
//! is never mistaken for a model answer.

pub const STRUCTURAL_PERSONA: &str = "You are a legal document structure analyzer.";

pub const STRUCTURAL_TEMPLATE: &str = r#"I have two versions of a legal document and need to understand how their structure changed.

# Document 1:
{{doc1}}

# Document 2:
{{doc2}}

Identify:
1. Sections present in Document 2 but not in Document 1
2. Sections present in Document 1 but missing from Document 2
3. Sections that moved to a different place or were renumbered

Respond with a single JSON object of this shape and nothing else:
{
  "added_sections": [ { "section": "section name", "content": "section text" } ],
  "removed_sections": [ { "section": "section name", "content": "section text" } ],
  "reorganized_sections": [ { "old_section": "old name", "new_section": "new name" } ]
}
"#;

pub const SEMANTIC_PERSONA: &str = "You are a legal document semantic analyzer.";

pub const SEMANTIC_TEMPLATE: &str = r#"I have two versions of a legal document and need to understand how their meaning changed.

# Document 1:
{{doc1}}

# Document 2:
{{doc2}}

Identify:
1. Changes to defined terms
2. Changes to the obligations of each party
3. Changes to conditions, requirements, amounts and deadlines

Respond with a single JSON object of this shape and nothing else:
{
  "term_changes": [ { "term": "term", "old_definition": "before", "new_definition": "after" } ],
  "obligation_changes": [ { "party": "party", "old_obligation": "before", "new_obligation": "after" } ],
  "condition_changes": [ { "condition": "condition", "old_text": "before", "new_text": "after" } ]
}
"#;

pub const FINAL_PERSONA: &str = "You are a legal document analysis expert.";

pub const FINAL_TEMPLATE: &str = r#"Structural and semantic analyses of two versions of a legal document are below.

# Structural Analysis:
{{structural_comparison}}

# Semantic Analysis:
{{semantic_comparison}}

Combine them into one assessment covering:
1. The most significant changes and their likely impact
2. How substantially the document changed overall
3. Inconsistencies or gaps the changes introduce

Respond with a single JSON object of this shape and nothing else:
{
  "significant_changes": [ { "category": "category", "description": "what changed", "impact": "why it matters" } ],
  "overall_assessment": "one paragraph",
  "potential_inconsistencies": [ { "description": "the problem", "location": "where it occurs" } ]
}
"#;

pub const RISK_PERSONA: &str = "You are a legal risk assessment expert.";

pub const RISK_TEMPLATE: &str = r#"Two versions of a legal document and the comparison analyses already performed on them are below.

# Document 1:
{{doc1}}

# Document 2:
{{doc2}}

# Structural Comparison:
{{structural_comparison}}

# Semantic Comparison:
{{semantic_comparison}}

# Final Comparison:
{{final_comparison}}

Assess the risks the changes introduce in four categories:
1. Legal risks (compliance, regulatory exposure, enforceability)
2. Business risks (liability, pricing, unfavorable terms)
3. Operational risks (new obligations, resourcing, deadlines)
4. Strategic risks (long-term implications, lock-in, competitive position)

For every risk give a description, an explanation of why it is a risk, a severity of Low, Medium or High, and a suggested mitigation.

Respond with a single JSON object of this shape and nothing else:
{
  "legal_risks": [ { "description": "risk", "explanation": "why", "severity": "High", "mitigation": "what to do" } ],
  "business_risks": [ ],
  "operational_risks": [ ],
  "strategic_risks": [ ]
}
"#;

pub const SUMMARY_PERSONA: &str = "You are a legal document summarization expert.";

pub const SUMMARY_TEMPLATE: &str = r#"Comparison and risk analyses of two versions of a legal document are below.

# Final Comparison:
{{final_comparison}}

# Risk Analysis:
{{risk_analysis}}

Write a professional markdown report of the changes and risks. Use exactly these second-level headings, in this order:
Executive Summary, Detailed Changes Analysis, Risk Assessment, Recommendations.

Executive Summary: what was compared, the most significant changes and the most critical risks.
Detailed Changes Analysis: structural changes, semantic changes and their impact.
Risk Assessment: legal, business, operational and strategic risks.
Recommendations: concrete actions to address the risks and areas that need further legal review.
"#;

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [&str; 5] = [
        STRUCTURAL_TEMPLATE,
        SEMANTIC_TEMPLATE,
        FINAL_TEMPLATE,
        RISK_TEMPLATE,
        SUMMARY_TEMPLATE,
    ];

    #[test]
    fn test_templates_have_no_code_fences() {
        for template in ALL {
            assert!(!template.contains("```"));
        }
    }

    #[test]
    fn test_templates_have_no_stray_closing_braces() {
        // Only placeholders may produce a double closing brace
        for template in ALL {
            let without_placeholders: String = template
                .split("{{")
                .enumerate()
                .map(|(i, part)| match part.find("}}") {
                    Some(end) if i > 0 => &part[end + 2..],
                    _ => part,
                })
                .collect();
            assert!(!without_placeholders.contains("}}"));
        }
    }

    #[test]
    fn test_summary_template_names_report_sections_in_order() {
        let exec = SUMMARY_TEMPLATE.find("Executive Summary").unwrap();
        let changes = SUMMARY_TEMPLATE.find("Detailed Changes Analysis").unwrap();
        let risk = SUMMARY_TEMPLATE.find("Risk Assessment").unwrap();
        let recs = SUMMARY_TEMPLATE.find("Recommendations").unwrap();
        assert!(exec < changes && changes < risk && risk < recs);
    }
}
