//! End-to-end pipeline tests with deterministic gateways
//!
//! Runs the full five-stage comparison and report formatting without a network.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;

use redline::comparison::ContractComparison;
use redline::config::Config;
use redline::document::{Document, DocumentFormat};
use redline::error::RedlineError;
use redline::llm::{
    CompletionOptions, CompletionRequest, CompletionResponse, EchoGateway, GatewayError, LlmGateway, RetryPolicy,
    RetryingGateway,
};
use redline::pipeline::{PipelineExecutor, Stage, default_stages};
use redline::prompt::templates::{RISK_PERSONA, SUMMARY_PERSONA};
use redline::report::{DETAILED_CHANGES, EXECUTIVE_SUMMARY, RECOMMENDATIONS, RISK_ASSESSMENT, SECTION_TITLES};

const DOC1_MARKER: &str = "ALPHA-MARKER-1";
const DOC2_MARKER: &str = "OMEGA-MARKER-2";

fn txt(name: &str, text: &str) -> Document {
    Document::new(name, DocumentFormat::Txt, text)
}

fn sample_documents() -> (Document, Document) {
    (
        txt(
            "v1.txt",
            &format!("SERVICES AGREEMENT {}\n1. Fees\nClient pays $150 per hour.", DOC1_MARKER),
        ),
        txt(
            "v2.txt",
            &format!("SERVICES AGREEMENT {}\n1. Fees\nClient pays $175 per hour.", DOC2_MARKER),
        ),
    )
}

fn comparison_with(gateway: Arc<dyn LlmGateway>) -> ContractComparison {
    ContractComparison::from_config(&Config::default(), gateway).unwrap()
}

fn top_level_headings(markdown: &str) -> Vec<&str> {
    markdown.lines().filter_map(|l| l.strip_prefix("## ")).collect()
}

/// Text between `start` and the next `end` (or the end of the prompt)
fn between<'a>(prompt: &'a str, start: &str, end: &str) -> &'a str {
    let Some(from) = prompt.find(start) else { return "" };
    let rest = &prompt[from + start.len()..];
    let to = rest.find(end).unwrap_or(rest.len());
    rest[..to].trim()
}

/// Answers the risk stage by listing words that appear only in the revised
/// document; every other stage gets a minimal reply.
struct DiffGateway;

#[async_trait]
impl LlmGateway for DiffGateway {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, GatewayError> {
        let system = request.system.as_str();
        if system == RISK_PERSONA {
            let old = between(&request.prompt, "# Document 1:", "# Document 2:");
            let new = between(&request.prompt, "# Document 2:", "# Structural Comparison:");
            let old_words: HashSet<&str> = old.split_whitespace().collect();
            let added: Vec<&str> = new.split_whitespace().filter(|w| !old_words.contains(w)).collect();

            let reply = json!({
                "business_risks": [{
                    "description": format!("Changed terms: {}", added.join(" ")),
                    "explanation": "The revised document differs from the original",
                    "severity": "High",
                    "mitigation": "Confirm the new terms with the client"
                }]
            });
            return Ok(CompletionResponse::text(reply.to_string()));
        }
        if system == SUMMARY_PERSONA {
            return Ok(CompletionResponse::text("## Executive Summary\nPricing terms changed."));
        }
        Ok(CompletionResponse::text("{}"))
    }

    fn name(&self) -> &str {
        "diff"
    }
}

/// Fails once the given number of calls has succeeded
struct FailingGateway {
    succeed: usize,
    error: GatewayError,
    calls: AtomicUsize,
}

#[async_trait]
impl LlmGateway for FailingGateway {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, GatewayError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.succeed {
            Ok(CompletionResponse::text("{}"))
        } else {
            Err(self.error.clone())
        }
    }

    fn name(&self) -> &str {
        "failing"
    }
}

#[tokio::test]
async fn test_echo_run_report_has_sections_in_order() {
    let (doc1, doc2) = sample_documents();

    let outcome = comparison_with(Arc::new(EchoGateway)).run(&doc1, &doc2).await.unwrap();
    let markdown = outcome.report.to_markdown();

    assert_eq!(top_level_headings(&markdown), SECTION_TITLES.to_vec());
}

#[tokio::test]
async fn test_echo_run_carries_document_markers_into_report() {
    let (doc1, doc2) = sample_documents();

    let outcome = comparison_with(Arc::new(EchoGateway)).run(&doc1, &doc2).await.unwrap();

    for title in [EXECUTIVE_SUMMARY, DETAILED_CHANGES, RISK_ASSESSMENT] {
        let body = &outcome.report.section(title).unwrap().body;
        assert!(body.contains(DOC1_MARKER), "{} lacks first document marker", title);
        assert!(body.contains(DOC2_MARKER), "{} lacks second document marker", title);
    }
}

#[tokio::test]
async fn test_formatting_twice_is_identical() {
    let (doc1, doc2) = sample_documents();
    let comparison = comparison_with(Arc::new(EchoGateway));

    let first = comparison.run(&doc1, &doc2).await.unwrap();
    let second = comparison.run(&doc1, &doc2).await.unwrap();

    assert_eq!(first.report.to_markdown(), second.report.to_markdown());
    assert_eq!(first.state, second.state);
}

#[tokio::test]
async fn test_price_change_surfaces_in_risk_assessment() {
    let doc1 = txt("v1.txt", "The Client shall pay $150 per hour.");
    let doc2 = txt("v2.txt", "The Client shall pay $175 per hour.");

    let outcome = comparison_with(Arc::new(DiffGateway)).run(&doc1, &doc2).await.unwrap();

    let risk = &outcome.report.section(RISK_ASSESSMENT).unwrap().body;
    assert!(risk.contains("$175"), "risk section was:\n{}", risk);
    assert!(!risk.contains("$150"));
    assert_eq!(
        outcome.report.section(EXECUTIVE_SUMMARY).unwrap().body,
        "Pricing terms changed."
    );
    assert_eq!(
        outcome.report.section(RECOMMENDATIONS).unwrap().body,
        "- Confirm the new terms with the client (Business, High)"
    );
}

#[tokio::test]
async fn test_gateway_failure_yields_no_report() {
    let (doc1, doc2) = sample_documents();
    let gateway = Arc::new(FailingGateway {
        succeed: 3,
        error: GatewayError::Auth("invalid API key".to_string()),
        calls: AtomicUsize::new(0),
    });

    let result = comparison_with(gateway.clone()).run(&doc1, &doc2).await;

    let err = result.unwrap_err();
    assert!(matches!(err, RedlineError::Stage { ref stage, .. } if stage == "risk_analyzer"));
    assert!(matches!(err.gateway_error(), Some(GatewayError::Auth(_))));
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_rate_limit_exhaustion_surfaces_after_retries() {
    let (doc1, doc2) = sample_documents();
    let inner = FailingGateway {
        succeed: 0,
        error: GatewayError::RateLimited {
            retry_after: std::time::Duration::ZERO,
        },
        calls: AtomicUsize::new(0),
    };
    let policy = RetryPolicy {
        max_retries: 2,
        initial_backoff: std::time::Duration::from_millis(1),
        max_backoff: std::time::Duration::from_millis(2),
    };

    let result = comparison_with(Arc::new(RetryingGateway::new(inner, policy)))
        .run(&doc1, &doc2)
        .await;

    assert!(matches!(
        result,
        Err(RedlineError::Stage { ref stage, source: GatewayError::RateLimited { .. } }) if stage == "structural_analysis"
    ));
}

#[tokio::test]
async fn test_misordered_table_makes_no_calls() {
    let gateway = Arc::new(FailingGateway {
        succeed: usize::MAX,
        error: GatewayError::InvalidResponse("unused".to_string()),
        calls: AtomicUsize::new(0),
    });
    let mut stages = default_stages();
    stages.swap(0, 2);

    let result = PipelineExecutor::new(stages, gateway.clone(), CompletionOptions::default());

    assert!(matches!(
        result,
        Err(RedlineError::MissingDependency { ref stage, ref key }) if stage == "final_analysis" && key == "structural_comparison"
    ));
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_concurrent_runs_keep_separate_state() {
    let comparison = Arc::new(comparison_with(Arc::new(EchoGateway)));
    let pairs = [
        (txt("a1", "lease one"), txt("a2", "lease two")),
        (txt("b1", "loan one"), txt("b2", "loan two")),
    ];

    let handles: Vec<_> = pairs
        .into_iter()
        .map(|(doc1, doc2)| {
            let comparison = comparison.clone();
            tokio::spawn(async move {
                let outcome = comparison.run(&doc1, &doc2).await.unwrap();
                (doc1.text, outcome)
            })
        })
        .collect();

    for handle in handles {
        let (text, outcome) = handle.await.unwrap();
        assert_eq!(outcome.state.get("doc1").unwrap().as_text(), Some(text.as_str()));
        let other = if text.starts_with("lease") { "loan" } else { "lease" };
        assert!(!outcome.report.to_markdown().contains(other));
    }
}

#[tokio::test]
async fn test_custom_stage_table() {
    let stages = vec![
        Stage::new("diff", "diff")
            .with_inputs(["doc1", "doc2"])
            .with_template("{{doc1}} => {{doc2}}"),
    ];
    let executor = PipelineExecutor::new(stages, Arc::new(EchoGateway), CompletionOptions::default()).unwrap();

    let (state, metadata) = executor.run(&txt("a", "old"), &txt("b", "new")).await.unwrap();

    assert_eq!(state.get("diff").unwrap().as_text(), Some("old => new"));
    assert_eq!(metadata.stages.len(), 1);
}
