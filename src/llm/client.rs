//! Core gateway trait and the offline echo implementation

use async_trait::async_trait;

use super::types::{CompletionRequest, CompletionResponse, GatewayError};

/// Stateless LLM gateway - each call is independent (fresh context)
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, GatewayError>;

    /// Short identifier used in logs
    fn name(&self) -> &str;
}

/// Gateway that answers every request with its own prompt.
///
/// Used by `compare --dry-run` to inspect rendered prompts without a network
/// call, and by tests to check templating end to end.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoGateway;

#[async_trait]
impl LlmGateway for EchoGateway {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, GatewayError> {
        Ok(CompletionResponse::text(request.prompt))
    }

    fn name(&self) -> &str {
        "echo"
    }
}
