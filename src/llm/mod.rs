//! LLM Gateway Layer - the single point of contact with the model service
//!
//! This module provides:
//! - Request, response and error types
//! - LlmGateway trait for API abstraction
//! - GroqClient implementation (OpenAI-compatible chat completions)
//! - Rate-limit retry decorator
//! - EchoGateway for offline runs

pub mod client;
pub mod groq;
pub mod retry;
pub mod types;

pub use client::{EchoGateway, LlmGateway};
pub use groq::{GroqClient, GroqConfig};
pub use retry::{RetryPolicy, RetryingGateway};
pub use types::{
    CompletionOptions, CompletionRequest, CompletionResponse, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, GatewayError,
    StopReason, Usage,
};
