//! LLM types for gateway communication
//!
//! This module defines the request, response and error types exchanged with
//! the language model service.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Model used when the configuration does not name one
pub const DEFAULT_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";

/// Default max output tokens
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Fixed generation options sent with every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl CompletionOptions {
    /// Create options for a specific model with the default temperature and length
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }
}

/// Request to the LLM for completion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Persona / system prompt (may be empty)
    pub system: String,
    /// The rendered stage prompt
    pub prompt: String,
    pub options: CompletionOptions,
}

impl CompletionRequest {
    /// Create a new completion request for a prompt
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Set the system prompt
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    /// Set generation options
    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }
}

/// Response from the LLM
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub stop_reason: StopReason,
    pub usage: Usage,
}

impl CompletionResponse {
    /// A plain text response with no usage information
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Reason why the LLM stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    #[default]
    Stop,
    Length,
    Other,
}

impl StopReason {
    /// Map an OpenAI-style `finish_reason`
    pub fn from_finish_reason(reason: Option<&str>) -> Self {
        match reason {
            Some("stop") | None => StopReason::Stop,
            Some("length") => StopReason::Length,
            Some(_) => StopReason::Other,
        }
    }

    /// True when the output was cut off by the token limit
    pub fn is_truncated(&self) -> bool {
        matches!(self, StopReason::Length)
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    /// Create new usage stats
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Calculate total tokens
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// Accumulate usage from another instance
    pub fn add(&mut self, other: &Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Errors returned by an LLM gateway
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Only rate limiting is worth retrying; everything else is fatal for the run
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::RateLimited { .. })
    }

    /// Map a non-success HTTP status to the gateway taxonomy
    pub fn from_status(status: u16, message: impl Into<String>, retry_after: Duration) -> Self {
        let message = message.into();
        match status {
            401 | 403 => GatewayError::Auth(message),
            429 => GatewayError::RateLimited { retry_after },
            500..=599 => GatewayError::ServiceUnavailable(format!("status {}: {}", status, message)),
            _ => GatewayError::Rejected { status, message },
        }
    }
}
