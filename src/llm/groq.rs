//! Groq API client implementation
//!
//! This module implements the LlmGateway trait for Groq's OpenAI-compatible
//! chat completions endpoint. Any other OpenAI-compatible service works by
//! pointing `base_url` at it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::llm::client::LlmGateway;
use crate::llm::types::{CompletionRequest, CompletionResponse, GatewayError, StopReason, Usage};

/// Groq OpenAI-compatible API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Environment variable holding the API key
pub const DEFAULT_API_KEY_ENV: &str = "GROQ_API_KEY";

/// Used when a 429 carries no usable retry-after header
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Configuration for the Groq client
#[derive(Debug, Clone)]
pub struct GroqConfig {
    pub base_url: String,
    pub api_key_env: String,
    pub timeout: Duration,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Groq API client
pub struct GroqClient {
    client: Client,
    api_key: String,
    config: GroqConfig,
}

impl GroqClient {
    /// Create a new Groq client
    ///
    /// Reads the API key from the environment variable named in the config.
    /// A missing or empty key is an authentication error.
    pub fn new(config: GroqConfig) -> Result<Self, GatewayError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| GatewayError::Auth(format!("{} not set", config.api_key_env)))?;

        Self::with_api_key(api_key, config)
    }

    /// Create a client with an explicit API key
    pub fn with_api_key(api_key: String, config: GroqConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::ServiceUnavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Build the request body for the chat completions API
    fn build_request(&self, request: &CompletionRequest) -> Value {
        let mut messages = Vec::with_capacity(2);
        if !request.system.is_empty() {
            messages.push(json!({ "role": "system", "content": request.system }));
        }
        messages.push(json!({ "role": "user", "content": request.prompt }));

        json!({
            "model": request.options.model,
            "temperature": request.options.temperature,
            "max_tokens": request.options.max_tokens,
            "messages": messages
        })
    }

    /// Parse the API response into a CompletionResponse
    fn parse_response(&self, body: Value) -> Result<CompletionResponse, GatewayError> {
        let choice = body["choices"]
            .get(0)
            .ok_or_else(|| GatewayError::InvalidResponse("response has no choices".to_string()))?;

        let content = choice["message"]["content"]
            .as_str()
            .ok_or_else(|| GatewayError::InvalidResponse("choice has no message content".to_string()))?
            .to_string();

        let stop_reason = StopReason::from_finish_reason(choice["finish_reason"].as_str());

        let usage = match body.get("usage") {
            Some(u) => Usage::new(
                u["prompt_tokens"].as_u64().unwrap_or(0),
                u["completion_tokens"].as_u64().unwrap_or(0),
            ),
            None => Usage::default(),
        };

        Ok(CompletionResponse {
            content,
            stop_reason,
            usage,
        })
    }

    /// Send a request to the chat completions endpoint
    async fn send_request(&self, body: Value) -> Result<Value, GatewayError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::ServiceUnavailable(format!("request timed out after {:?}", self.config.timeout))
                } else {
                    GatewayError::ServiceUnavailable(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GatewayError::from_status(
                status.as_u16(),
                error_body,
                Duration::from_secs(retry_after),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl LlmGateway for GroqClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, GatewayError> {
        let body = self.build_request(&request);
        let response = self.send_request(body).await?;
        self.parse_response(response)
    }

    fn name(&self) -> &str {
        "groq"
    }
}

impl std::fmt::Debug for GroqClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqClient")
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::CompletionOptions;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn test_client(base_url: &str) -> GroqClient {
        let config = GroqConfig {
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(5),
            ..Default::default()
        };
        GroqClient::with_api_key("test-key".to_string(), config).unwrap()
    }

    fn http_response(status: &str, extra_headers: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n{}\r\n{}",
            status,
            body.len(),
            extra_headers,
            body
        )
    }

    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
                let body_len = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= pos + 4 + body_len {
                    return;
                }
            }
        }
    }

    /// Serve exactly one canned HTTP response and return the base URL
    async fn serve_once(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_config_default() {
        let config = GroqConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api_key_env, DEFAULT_API_KEY_ENV);
        assert_eq!(config.timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_client_without_api_key() {
        let config = GroqConfig {
            api_key_env: "REDLINE_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Default::default()
        };

        let result = GroqClient::new(config);
        assert!(matches!(result, Err(GatewayError::Auth(msg)) if msg.contains("REDLINE_TEST_KEY_THAT_IS_NEVER_SET")));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = test_client("http://localhost:9999/v1/");
        assert_eq!(client.endpoint(), "http://localhost:9999/v1/chat/completions");
    }

    #[test]
    fn test_build_request_basic() {
        let client = test_client(DEFAULT_BASE_URL);
        let request = CompletionRequest::new("Compare")
            .with_system("You are a legal analyst")
            .with_options(CompletionOptions::with_model("llama"));

        let body = client.build_request(&request);

        assert_eq!(body["model"], "llama");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["max_tokens"], crate::llm::DEFAULT_MAX_TOKENS);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Compare");
    }

    #[test]
    fn test_build_request_without_system() {
        let client = test_client(DEFAULT_BASE_URL);
        let body = client.build_request(&CompletionRequest::new("Hello"));

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
    }

    #[test]
    fn test_parse_response_text() {
        let client = test_client(DEFAULT_BASE_URL);
        let api_response = json!({
            "choices": [
                { "message": { "role": "assistant", "content": "No changes." }, "finish_reason": "stop" }
            ],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5 }
        });

        let response = client.parse_response(api_response).unwrap();

        assert_eq!(response.content, "No changes.");
        assert_eq!(response.stop_reason, StopReason::Stop);
        assert_eq!(response.usage, Usage::new(10, 5));
    }

    #[test]
    fn test_parse_response_truncated() {
        let client = test_client(DEFAULT_BASE_URL);
        let api_response = json!({
            "choices": [ { "message": { "content": "partial" }, "finish_reason": "length" } ]
        });

        let response = client.parse_response(api_response).unwrap();

        assert!(response.stop_reason.is_truncated());
        assert_eq!(response.usage.total(), 0);
    }

    #[test]
    fn test_parse_response_without_choices() {
        let client = test_client(DEFAULT_BASE_URL);
        let result = client.parse_response(json!({ "choices": [] }));
        assert!(matches!(result, Err(GatewayError::InvalidResponse(_))));
    }

    #[test]
    fn test_debug_impl_hides_key() {
        let client = test_client(DEFAULT_BASE_URL);
        let debug_str = format!("{:?}", client);
        assert!(debug_str.contains("GroqClient"));
        assert!(!debug_str.contains("test-key"));
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GroqClient>();
    }

    #[tokio::test]
    async fn test_complete_success_over_http() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"{\"added_sections\":[]}"},"finish_reason":"stop"}],"usage":{"prompt_tokens":3,"completion_tokens":4}}"#;
        let base_url = serve_once(http_response("200 OK", "", body)).await;
        let client = test_client(&base_url);

        let response = client.complete(CompletionRequest::new("hi")).await.unwrap();

        assert_eq!(response.content, r#"{"added_sections":[]}"#);
        assert_eq!(response.usage, Usage::new(3, 4));
    }

    #[tokio::test]
    async fn test_complete_maps_unauthorized_to_auth() {
        let base_url = serve_once(http_response("401 Unauthorized", "", r#"{"error":"bad key"}"#)).await;
        let client = test_client(&base_url);

        let result = client.complete(CompletionRequest::new("hi")).await;

        assert!(matches!(result, Err(GatewayError::Auth(msg)) if msg.contains("bad key")));
    }

    #[tokio::test]
    async fn test_complete_maps_429_with_retry_after() {
        let base_url = serve_once(http_response("429 Too Many Requests", "retry-after: 7\r\n", "{}")).await;
        let client = test_client(&base_url);

        let result = client.complete(CompletionRequest::new("hi")).await;

        assert!(matches!(
            result,
            Err(GatewayError::RateLimited { retry_after }) if retry_after == Duration::from_secs(7)
        ));
    }

    #[tokio::test]
    async fn test_complete_maps_5xx_to_service_unavailable() {
        let base_url = serve_once(http_response("503 Service Unavailable", "", "{}")).await;
        let client = test_client(&base_url);

        let result = client.complete(CompletionRequest::new("hi")).await;

        assert!(matches!(result, Err(GatewayError::ServiceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_complete_connection_refused_is_service_unavailable() {
        // Bind then drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = test_client(&format!("http://{}", addr));

        let result = client.complete(CompletionRequest::new("hi")).await;

        assert!(matches!(result, Err(GatewayError::ServiceUnavailable(_))));
    }
}
