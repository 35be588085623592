//! HTTP client for a local Ollama server.
//!
//! Only the single-prompt `/api/generate` endpoint is used.  Streamed
//! responses are consumed as newline-delimited JSON and forwarded fragment by
//! fragment to an optional callback, so conversational answers can be
//! printed while they are generated.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Value, json};

use crate::error::{AgentError, Result};
use crate::llm::stream::{NdjsonAccumulator, parse_complete_response};
use crate::llm::types::GenerateRequest;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default Ollama base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "qwen2.5:1.5b-instruct";

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Callback invoked with each streamed text fragment.
pub type TokenCallback = dyn Fn(&str) + Send + Sync;

/// A text-generation backend.
///
/// Implemented by [`OllamaClient`] for production use and by hand-written
/// mocks in tests.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for `request`.
    ///
    /// When `on_token` is given and the request streams, it is called with
    /// every fragment as it arrives.  The full text is returned either way.
    async fn generate(
        &self,
        request: &GenerateRequest,
        on_token: Option<&TokenCallback>,
    ) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection settings for [`OllamaClient`].
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Server base URL, without a trailing `/api`.
    pub base_url: String,
    /// Model used when a request does not name one.
    pub default_model: String,
    /// Whole-request timeout, including the streamed body.
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            default_model: DEFAULT_MODEL.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl OllamaConfig {
    /// Settings for a server at `base_url` running `model`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            default_model: model.into(),
            ..Self::default()
        }
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for the Ollama `/api/generate` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    config: OllamaConfig,
    http: reqwest::Client,
}

impl OllamaClient {
    /// Create a client with the given settings.
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::LlmRequestFailed {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { config, http })
    }

    /// The configured settings.
    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Build the JSON body for `/api/generate`.
    pub fn build_request_body(&self, request: &GenerateRequest) -> Value {
        let model = request
            .model
            .as_deref()
            .unwrap_or(&self.config.default_model);

        json!({
            "model": model,
            "prompt": request.prompt.trim(),
            "stream": request.stream,
            "options": {
                "num_predict": request.max_tokens,
                "temperature": request.temperature,
            },
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.config.base_url.trim_end_matches('/'))
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response> {
        let url = self.endpoint();
        tracing::debug!(url = %url, model = %body["model"], "sending LLM request");

        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AgentError::LlmRequestFailed {
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AgentError::LlmRequestFailed {
                reason: format!("API returned {status}: {text}"),
            });
        }
        Ok(resp)
    }

    /// Consume an NDJSON body, forwarding fragments to `on_token`.
    async fn consume_stream(
        &self,
        resp: reqwest::Response,
        max_tokens: u32,
        on_token: Option<&TokenCallback>,
    ) -> Result<String> {
        let mut accumulator = NdjsonAccumulator::with_limit(max_tokens);

        let mut byte_stream = resp.bytes_stream();
        // Raw bytes: a chunk may end inside a multi-byte character.
        let mut line_buffer: Vec<u8> = Vec::new();

        while let Some(chunk_result) = byte_stream.next().await {
            let chunk = chunk_result.map_err(|e| AgentError::LlmStreamError {
                reason: format!("stream read error: {e}"),
            })?;

            line_buffer.extend_from_slice(&chunk);

            while let Some(newline_pos) = line_buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = line_buffer.drain(..=newline_pos).collect();
                let line = String::from_utf8(raw).map_err(|e| AgentError::LlmStreamError {
                    reason: format!("invalid UTF-8 in stream: {e}"),
                })?;

                if let Some(fragment) = accumulator.feed_line(&line)? {
                    if let Some(cb) = on_token {
                        cb(&fragment);
                    }
                }

                if accumulator.is_done() {
                    tracing::debug!(tokens = accumulator.token_count(), "LLM stream finished");
                    return Ok(accumulator.into_text());
                }
            }
        }

        // A final object without a trailing newline.
        let rest = String::from_utf8_lossy(&line_buffer);
        if let Some(fragment) = accumulator.feed_line(&rest)? {
            if let Some(cb) = on_token {
                cb(&fragment);
            }
        }

        Ok(accumulator.into_text())
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    #[tracing::instrument(skip_all, fields(max_tokens = request.max_tokens, stream = request.stream))]
    async fn generate(
        &self,
        request: &GenerateRequest,
        on_token: Option<&TokenCallback>,
    ) -> Result<String> {
        let body = self.build_request_body(request);
        let resp = self.send(&body).await?;

        if request.stream {
            return self.consume_stream(resp, request.max_tokens, on_token).await;
        }

        let v: Value = resp.json().await.map_err(|e| AgentError::LlmParseFailed {
            reason: format!("failed to decode response body: {e}"),
        })?;
        parse_complete_response(&v)
    }
}
