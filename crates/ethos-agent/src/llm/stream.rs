//! Accumulator for Ollama's newline-delimited JSON stream.
//!
//! `/api/generate` with `"stream": true` answers with one JSON object per
//! line:
//!
//! ```text
//! {"model":"qwen2.5","response":"Hel","done":false}
//! {"model":"qwen2.5","response":"lo","done":false}
//! {"model":"qwen2.5","response":"","done":true,"eval_count":2}
//! ```
//!
//! Each non-empty `response` fragment counts as one token towards the
//! request's cap.

use serde_json::Value;

use crate::error::{AgentError, Result};

/// Collects fragments from an NDJSON stream into the full response text.
#[derive(Debug, Default)]
pub struct NdjsonAccumulator {
    text: String,
    tokens: u32,
    max_tokens: Option<u32>,
    done: bool,
}

impl NdjsonAccumulator {
    /// Create an accumulator with no token cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an accumulator that reports done after `max_tokens`
    /// fragments.
    pub fn with_limit(max_tokens: u32) -> Self {
        Self {
            max_tokens: Some(max_tokens),
            ..Self::default()
        }
    }

    /// Whether the stream has finished or the cap was reached.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Number of fragments accepted so far.
    pub fn token_count(&self) -> u32 {
        self.tokens
    }

    /// Feed one line from the stream.
    ///
    /// Returns `Ok(Some(fragment))` for a text fragment, `Ok(None)` for blank
    /// lines, unparseable lines and the terminal `done` object.  A line
    /// carrying an `error` field is returned as [`AgentError::Server`].
    pub fn feed_line(&mut self, line: &str) -> Result<Option<String>> {
        if self.done {
            return Ok(None);
        }

        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let v: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed stream line");
                return Ok(None);
            }
        };

        if let Some(message) = v["error"].as_str() {
            return Err(AgentError::Server {
                message: message.to_owned(),
            });
        }

        let mut fragment = None;
        if let Some(piece) = v["response"].as_str().filter(|p| !p.is_empty()) {
            self.text.push_str(piece);
            self.tokens += 1;
            fragment = Some(piece.to_owned());
        }

        if v["done"].as_bool().unwrap_or(false) {
            self.done = true;
        }
        if self.max_tokens.is_some_and(|max| self.tokens >= max) {
            tracing::debug!(tokens = self.tokens, "token cap reached, cutting stream");
            self.done = true;
        }

        Ok(fragment)
    }

    /// The accumulated text so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consume the accumulator and return the full text.
    pub fn into_text(self) -> String {
        self.text
    }
}

/// Extract the `response` field from a non-streamed `/api/generate` body.
pub fn parse_complete_response(body: &Value) -> Result<String> {
    if let Some(message) = body["error"].as_str() {
        return Err(AgentError::Server {
            message: message.to_owned(),
        });
    }
    body["response"]
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| AgentError::LlmParseFailed {
            reason: "missing `response` field".into(),
        })
}
