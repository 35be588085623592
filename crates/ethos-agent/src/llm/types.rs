//! Request type for single-prompt text generation.

use serde::{Deserialize, Serialize};

/// Default cap on generated tokens for conversational answers.
pub const DEFAULT_MAX_TOKENS: u32 = 200;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 1.0;

/// A single-prompt generation request.
///
/// The assistant never keeps a multi-turn history with the model: each
/// request carries one self-contained prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// The prompt text, sent as-is after trimming.
    pub prompt: String,

    /// Model identifier.  `None` uses the client's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Maximum number of streamed fragments to accept before cutting the
    /// response short.  Also forwarded to the server as `num_predict`.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,

    /// Whether to request a streamed (NDJSON) response.
    pub stream: bool,
}

impl GenerateRequest {
    /// A streamed request with default limits.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            stream: true,
        }
    }

    /// Override the token cap.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Override the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Target a specific model instead of the client default.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Request a single JSON body instead of a stream.
    pub fn without_streaming(mut self) -> Self {
        self.stream = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let req = GenerateRequest::new("hi")
            .with_max_tokens(50)
            .with_temperature(0.2)
            .with_model("llama3");
        assert_eq!(req.max_tokens, 50);
        assert_eq!(req.temperature, 0.2);
        assert_eq!(req.model.as_deref(), Some("llama3"));
        assert!(req.stream);
        assert!(!req.without_streaming().stream);
    }
}
