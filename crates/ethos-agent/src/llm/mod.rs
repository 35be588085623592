//! LLM integration layer.
//!
//! - [`types`] -- the provider-agnostic [`GenerateRequest`].
//! - [`stream`] -- newline-delimited JSON accumulator for Ollama responses.
//! - [`client`] -- HTTP client and the [`LanguageModel`] trait.

pub mod client;
pub mod stream;
pub mod types;

pub use client::{LanguageModel, OllamaClient, OllamaConfig, TokenCallback};
pub use stream::NdjsonAccumulator;
pub use types::GenerateRequest;
