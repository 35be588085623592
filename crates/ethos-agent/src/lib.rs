//! Language-model collaborator for Ethos.
//!
//! The assistant talks to a local Ollama server for two things: free-form
//! conversational answers and, when the rule-based extractor finds nothing,
//! recovering a time phrase from a reminder request.  Both go through the
//! [`LanguageModel`] trait so callers can be tested against a mock.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐  POST /api/generate   ┌──────────────┐
//! │   OllamaClient   │──────────────────────>│    Ollama    │
//! │ (LanguageModel)  │<──────────────────────│   (NDJSON)   │
//! └────────┬─────────┘   {"response","done"} └──────────────┘
//!          │
//!   ┌──────┴──────────┐
//!   │ NdjsonAccumulator│ ── on_token callback per fragment
//!   └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`llm`] -- client, request type, stream accumulator.
//! - [`error`] -- agent error types.

pub mod error;
pub mod llm;

pub use error::{AgentError, Result};
pub use llm::{
    GenerateRequest, LanguageModel, NdjsonAccumulator, OllamaClient, OllamaConfig, TokenCallback,
};
