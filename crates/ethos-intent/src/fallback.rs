//! Model-assisted time recovery.
//!
//! When the rule-based resolver finds no time in a reminder request, the
//! language model is asked to pull the time phrase out of the utterance.
//! Its free-form answer is scanned for a recognisable phrase, which is then
//! resolved with the normal grammar.

use std::sync::LazyLock;

use chrono::{DateTime, Local};
use ethos_agent::{GenerateRequest, LanguageModel};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::time::TimeResolver;

/// Token cap for the extraction prompt.
pub const TIME_EXTRACTION_MAX_TOKENS: u32 = 50;

const TIME_EXTRACTION_TEMPERATURE: f32 = 0.2;

static RE_TIME_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:tomorrow|today|tonight)(?:\s+(?:at\s+)?(?:\d{1,2}(?::\d{2})?\s*[ap]\.?m\b\.?|noon|midnight))?|\d{1,2}(?::\d{2})?\s*[ap]\.?m\b\.?|\d{1,2}:\d{2}|noon|midnight|this evening|next week|in \d+ (?:minutes?|hours?|days?))",
    )
    .unwrap()
});

fn extraction_prompt(utterance: &str) -> String {
    format!("Extract just the reminder time (like '6pm', 'tomorrow at noon') from: '{utterance}'")
}

/// Find the first time phrase in a model response.
///
/// Returns `None` when the response contains nothing recognisable.
pub fn extract_time_phrase(response: &str) -> Option<String> {
    RE_TIME_PHRASE
        .find(response)
        .map(|m| m.as_str().trim().trim_end_matches('.').to_owned())
}

/// Ask `llm` for the time in `utterance` and resolve it relative to `now`.
///
/// Every failure (model error, no phrase, unresolvable phrase) is logged and
/// yields `None`.
pub async fn resolve_time_via_model(
    llm: &dyn LanguageModel,
    utterance: &str,
    now: DateTime<Local>,
) -> Option<DateTime<Local>> {
    let request = GenerateRequest::new(extraction_prompt(utterance))
        .with_max_tokens(TIME_EXTRACTION_MAX_TOKENS)
        .with_temperature(TIME_EXTRACTION_TEMPERATURE)
        .without_streaming();

    let response = match llm.generate(&request, None).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "time extraction request failed");
            return None;
        }
    };
    debug!(response = %response.trim(), "model time extraction");

    let Some(phrase) = extract_time_phrase(&response) else {
        info!("model response held no time phrase");
        return None;
    };

    let when = TimeResolver::new(true).resolve_at(&phrase, now);
    match when {
        Some(when) => info!(phrase = %phrase, when = %when, "time recovered via model"),
        None => info!(phrase = %phrase, "model time phrase did not resolve"),
    }
    when
}
