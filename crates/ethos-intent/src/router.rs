//! Ordered, pattern-based intent router.
//!
//! Routes are evaluated in registration order and the first matching
//! pattern wins, so the order of the default table is part of its
//! behaviour.  Independently of the intent, every utterance goes through
//! slot extraction: tag, time expression and task text.
//!
//! The router never fails.  Text that matches no route is
//! [`Intent::Unknown`].

use std::fmt;

use chrono::{DateTime, Local};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{IntentError, Result};
use crate::slots::{clean_task, extract_tag};
use crate::time::TimeResolver;

// ---------------------------------------------------------------------------
// Intent
// ---------------------------------------------------------------------------

/// The classified purpose of an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Reminder,
    Schedule,
    ListReminders,
    QueryReminders,
    DeleteReminder,
    Agenda,
    Weather,
    Greeting,
    Help,
    Exit,
    Unknown,
}

impl Intent {
    /// The snake_case name used in logs and on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reminder => "reminder",
            Self::Schedule => "schedule",
            Self::ListReminders => "list_reminders",
            Self::QueryReminders => "query_reminders",
            Self::DeleteReminder => "delete_reminder",
            Self::Agenda => "agenda",
            Self::Weather => "weather",
            Self::Greeting => "greeting",
            Self::Help => "help",
            Self::Exit => "exit",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default route table, in evaluation order.
const DEFAULT_ROUTES: &[(Intent, &[&str])] = &[
    (
        Intent::Reminder,
        &[r"\bremind me\b", r"\bset (?:a |an )?reminder\b", r"\balert me\b"],
    ),
    (
        Intent::QueryReminders,
        &[
            r"\bdo i have (?:any )?(?:upcoming )?reminders?\b",
            r"\bany reminders\b",
            r"\bupcoming reminders\b",
        ],
    ),
    (
        Intent::ListReminders,
        &[
            r"\b(?:list|show)(?: me)? (?:my |all )?reminders\b",
            r"\bwhat (?:are|do i have) (?:my |any )?reminders\b",
            r"^reminders$",
        ],
    ),
    (
        Intent::DeleteReminder,
        &[r"\b(?:delete|remove|cancel) (?:a |the )?reminder\b"],
    ),
    (
        Intent::Agenda,
        &[
            r"\bwhat(?:'?s| is)? (?:my |the )?(?:agenda|schedule)\b",
            r"\bmy day\b",
            r"\bagenda\b",
        ],
    ),
    (
        Intent::Schedule,
        &[
            r"\bschedule\b",
            r"\bbook (?:a |an )?(?:meeting|appointment)\b",
            r"\badd (?:an )?event\b",
        ],
    ),
    (
        Intent::Weather,
        &[r"\bweather\b", r"\bforecast\b", r"\btemperature\b"],
    ),
    (
        Intent::Greeting,
        &[r"^(?:hi|hello|hey|good (?:morning|afternoon|evening))(?:,? ethos)?[!.]?$"],
    ),
    (
        Intent::Help,
        &[r"^(?:help|\?|commands)$", r"\bwhat can you do\b"],
    ),
    (Intent::Exit, &[r"^(?:exit|quit|bye|goodbye)[!.]?$"]),
];

// ---------------------------------------------------------------------------
// Router output
// ---------------------------------------------------------------------------

/// The router's result for one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedUtterance {
    pub intent: Intent,
    /// The trimmed original utterance.
    pub text: String,
    /// Task description: the utterance minus tag, lead-in and time phrase.
    pub task: String,
    /// Value of a `[tag: ...]` annotation, if present.
    pub tag: Option<String>,
    /// The recognised time expression, or empty.
    pub time_phrase: String,
    /// The resolved time, if a time expression was recognised.
    pub when: Option<DateTime<Local>>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Route {
    intent: Intent,
    patterns: Vec<Regex>,
}

/// Classifies utterances and extracts their slots.
#[derive(Debug)]
pub struct IntentRouter {
    routes: Vec<Route>,
    resolver: TimeResolver,
}

impl IntentRouter {
    /// A router with the default route table.
    pub fn new() -> Self {
        let mut router = Self::empty();
        for (intent, patterns) in DEFAULT_ROUTES {
            for pattern in *patterns {
                if let Err(e) = router.add_route(*intent, pattern) {
                    warn!(error = %e, "skipping default route");
                }
            }
        }
        router
    }

    /// A router with no routes; everything is [`Intent::Unknown`].
    pub fn empty() -> Self {
        Self {
            routes: Vec::new(),
            resolver: TimeResolver::new(true),
        }
    }

    /// Append `pattern` to the route for `intent`.
    ///
    /// A new intent is evaluated after every existing one.  Patterns match
    /// case-insensitively against the trimmed utterance.
    pub fn add_route(&mut self, intent: Intent, pattern: &str) -> Result<()> {
        let compiled =
            Regex::new(&format!("(?i){pattern}")).map_err(|e| IntentError::InvalidPattern {
                pattern: pattern.to_owned(),
                reason: e.to_string(),
            })?;

        match self.routes.iter_mut().find(|r| r.intent == intent) {
            Some(route) => route.patterns.push(compiled),
            None => self.routes.push(Route {
                intent,
                patterns: vec![compiled],
            }),
        }
        debug!(intent = %intent, pattern, "route added");
        Ok(())
    }

    /// Intents in evaluation order.
    pub fn intents(&self) -> Vec<Intent> {
        self.routes.iter().map(|r| r.intent).collect()
    }

    /// The first intent with a matching pattern, or [`Intent::Unknown`].
    pub fn classify(&self, text: &str) -> Intent {
        let text = text.trim();
        self.routes
            .iter()
            .find(|route| route.patterns.iter().any(|p| p.is_match(text)))
            .map_or(Intent::Unknown, |route| route.intent)
    }

    /// Classify `text` and extract its slots relative to the current time.
    pub fn route(&self, text: &str) -> RoutedUtterance {
        self.route_at(text, Local::now())
    }

    /// Classify `text` and extract its slots relative to `now`.
    pub fn route_at(&self, text: &str, now: DateTime<Local>) -> RoutedUtterance {
        let text = text.trim();
        let intent = self.classify(text);

        let (untagged, tag) = extract_tag(text);
        let time = self.resolver.extract_at(&untagged, now);
        let task = match &time {
            Some(m) => clean_task(&untagged, &m.spans),
            None => clean_task(&untagged, &[]),
        };

        let routed = RoutedUtterance {
            intent,
            text: text.to_owned(),
            task,
            tag,
            time_phrase: time.as_ref().map(|m| m.phrase.clone()).unwrap_or_default(),
            when: time.map(|m| m.when),
        };

        debug!(
            intent = %routed.intent,
            task = %routed.task,
            time_phrase = %routed.time_phrase,
            tag = ?routed.tag,
            "utterance routed"
        );
        routed
    }
}

impl Default for IntentRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 12, 10, 30, 0).unwrap()
    }

    #[test]
    fn reminder_with_time() {
        let routed = IntentRouter::new().route_at("remind me to call Sam at 6pm", now());
        assert_eq!(routed.intent, Intent::Reminder);
        assert!(routed.task.contains("call Sam"));
        assert_eq!(routed.time_phrase, "at 6pm");
        assert_eq!(routed.when, Some(Local.with_ymd_and_hms(2024, 6, 12, 18, 0, 0).unwrap()));
        assert_eq!(routed.tag, None);
    }

    #[test]
    fn tag_is_captured() {
        let routed =
            IntentRouter::new().route_at("Remind me [tag: health] to stretch tomorrow", now());
        assert_eq!(routed.intent, Intent::Reminder);
        assert_eq!(routed.tag.as_deref(), Some("health"));
        assert_eq!(routed.task, "stretch");
        assert_eq!(routed.time_phrase, "tomorrow");
    }

    #[test]
    fn no_time_leaves_phrase_empty() {
        let routed = IntentRouter::new().route_at("remind me to call Sam", now());
        assert_eq!(routed.intent, Intent::Reminder);
        assert!(routed.time_phrase.is_empty());
        assert!(routed.when.is_none());
        assert_eq!(routed.task, "call Sam");
    }

    #[test]
    fn default_table_classification() {
        let router = IntentRouter::new();
        let cases = [
            ("list reminders", Intent::ListReminders),
            ("Show me my reminders", Intent::ListReminders),
            ("what are my reminders", Intent::ListReminders),
            ("do I have any reminders today?", Intent::QueryReminders),
            ("delete reminder 2", Intent::DeleteReminder),
            ("remove the reminder number 1", Intent::DeleteReminder),
            ("what's my agenda", Intent::Agenda),
            ("what is my schedule for today", Intent::Agenda),
            ("schedule a dentist visit on friday", Intent::Schedule),
            ("book a meeting with Ana tomorrow at 3pm", Intent::Schedule),
            ("what's the weather like?", Intent::Weather),
            ("Hello", Intent::Greeting),
            ("good morning, ethos", Intent::Greeting),
            ("help", Intent::Help),
            ("what can you do", Intent::Help),
            ("quit", Intent::Exit),
            ("Goodbye!", Intent::Exit),
            ("tell me a joke", Intent::Unknown),
            ("", Intent::Unknown),
        ];
        for (text, expected) in cases {
            assert_eq!(router.classify(text), expected, "utterance: {text:?}");
        }
    }

    #[test]
    fn first_match_wins() {
        // Matches both reminder and schedule patterns.
        let router = IntentRouter::new();
        assert_eq!(router.classify("remind me about the schedule"), Intent::Reminder);
        // Greeting only matches a whole utterance.
        assert_eq!(router.classify("hello can you remind me"), Intent::Reminder);
    }

    #[test]
    fn custom_routes_append_in_order() {
        let mut router = IntentRouter::empty();
        router.add_route(Intent::Weather, r"\bumbrella\b").unwrap();
        router.add_route(Intent::Reminder, r"\bumbrella\b").unwrap();
        assert_eq!(router.classify("do I need an umbrella"), Intent::Weather);
        assert_eq!(router.intents(), vec![Intent::Weather, Intent::Reminder]);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let mut router = IntentRouter::empty();
        let err = router.add_route(Intent::Help, "(unclosed").unwrap_err();
        assert!(matches!(err, IntentError::InvalidPattern { .. }));
        assert!(router.intents().is_empty());
    }

    #[test]
    fn intent_names() {
        assert_eq!(Intent::ListReminders.to_string(), "list_reminders");
        assert_eq!(
            serde_json::to_string(&Intent::DeleteReminder).unwrap(),
            "\"delete_reminder\""
        );
    }
}
