//! Action dispatcher: one handler per intent.
//!
//! Handlers are the only callers of the store's mutating operations.  Each
//! returns a [`Reply`] that the interactive loop prints and, unless silent,
//! speaks.  Collaborator failures (language model, weather) become
//! user-facing messages here; only unexpected errors propagate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use anyhow::Result;
use chrono::{DateTime, Local};
use ethos_adapters::{WeatherSource, compose_agenda};
use ethos_agent::{GenerateRequest, LanguageModel, TokenCallback};
use ethos_intent::{Intent, RoutedUtterance, resolve_time_via_model};
use ethos_store::{InteractionLog, ReminderStore, ReminderView, StoreError};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, error, info, instrument, warn};

/// Tag given to reminders created through the `schedule` intent.
pub const EVENT_TAG: &str = "event";

const NO_RESPONSE: &str = "[Sorry sir, I don't have a response]";
const LLM_FAILED: &str = "[ERROR] LLM failed.";

static RE_DELETE_INDEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:delete|remove|cancel)\s+(?:a\s+|the\s+)?reminder\s+(?:number\s+)?#?(\d+)")
        .unwrap()
});

const HELP_TEXT: &str = "\u{1f4a1} You can say things like:\n\
    \u{2022} Remind me to call Sam at 6pm\n\
    \u{2022} Remind me [tag: health] to stretch in 20 minutes\n\
    \u{2022} Schedule a dentist visit on Friday at 9am\n\
    \u{2022} What's my agenda today?\n\
    \u{2022} What's the weather like?\n\
    \u{2022} List reminders\n\
    \u{2022} Delete reminder 1\n\
    \u{2022} Exit";

/// Per-session switches taken from the command line and config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub silent: bool,
    pub memory_off: bool,
    /// Token cap for conversational answers.
    pub max_tokens: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            silent: false,
            memory_off: false,
            max_tokens: ethos_agent::llm::types::DEFAULT_MAX_TOKENS,
        }
    }
}

/// What a handler wants shown and said.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    /// Console text; empty when the answer was already streamed.
    pub display: String,
    /// Text for the speech channel.
    pub speech: Option<String>,
    /// The interactive loop should end after delivering this reply.
    pub exit: bool,
}

impl Reply {
    fn say(display: impl Into<String>, speech: impl Into<String>) -> Self {
        Self {
            display: display.into(),
            speech: Some(speech.into()),
            exit: false,
        }
    }

    /// Display and speak the same line.
    fn echo(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::say(text.clone(), text)
    }
}

/// Maps routed utterances to handlers.
pub struct Dispatcher {
    store: Arc<ReminderStore>,
    llm: Arc<dyn LanguageModel>,
    weather: Arc<dyn WeatherSource>,
    memory: Option<InteractionLog>,
    token_sink: Arc<TokenCallback>,
    settings: Settings,
}

impl Dispatcher {
    pub fn new(
        store: Arc<ReminderStore>,
        llm: Arc<dyn LanguageModel>,
        weather: Arc<dyn WeatherSource>,
        settings: Settings,
    ) -> Self {
        Self {
            store,
            llm,
            weather,
            memory: None,
            token_sink: Arc::new(print_token),
            settings,
        }
    }

    /// Record conversational exchanges in `log` (ignored with `memory_off`).
    pub fn with_memory(mut self, log: InteractionLog) -> Self {
        self.memory = Some(log);
        self
    }

    /// Where streamed conversational tokens go; stdout by default.
    pub fn with_token_sink(mut self, sink: Arc<TokenCallback>) -> Self {
        self.token_sink = sink;
        self
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Run the handler for `routed`.
    pub async fn handle(&self, routed: &RoutedUtterance) -> Result<Reply> {
        self.handle_at(routed, Local::now()).await
    }

    /// Run the handler for `routed` with `now` as the reference time.
    #[instrument(skip(self, routed, now), fields(intent = %routed.intent))]
    pub async fn handle_at(&self, routed: &RoutedUtterance, now: DateTime<Local>) -> Result<Reply> {
        match routed.intent {
            Intent::Reminder => Ok(self.schedule_reminder(routed, None, now).await),
            Intent::Schedule => Ok(self.schedule_reminder(routed, Some(EVENT_TAG), now).await),
            Intent::ListReminders | Intent::QueryReminders => Ok(self.list_reminders()),
            Intent::DeleteReminder => self.delete_reminder(&routed.text),
            Intent::Agenda => Ok(self.agenda(now).await),
            Intent::Weather => Ok(self.weather().await),
            Intent::Help => Ok(Reply::say(HELP_TEXT, "Here's what I can help you with.")),
            Intent::Exit => Ok(Reply {
                display: "Goodbye!".to_owned(),
                speech: Some("Goodbye.".to_owned()),
                exit: true,
            }),
            Intent::Greeting | Intent::Unknown => Ok(self.converse(&routed.text, now).await),
        }
    }

    async fn schedule_reminder(
        &self,
        routed: &RoutedUtterance,
        default_tag: Option<&str>,
        now: DateTime<Local>,
    ) -> Reply {
        debug!(task = %routed.task, time_phrase = %routed.time_phrase, "scheduling reminder");

        let when = match routed.when {
            Some(when) => Some(when),
            None => {
                info!("no time found locally, asking the language model");
                resolve_time_via_model(self.llm.as_ref(), &routed.text, now).await
            }
        };

        let Some(when) = when else {
            return Reply::echo("\u{274c} Still could not extract a valid time.");
        };

        let tag = routed.tag.as_deref().or(default_tag);
        match self.store.add(&routed.task, when, tag) {
            Ok(reminder) => Reply::echo(format!(
                "\u{2705} Reminder saved: '{}' at '{}'",
                reminder.task,
                reminder.time.format("%A %I:%M %p")
            )),
            Err(StoreError::EmptyTask) => {
                Reply::echo("\u{274c} Please tell me what to remind you about.")
            }
            Err(e) => {
                error!(error = %e, "failed to schedule reminder");
                Reply::echo("\u{274c} Failed to schedule reminder.")
            }
        }
    }

    fn list_reminders(&self) -> Reply {
        let reminders = self.store.list(ReminderView::Pending);
        if reminders.is_empty() {
            return Reply::say("\u{1f4ed} No upcoming reminders.", "You have no reminders.");
        }

        let mut display = String::from("\u{1f4c5} Your Reminders:");
        for (i, r) in reminders.iter().enumerate() {
            display.push_str(&format!(
                "\n  {}. {} @ {} [{}]",
                i + 1,
                r.task,
                r.time.format("%Y-%m-%d %I:%M %p"),
                r.tag
            ));
        }
        let speech = match reminders.len() {
            1 => "You have 1 reminder.".to_owned(),
            n => format!("You have {n} reminders."),
        };
        Reply::say(display, speech)
    }

    fn delete_reminder(&self, text: &str) -> Result<Reply> {
        let Some(number) = RE_DELETE_INDEX
            .captures(text)
            .and_then(|c| c[1].parse::<usize>().ok())
        else {
            return Ok(Reply::echo("\u{274c} Usage: delete reminder <number>"));
        };

        // Numbers shown to the user are 1-based.
        let Some(index) = number.checked_sub(1) else {
            return Ok(Reply::echo("\u{274c} Invalid reminder number."));
        };

        match self.store.delete(index, ReminderView::Pending) {
            Ok(_) => Ok(Reply::echo(format!("\u{1f5d1}\u{fe0f} Reminder {number} deleted."))),
            Err(StoreError::InvalidIndex { .. }) => {
                Ok(Reply::echo("\u{274c} Invalid reminder number."))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn agenda(&self, now: DateTime<Local>) -> Reply {
        let today = now.date_naive();
        let agenda = compose_agenda(self.weather.as_ref(), self.store.pending_on(today), today).await;
        Reply::say(agenda.render(), agenda.spoken())
    }

    async fn weather(&self) -> Reply {
        match self.weather.today().await {
            Ok(forecast) => Reply::say(forecast.render(), forecast.spoken()),
            Err(e) => {
                warn!(error = %e, "weather fetch failed");
                Reply::say(
                    "\u{274c} Weather unavailable right now.",
                    "Sorry, I couldn't get the weather.",
                )
            }
        }
    }

    async fn converse(&self, text: &str, now: DateTime<Local>) -> Reply {
        let request = GenerateRequest::new(text).with_max_tokens(self.settings.max_tokens);

        let streamed = Arc::new(AtomicBool::new(false));
        let sink = Arc::clone(&self.token_sink);
        let flag = Arc::clone(&streamed);
        let on_token: &TokenCallback = &move |token: &str| {
            flag.store(true, Ordering::Relaxed);
            (*sink)(token);
        };

        let response = match self.llm.generate(&request, Some(on_token)).await {
            Ok(text) if text.trim().is_empty() => NO_RESPONSE.to_owned(),
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "conversational request failed");
                LLM_FAILED.to_owned()
            }
        };

        self.remember(text, &response, now);

        Reply {
            display: if streamed.load(Ordering::Relaxed) {
                String::new()
            } else {
                response.clone()
            },
            speech: Some(response),
            exit: false,
        }
    }

    fn remember(&self, user: &str, response: &str, now: DateTime<Local>) {
        if self.settings.memory_off {
            return;
        }
        let Some(log) = &self.memory else {
            return;
        };

        let mut metadata = Map::new();
        metadata.insert("timestamp".to_owned(), Value::String(now.to_rfc3339()));
        if let Err(e) = log.record(format!("USER: {user}\nETHOS: {response}"), metadata) {
            warn!(error = %e, "failed to record interaction");
        }
    }
}

fn print_token(token: &str) {
    use std::io::Write as _;
    print!("{token}");
    std::io::stdout().flush().ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use ethos_adapters::{AdapterError, DailyForecast};
    use ethos_agent::AgentError;
    use ethos_intent::IntentRouter;

    /// Streams `reply` word by word, or fails when `None`.
    struct MockLlm {
        reply: Option<String>,
        prompts: Mutex<Vec<GenerateRequest>>,
    }

    impl MockLlm {
        fn new(reply: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(str::to_owned),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for MockLlm {
        async fn generate(
            &self,
            request: &GenerateRequest,
            on_token: Option<&TokenCallback>,
        ) -> ethos_agent::Result<String> {
            self.prompts.lock().unwrap().push(request.clone());
            let reply = self.reply.clone().ok_or_else(|| AgentError::LlmRequestFailed {
                reason: "offline".into(),
            })?;
            if let Some(cb) = on_token {
                for word in reply.split_inclusive(' ') {
                    cb(word);
                }
            }
            Ok(reply)
        }
    }

    struct NoWeather;

    #[async_trait]
    impl WeatherSource for NoWeather {
        async fn today(&self) -> ethos_adapters::Result<DailyForecast> {
            Err(AdapterError::RequestFailed {
                reason: "offline".into(),
            })
        }
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 12, 10, 30, 0).unwrap()
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<ReminderStore>,
        llm: Arc<MockLlm>,
        tokens: Arc<Mutex<String>>,
        dispatcher: Dispatcher,
    }

    fn fixture(llm_reply: Option<&str>, settings: Settings) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ReminderStore::open(dir.path().join("reminders.json")));
        let llm = MockLlm::new(llm_reply);
        let tokens = Arc::new(Mutex::new(String::new()));
        let captured = Arc::clone(&tokens);
        let dispatcher = Dispatcher::new(
            Arc::clone(&store),
            llm.clone(),
            Arc::new(NoWeather),
            settings,
        )
        .with_memory(InteractionLog::open(dir.path().join("memory_store.json")))
        .with_token_sink(Arc::new(move |t: &str| captured.lock().unwrap().push_str(t)));
        Fixture {
            _dir: dir,
            store,
            llm,
            tokens,
            dispatcher,
        }
    }

    async fn say(f: &Fixture, text: &str) -> Reply {
        let routed = IntentRouter::new().route_at(text, now());
        f.dispatcher.handle_at(&routed, now()).await.unwrap()
    }

    #[tokio::test]
    async fn reminder_is_saved() {
        let f = fixture(None, Settings::default());
        let reply = say(&f, "remind me to call Sam at 6pm").await;
        assert_eq!(reply.display, "\u{2705} Reminder saved: 'call Sam' at 'Wednesday 06:00 PM'");
        assert_eq!(reply.speech.as_deref(), Some(reply.display.as_str()));

        let pending = f.store.list(ReminderView::Pending);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].tag, "general");
        // Local resolution never consults the model.
        assert!(f.llm.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn schedule_uses_event_tag() {
        let f = fixture(None, Settings::default());
        say(&f, "schedule a dentist visit on Friday at 9am").await;
        assert_eq!(f.store.list(ReminderView::All)[0].tag, EVENT_TAG);
    }

    #[tokio::test]
    async fn missing_time_falls_back_to_model() {
        let f = fixture(Some("The time is tomorrow at 6pm."), Settings::default());
        let reply = say(&f, "remind me to water the plants").await;
        assert!(reply.display.starts_with("\u{2705} Reminder saved: 'water the plants'"));

        let prompts = f.llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].max_tokens, 50);

        let stored = f.store.list(ReminderView::Pending);
        assert_eq!(stored[0].time, Local.with_ymd_and_hms(2024, 6, 13, 18, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn unresolvable_time_is_reported() {
        let f = fixture(Some("I don't know."), Settings::default());
        let reply = say(&f, "remind me to water the plants").await;
        assert_eq!(reply.display, "\u{274c} Still could not extract a valid time.");
        assert!(f.store.is_empty());

        let offline = fixture(None, Settings::default());
        let reply = say(&offline, "remind me to water the plants").await;
        assert_eq!(reply.display, "\u{274c} Still could not extract a valid time.");
    }

    #[tokio::test]
    async fn list_and_delete_share_the_pending_view() {
        let f = fixture(None, Settings::default());
        assert_eq!(say(&f, "list reminders").await.display, "\u{1f4ed} No upcoming reminders.");

        let at = |h| Local.with_ymd_and_hms(2024, 6, 12, h, 0, 0).unwrap();
        f.store.add("already fired", at(9), None).unwrap();
        f.store.add("lunch", at(12), Some("food")).unwrap();
        f.store.add("gym", at(18), None).unwrap();
        f.store.mark_and_collect_due(at(10));

        let listed = say(&f, "show my reminders").await;
        assert!(listed.display.contains("  1. lunch @ 2024-06-12 12:00 PM [food]"));
        assert!(listed.display.contains("  2. gym @"));
        assert!(!listed.display.contains("already fired"));
        assert_eq!(listed.speech.as_deref(), Some("You have 2 reminders."));

        let deleted = say(&f, "delete reminder 2").await;
        assert_eq!(deleted.display, "\u{1f5d1}\u{fe0f} Reminder 2 deleted.");
        let left: Vec<_> = f.store.list(ReminderView::All).into_iter().map(|r| r.task).collect();
        assert_eq!(left, vec!["already fired", "lunch"]);
    }

    #[tokio::test]
    async fn bad_delete_requests() {
        let f = fixture(None, Settings::default());
        f.store.add("lunch", now(), None).unwrap();

        assert_eq!(say(&f, "delete reminder 5").await.display, "\u{274c} Invalid reminder number.");
        assert_eq!(say(&f, "delete reminder 0").await.display, "\u{274c} Invalid reminder number.");
        assert_eq!(
            say(&f, "delete reminder").await.display,
            "\u{274c} Usage: delete reminder <number>"
        );
        assert_eq!(f.store.len(), 1);
    }

    #[tokio::test]
    async fn weather_outage_degrades() {
        let f = fixture(None, Settings::default());
        let weather = say(&f, "what's the weather like").await;
        assert_eq!(weather.display, "\u{274c} Weather unavailable right now.");

        f.store.add("team call", Local.with_ymd_and_hms(2024, 6, 12, 16, 0, 0).unwrap(), None).unwrap();
        let agenda = say(&f, "what's my agenda").await;
        assert!(agenda.display.contains("Weather unavailable right now."));
        assert!(agenda.display.contains("team call at 4:00 PM"));
    }

    #[tokio::test]
    async fn conversation_streams_and_is_remembered() {
        let f = fixture(Some("Why did the crab cross the road?"), Settings::default());
        let reply = say(&f, "tell me a joke").await;

        assert_eq!(*f.tokens.lock().unwrap(), "Why did the crab cross the road?");
        assert!(reply.display.is_empty());
        assert_eq!(reply.speech.as_deref(), Some("Why did the crab cross the road?"));

        let memory = f.dispatcher.memory.as_ref().unwrap().all();
        assert_eq!(memory.len(), 1);
        assert_eq!(memory[0].content, "USER: tell me a joke\nETHOS: Why did the crab cross the road?");
        assert!(memory[0].metadata.contains_key("timestamp"));
    }

    #[tokio::test]
    async fn conversation_failure_and_memory_off() {
        let settings = Settings {
            memory_off: true,
            ..Settings::default()
        };
        let f = fixture(None, settings);
        let reply = say(&f, "hello").await;
        assert_eq!(reply.display, LLM_FAILED);
        assert!(f.dispatcher.memory.as_ref().unwrap().all().is_empty());

        let empty = fixture(Some("  "), Settings::default());
        assert_eq!(say(&empty, "tell me a joke").await.speech.as_deref(), Some(NO_RESPONSE));
    }

    #[tokio::test]
    async fn help_and_exit() {
        let f = fixture(None, Settings::default());
        assert!(say(&f, "help").await.display.contains("Remind me to call Sam at 6pm"));

        let bye = say(&f, "goodbye").await;
        assert!(bye.exit);
        assert_eq!(bye.display, "Goodbye!");
    }
}
