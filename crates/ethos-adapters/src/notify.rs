//! Notification channels: console, speech, and fan-out.
//!
//! Speech is delegated to an external text-to-speech command that receives
//! the text as its final argument.  The command is spawned per utterance
//! and bounded by a timeout; it is killed if it outlives it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{AdapterError, Result};
use crate::traits::Notifier;

/// Default text-to-speech program.
pub const DEFAULT_TTS_PROGRAM: &str = "espeak";

/// Default time limit for a single spoken line.
const DEFAULT_TTS_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

/// Prints notifications to standard output.
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, text: &str) {
        println!("\n\u{1f514} {text}");
    }
}

// ---------------------------------------------------------------------------
// Speech
// ---------------------------------------------------------------------------

/// How to invoke the text-to-speech command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechConfig {
    /// Executable to run.
    pub program: String,
    /// Arguments placed before the spoken text.
    pub args: Vec<String>,
    /// Kill the command if it runs longer than this.
    pub timeout: Duration,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_TTS_PROGRAM.to_owned(),
            args: Vec::new(),
            timeout: DEFAULT_TTS_TIMEOUT,
        }
    }
}

impl SpeechConfig {
    /// Parse a whitespace-separated command line such as
    /// `"python3 scripts/say.py"`.  Returns `None` for a blank string.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_owned);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            ..Self::default()
        })
    }

    /// Override the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Speaks notifications through an external command.
#[derive(Debug, Clone)]
pub struct SpeechNotifier {
    config: SpeechConfig,
}

impl SpeechNotifier {
    /// Create a notifier for the given command.
    pub fn new(config: SpeechConfig) -> Self {
        Self { config }
    }

    /// The configured command.
    pub fn config(&self) -> &SpeechConfig {
        &self.config
    }

    /// Run the speech command for `text` and wait for it to finish.
    pub async fn speak(&self, text: &str) -> Result<()> {
        let program = &self.config.program;
        let timeout = self.config.timeout;

        debug!(program = %program, chars = text.len(), "speaking");

        let mut child = tokio::process::Command::new(program)
            .args(&self.config.args)
            .arg(text)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AdapterError::CommandFailed {
                program: program.clone(),
                reason: format!("failed to spawn process: {e}"),
            })?;

        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(Ok(status)) => Err(AdapterError::CommandFailed {
                program: program.clone(),
                reason: format!("exited with {status}"),
            }),
            Ok(Err(e)) => Err(AdapterError::CommandFailed {
                program: program.clone(),
                reason: format!("process error: {e}"),
            }),
            // The child is killed when dropped.
            Err(_) => Err(AdapterError::Timeout {
                seconds: timeout.as_secs(),
                reason: format!("speech command `{program}` exceeded time limit"),
            }),
        }
    }
}

#[async_trait]
impl Notifier for SpeechNotifier {
    async fn notify(&self, text: &str) {
        if let Err(e) = self.speak(text).await {
            warn!(error = %e, "speech output failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Fan-out
// ---------------------------------------------------------------------------

/// Delivers every notification to each inner notifier, in order.
#[derive(Clone, Default)]
pub struct FanoutNotifier {
    targets: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    /// An empty fan-out; notifications go nowhere until targets are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a target.
    pub fn with(mut self, target: Arc<dyn Notifier>) -> Self {
        self.targets.push(target);
        self
    }

    /// Number of targets.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether there are no targets.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl std::fmt::Debug for FanoutNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutNotifier")
            .field("targets", &self.targets.len())
            .finish()
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn notify(&self, text: &str) {
        for target in &self.targets {
            target.notify(text).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn sh(script: &str) -> SpeechConfig {
        SpeechConfig {
            program: "sh".into(),
            args: vec!["-c".into(), script.into(), "sh".into()],
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn command_line_parsing() {
        let cfg = SpeechConfig::from_command_line("  python3 scripts/say.py ").unwrap();
        assert_eq!(cfg.program, "python3");
        assert_eq!(cfg.args, vec!["scripts/say.py"]);
        assert!(SpeechConfig::from_command_line("   ").is_none());
    }

    #[tokio::test]
    async fn text_is_passed_as_last_argument() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("spoken.txt");
        let script = format!("printf '%s' \"$1\" > '{}'", out.display());

        SpeechNotifier::new(sh(&script))
            .speak("Reminder: call Sam")
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap(), "Reminder: call Sam");
    }

    #[tokio::test]
    async fn nonzero_exit_is_an_error() {
        let err = SpeechNotifier::new(sh("exit 3")).speak("x").await.unwrap_err();
        assert!(matches!(err, AdapterError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let cfg = SpeechConfig::from_command_line("definitely-not-a-real-tts-binary").unwrap();
        let err = SpeechNotifier::new(cfg).speak("x").await.unwrap_err();
        assert!(matches!(err, AdapterError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let cfg = sh("sleep 5").with_timeout(Duration::from_millis(100));
        let err = SpeechNotifier::new(cfg).speak("x").await.unwrap_err();
        assert!(matches!(err, AdapterError::Timeout { .. }));
    }

    #[derive(Default)]
    struct Recording(Mutex<Vec<String>>);

    #[async_trait]
    impl Notifier for Recording {
        async fn notify(&self, text: &str) {
            self.0.lock().unwrap().push(text.to_owned());
        }
    }

    #[tokio::test]
    async fn fanout_reaches_every_target() {
        let a = Arc::new(Recording::default());
        let b = Arc::new(Recording::default());
        let fanout = FanoutNotifier::new().with(a.clone()).with(b.clone());
        assert_eq!(fanout.len(), 2);

        fanout.notify("hello").await;
        assert_eq!(*a.0.lock().unwrap(), vec!["hello"]);
        assert_eq!(*b.0.lock().unwrap(), vec!["hello"]);
    }
}
