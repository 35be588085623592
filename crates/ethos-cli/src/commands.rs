//! Raw command matching used when the intent router is bypassed
//! (`--nlu-off`).
//!
//! Only three literal commands are recognised; everything else is sent to
//! the language model.

use ethos_intent::{Intent, RoutedUtterance};

/// Classify `text` by literal prefix.
pub fn match_raw_command(text: &str) -> RoutedUtterance {
    let text = text.trim();
    let lower = text.to_lowercase();

    let intent = if lower.starts_with("list reminders") {
        Intent::ListReminders
    } else if lower.starts_with("delete reminder") {
        Intent::DeleteReminder
    } else if lower == "exit" || lower == "quit" {
        Intent::Exit
    } else {
        Intent::Unknown
    };

    RoutedUtterance {
        intent,
        text: text.to_owned(),
        task: text.to_owned(),
        tag: None,
        time_phrase: String::new(),
        when: None,
    }
}
