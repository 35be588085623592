//! CLI argument definitions for Ethos.

use std::path::PathBuf;

use clap::Parser;

/// Ethos -- a reminder-first personal assistant.
#[derive(Debug, Parser)]
#[command(
    name = "ethos",
    version,
    about = "Ethos -- reminder-first personal assistant",
    long_about = "Type requests such as \"remind me to call Sam at 6pm\" or \"what's my \
                  agenda\". Due reminders are announced in the background."
)]
pub struct Cli {
    /// Disable spoken output, including reminder announcements.
    #[arg(long)]
    pub silent: bool,

    /// Bypass the intent router; only raw commands are recognised and
    /// everything else goes to the language model.
    #[arg(long)]
    pub nlu_off: bool,

    /// Do not record conversational exchanges.
    #[arg(long)]
    pub memory_off: bool,

    /// Path to a TOML configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Default log level when `RUST_LOG` is not set.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
