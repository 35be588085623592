//! CLI entry point for Ethos.
//!
//! Wires the reminder store, language model, weather source and speech
//! output together, starts the background reminder loop and enters the
//! interactive loop.

mod cli;
mod commands;
mod config;
mod dispatch;
mod helpers;
mod repl;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ethos_adapters::{
    ConsoleNotifier, FanoutNotifier, Notifier, OpenMeteoClient, SpeechNotifier, WeatherSource,
};
use ethos_agent::{LanguageModel, OllamaClient};
use ethos_intent::ReminderScheduler;
use ethos_store::{InteractionLog, ReminderStore, ReminderView};
use tracing::info;

use crate::cli::Cli;
use crate::config::EthosConfig;
use crate::dispatch::{Dispatcher, Settings};
use crate::helpers::init_tracing;
use crate::repl::Repl;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // 1. Tracing and configuration.
    init_tracing(&cli.log_level);
    let config = EthosConfig::load(cli.config.as_deref())?;

    // 2. Reminder store.
    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!("failed to create data directory {}", config.data_dir.display())
    })?;
    let store = Arc::new(ReminderStore::open(config.reminders_path()));
    info!(
        path = %store.path().display(),
        pending = store.list(ReminderView::Pending).len(),
        "reminder store ready"
    );

    // 3. Collaborators.
    let llm: Arc<dyn LanguageModel> =
        Arc::new(OllamaClient::new(config.ollama()).context("failed to create LLM client")?);
    let weather: Arc<dyn WeatherSource> =
        Arc::new(OpenMeteoClient::new(config.weather()).context("failed to create weather client")?);
    let speech: Option<Arc<dyn Notifier>> = config
        .speech()
        .map(|c| Arc::new(SpeechNotifier::new(c)) as Arc<dyn Notifier>);
    info!(
        model = %config.llm.model,
        speech = speech.is_some() && !cli.silent,
        nlu = !cli.nlu_off,
        "collaborators ready"
    );

    // 4. Background reminder loop; runs regardless of --nlu-off.
    let mut announcer = FanoutNotifier::new().with(Arc::new(ConsoleNotifier));
    if !cli.silent
        && let Some(speaker) = &speech
    {
        announcer = announcer.with(Arc::clone(speaker));
    }
    let mut scheduler = ReminderScheduler::new(Arc::clone(&store), Arc::new(announcer))
        .with_interval(config.poll_interval());
    scheduler.start()?;

    // 5. Dispatcher and interactive loop.
    let settings = Settings {
        silent: cli.silent,
        memory_off: cli.memory_off,
        max_tokens: config.llm.max_tokens,
    };
    let mut dispatcher = Dispatcher::new(store, llm, weather, settings);
    if !cli.memory_off {
        dispatcher = dispatcher.with_memory(InteractionLog::open(config.memory_path()));
    }

    println!();
    println!("  Ethos v{}", env!("CARGO_PKG_VERSION"));
    println!("  \u{1f399}\u{fe0f} Ethos is listening... (type 'help' for examples, 'exit' to quit)");

    let result = Repl::new(dispatcher, speech, cli.nlu_off).run().await;

    scheduler.stop().await;
    info!("shutting down");
    result
}
