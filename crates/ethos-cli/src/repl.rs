//! The interactive loop.
//!
//! Reads one utterance per line, routes it (or raw-matches it with
//! `--nlu-off`), runs the handler and delivers the reply.  Handler errors
//! are logged and the loop continues; it ends on an exit reply, end of
//! input, or Ctrl-C (while waiting for input or while a handler runs).

use std::io::{self, Write as _};
use std::sync::Arc;

use anyhow::Result;
use ethos_adapters::Notifier;
use ethos_intent::{Intent, IntentRouter, RoutedUtterance};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error, info, warn};

use crate::commands::match_raw_command;
use crate::dispatch::{Dispatcher, Reply};

pub struct Repl {
    router: IntentRouter,
    dispatcher: Dispatcher,
    /// Spoken replies; `None` when speech is unavailable or silenced.
    speaker: Option<Arc<dyn Notifier>>,
    nlu_off: bool,
}

impl Repl {
    pub fn new(dispatcher: Dispatcher, speaker: Option<Arc<dyn Notifier>>, nlu_off: bool) -> Self {
        let speaker = if dispatcher.settings().silent { None } else { speaker };
        Self {
            router: IntentRouter::new(),
            dispatcher,
            speaker,
            nlu_off,
        }
    }

    /// Run until exit, end of input or Ctrl-C, reading from stdin.
    pub async fn run(&self) -> Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        self.run_with(stdin).await
    }

    /// Run over an arbitrary line source, stopping on Ctrl-C.
    pub async fn run_with<R: AsyncBufRead + Unpin>(&self, input: R) -> Result<()> {
        self.run_until(input, ctrl_c()).await
    }

    /// Run over an arbitrary line source until `interrupt` completes.
    ///
    /// The interrupt is raced against both the read and the handler, so a
    /// slow model answer or speech command never swallows it.
    pub async fn run_until<R, F>(&self, input: R, interrupt: F) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        F: Future<Output = ()>,
    {
        let mut lines = input.lines();
        tokio::pin!(interrupt);

        loop {
            print!("\n> ");
            io::stdout().flush().ok();

            let line = tokio::select! {
                line = lines.next_line() => line,
                () = &mut interrupt => {
                    announce_interrupt();
                    break;
                }
            };

            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => {
                    println!();
                    info!("end of input, exiting");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "failed to read input");
                    continue;
                }
            };

            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            let exit = tokio::select! {
                exit = self.step(text) => exit,
                () = &mut interrupt => {
                    announce_interrupt();
                    break;
                }
            };
            if exit {
                info!("user requested exit");
                break;
            }
        }

        Ok(())
    }

    /// Route, handle and deliver one utterance.  Returns whether to exit.
    async fn step(&self, text: &str) -> bool {
        let routed = self.route(text);
        debug!(intent = %routed.intent, task = %routed.task, "dispatching");

        if matches!(routed.intent, Intent::Unknown | Intent::Greeting) {
            print!("\nEthos: ");
            io::stdout().flush().ok();
        }

        match self.dispatcher.handle(&routed).await {
            Ok(reply) => {
                self.deliver(&reply).await;
                reply.exit
            }
            Err(e) => {
                error!(error = %e, intent = %routed.intent, "unhandled error in handler");
                eprintln!("  Error: {e}");
                false
            }
        }
    }

    fn route(&self, text: &str) -> RoutedUtterance {
        if self.nlu_off {
            match_raw_command(text)
        } else {
            self.router.route(text)
        }
    }

    async fn deliver(&self, reply: &Reply) {
        // Prints the reply text; after a streamed answer the text is empty
        // and this only ends the line.
        println!("{}", reply.display);
        if let (Some(speaker), Some(speech)) = (&self.speaker, &reply.speech) {
            speaker.notify(speech).await;
        }
    }
}

/// Completes on Ctrl-C.  Never completes if the handler cannot be
/// installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

fn announce_interrupt() {
    println!("\n\u{274c} Interrupted. Exiting.");
    info!("interrupted");
}
