//! Progress reporting while a reply streams in

use cogerphere_application::StreamProgressNotifier;
use cogerphere_domain::{ConversationId, MessageId, SendPhase};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

#[derive(Default)]
struct ReporterState {
    spinner: Option<ProgressBar>,
    /// Bytes of the assistant text already written to stdout.
    printed: usize,
}

/// Shows a spinner until the first byte arrives, then echoes the reply as it
/// grows.
pub struct StreamReporter {
    quiet: bool,
    state: Mutex<ReporterState>,
}

impl StreamReporter {
    pub fn new() -> Self {
        Self {
            quiet: false,
            state: Mutex::new(ReporterState::default()),
        }
    }

    /// Suppress the spinner. Reply text is still printed.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Whether any reply text was echoed during the current send.
    pub fn has_printed(&self) -> bool {
        self.lock().printed > 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ReporterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn start_spinner() -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(Self::spinner_style());
        spinner.set_message("Waiting for response...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }

    /// Portion of `content` not yet written, or `None` when nothing new
    /// arrived.
    fn unprinted<'a>(content: &'a str, printed: usize) -> Option<&'a str> {
        content.get(printed..).filter(|rest| !rest.is_empty())
    }
}

impl Default for StreamReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamProgressNotifier for StreamReporter {
    fn on_phase(&self, _conversation_id: &ConversationId, phase: SendPhase) {
        let mut state = self.lock();
        match phase {
            SendPhase::AwaitingFirstByte => {
                state.printed = 0;
                if !self.quiet {
                    state.spinner = Some(Self::start_spinner());
                }
            }
            SendPhase::Streaming => {
                if let Some(spinner) = state.spinner.take() {
                    spinner.finish_and_clear();
                }
            }
            phase if phase.is_terminal() => {
                if let Some(spinner) = state.spinner.take() {
                    spinner.finish_and_clear();
                }
                if state.printed > 0 {
                    if phase == SendPhase::Cancelled {
                        println!(" {}", "[stopped]".dimmed());
                    } else {
                        println!();
                    }
                }
            }
            _ => {}
        }
    }

    fn on_content(&self, _conversation_id: &ConversationId, _message_id: &MessageId, content: &str) {
        let mut state = self.lock();
        let Some(rest) = Self::unprinted(content, state.printed) else {
            return;
        };

        let mut stdout = io::stdout().lock();
        // stdout may be a closed pipe; the reply is persisted either way.
        let _ = stdout.write_all(rest.as_bytes());
        let _ = stdout.flush();
        state.printed = content.len();
    }
}
