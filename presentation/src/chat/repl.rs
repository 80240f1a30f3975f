//! REPL (Read-Eval-Print Loop) for interactive chat

use super::command::{HELP, ReplCommand};
use super::send::{print_outcome, send_interruptible};
use crate::{ConsoleFormatter, StreamReporter};
use cogerphere_application::SessionManager;
use cogerphere_domain::{Conversation, ProviderConfig};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Interactive chat REPL
pub struct ChatRepl {
    manager: Arc<SessionManager>,
    quiet: bool,
    history_path: Option<PathBuf>,
}

impl ChatRepl {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self {
            manager,
            quiet: false,
            history_path: None,
        }
    }

    /// Keep readline history in `data_dir`. Without it no history is saved.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.history_path = Some(history_file(&data_dir.into()));
        self
    }

    /// Hide the waiting spinner
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Run the interactive REPL
    pub async fn run(&self) -> RlResult<()> {
        let mut rl = DefaultEditor::new()?;

        let history_path = self.history_path.clone();
        if let Some(ref path) = history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = rl.load_history(path);
        }

        self.print_welcome();

        loop {
            match rl.readline(">>> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let command = ReplCommand::parse(line);
                    if command.as_ref().map_or(true, ReplCommand::keep_in_history) {
                        let _ = rl.add_history_entry(line);
                    }

                    match command {
                        Ok(ReplCommand::Quit) => {
                            println!("Bye!");
                            break;
                        }
                        Ok(command) => self.execute(command).await,
                        Err(message) => {
                            println!("{}", message);
                            println!("Type /help for available commands");
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Bye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        if let Some(ref path) = history_path {
            let _ = rl.save_history(path);
        }

        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "cogerphere - chat mode".bold());
        println!();
        print!(
            "{}",
            ConsoleFormatter::format_provider_config(&self.manager.provider_config())
        );
        if let Some(active) = self.manager.active_conversation() {
            println!("{} {}", "Chat:   ".cyan().bold(), active.title());
        }
        println!();
        println!("Type /help for commands.");
        println!();
    }

    async fn execute(&self, command: ReplCommand) {
        match command {
            ReplCommand::Message(content) => self.send(&content).await,
            ReplCommand::New => {
                self.manager.create_conversation();
                println!("Started a new chat.");
            }
            ReplCommand::List => self.print_list(),
            ReplCommand::Select(index) => match self.nth(index) {
                Some(conversation) => {
                    self.manager.select_conversation(conversation.id().clone());
                    println!("Switched to: {}", conversation.title());
                }
                None => println!("No chat number {}", index),
            },
            ReplCommand::Delete(index) => {
                let target = match index {
                    Some(index) => self.nth(index),
                    None => self.manager.active_conversation(),
                };
                match target {
                    Some(conversation) => {
                        self.manager.delete_conversation(conversation.id());
                    }
                    None => println!("Nothing to delete"),
                }
            }
            ReplCommand::Clear => self.manager.clear_conversations(),
            ReplCommand::History => match self.manager.active_conversation() {
                Some(conversation) => {
                    print!("{}", ConsoleFormatter::format_history(&conversation))
                }
                None => println!("No active chat"),
            },
            ReplCommand::SetKey(key) => {
                let current = self.manager.provider_config();
                self.manager
                    .set_provider_config(ProviderConfig::new(key, current.model));
            }
            ReplCommand::SetModel(model) => {
                let current = self.manager.provider_config();
                self.manager
                    .set_provider_config(ProviderConfig::new(current.api_key, model));
            }
            ReplCommand::Config => print!(
                "{}",
                ConsoleFormatter::format_provider_config(&self.manager.provider_config())
            ),
            ReplCommand::Help => {
                println!();
                println!("{}", HELP);
                println!();
            }
            ReplCommand::Quit => {}
        }
    }

    fn nth(&self, index: usize) -> Option<Conversation> {
        self.manager
            .conversations()
            .into_iter()
            .nth(index.checked_sub(1)?)
    }

    fn print_list(&self) {
        let conversations = self.manager.conversations();
        let active = self.manager.active_conversation_id();
        print!(
            "{}",
            ConsoleFormatter::format_conversation_list(&conversations, active.as_ref())
        );
    }

    async fn send(&self, content: &str) {
        println!();
        let reporter = StreamReporter::new().quiet(self.quiet);

        match send_interruptible(&self.manager, content, &reporter).await {
            Ok(outcome) => print_outcome(&outcome, reporter.has_printed()),
            // Already surfaced through the notice sink.
            Err(e) => debug!(error = %e, "Send did not complete"),
        }
        println!();
    }
}

/// Readline history file inside the data directory.
fn history_file(data_dir: &Path) -> PathBuf {
    data_dir.join("history.txt")
}
