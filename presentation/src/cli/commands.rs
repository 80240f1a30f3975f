//! CLI command definitions

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for cogerphere
#[derive(Parser, Debug)]
#[command(name = "cogerphere")]
#[command(author, version, about = "Chat with hosted language models from the terminal")]
#[command(long_about = r#"
Cogerphere keeps multiple conversations with an OpenRouter-compatible chat
model, streams replies as they are generated, and persists history locally.

Configuration files are loaded from (in priority order):
1. COGERPHERE_* environment variables (e.g. COGERPHERE_ENDPOINT__TEMPERATURE)
2. --config <path>        Explicit config file
3. ./cogerphere.toml      Project-level config
4. ~/.config/cogerphere/config.toml   Global config

Example:
  cogerphere --api-key sk-or-... "What is the borrow checker?"
  cogerphere --chat --model anthropic/claude-3-haiku
"#)]
pub struct Cli {
    /// Message to send to the active conversation (not required in chat mode)
    pub message: Option<String>,

    /// Start interactive chat mode
    #[arg(short, long)]
    pub chat: bool,

    /// Store this API key before doing anything else
    #[arg(long, value_name = "KEY", env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Store this model identifier before doing anything else
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Start a new conversation before sending
    #[arg(short, long)]
    pub new: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress the waiting spinner
    #[arg(short, long)]
    pub quiet: bool,

    /// Write diagnostic logs to a daily rolling file in this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}
