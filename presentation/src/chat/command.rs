//! Slash commands understood by the chat REPL

/// A parsed REPL line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Plain text to send to the active conversation.
    Message(String),
    New,
    List,
    /// 1-based index into the conversation list.
    Select(usize),
    /// 1-based index, or the active conversation when absent.
    Delete(Option<usize>),
    Clear,
    History,
    SetKey(String),
    SetModel(String),
    Config,
    Help,
    Quit,
}

impl ReplCommand {
    /// Parse one trimmed, non-empty input line.
    pub fn parse(line: &str) -> Result<Self, String> {
        let Some(body) = line.strip_prefix('/') else {
            return Ok(ReplCommand::Message(line.to_string()));
        };

        let (name, arg) = match body.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (body, ""),
        };

        match name {
            "quit" | "exit" | "q" => Ok(ReplCommand::Quit),
            "help" | "h" | "?" => Ok(ReplCommand::Help),
            "new" => Ok(ReplCommand::New),
            "list" | "ls" => Ok(ReplCommand::List),
            "select" | "s" => Self::index(arg).map(ReplCommand::Select),
            "delete" | "rm" => {
                if arg.is_empty() {
                    Ok(ReplCommand::Delete(None))
                } else {
                    Self::index(arg).map(|i| ReplCommand::Delete(Some(i)))
                }
            }
            "clear" => Ok(ReplCommand::Clear),
            "history" => Ok(ReplCommand::History),
            "key" => Self::required(arg, "/key <api-key>").map(ReplCommand::SetKey),
            "model" => Self::required(arg, "/model <model-id>").map(ReplCommand::SetModel),
            "config" => Ok(ReplCommand::Config),
            _ => Err(format!("Unknown command: /{}", name)),
        }
    }

    /// Whether the line that produced this command may be kept in the
    /// readline history file. API keys never are.
    pub fn keep_in_history(&self) -> bool {
        !matches!(self, ReplCommand::SetKey(_))
    }

    fn index(arg: &str) -> Result<usize, String> {
        match arg.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(format!("Expected a chat number from /list, got '{}'", arg)),
        }
    }

    fn required(arg: &str, usage: &str) -> Result<String, String> {
        if arg.is_empty() {
            Err(format!("Usage: {}", usage))
        } else {
            Ok(arg.to_string())
        }
    }
}

pub(crate) const HELP: &str = "\
Commands:
  /new               - Start a new chat
  /list, /ls         - List chats (* marks the active one)
  /select <n>        - Switch to chat number n
  /delete [n]        - Delete chat n, or the active chat
  /clear             - Delete every chat
  /history           - Show the active chat
  /key <api-key>     - Set the API key
  /model <model-id>  - Set the model
  /config            - Show the API key and model in use
  /help, /h, /?      - Show this help
  /quit, /exit, /q   - Exit chat

Press Ctrl-C while a reply is streaming to stop it.";
