//! Console rendering of conversations, settings and notices

use chrono::Local;
use cogerphere_application::{Notice, NoticeLevel, NoticeSink};
use cogerphere_domain::{Conversation, ConversationId, Message, ProviderConfig, Role};
use colored::Colorize;

/// Formats session state for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Numbered conversation list, newest last, with the active one marked.
    pub fn format_conversation_list(
        conversations: &[Conversation],
        active_id: Option<&ConversationId>,
    ) -> String {
        if conversations.is_empty() {
            return format!("{}\n", "No chats yet. Type a message to start one.".dimmed());
        }

        let mut output = String::new();
        for (index, conversation) in conversations.iter().enumerate() {
            let is_active = active_id == Some(conversation.id());
            let marker = if is_active { "*".green().bold() } else { " ".normal() };
            let title = if is_active {
                conversation.title().bold()
            } else {
                conversation.title().normal()
            };
            output.push_str(&format!(
                "{} {:>3}. {} {}\n",
                marker,
                index + 1,
                title,
                format!(
                    "({} messages, {})",
                    conversation.messages().len(),
                    conversation
                        .updated_at()
                        .with_timezone(&Local)
                        .format("%Y-%m-%d %H:%M")
                )
                .dimmed()
            ));
        }
        output
    }

    /// Full transcript of one conversation.
    pub fn format_history(conversation: &Conversation) -> String {
        let mut output = format!("{}\n", Self::header(conversation.title()));
        if conversation.messages().is_empty() {
            output.push_str(&format!("{}\n", "(empty)".dimmed()));
        }
        for message in conversation.messages() {
            output.push_str(&Self::format_message(message));
        }
        output
    }

    fn format_message(message: &Message) -> String {
        let label = match message.role {
            Role::User => "you".cyan().bold(),
            Role::Assistant => "assistant".yellow().bold(),
            Role::System => "system".magenta().bold(),
        };
        let time = message.timestamp.with_timezone(&Local).format("%H:%M");
        let failed = if message.failed {
            format!(" {}", "[not delivered]".red())
        } else {
            String::new()
        };
        format!(
            "\n{} {}{}\n{}\n",
            label,
            time.to_string().dimmed(),
            failed,
            message.content
        )
    }

    /// Current provider settings with the key masked.
    pub fn format_provider_config(config: &ProviderConfig) -> String {
        let key = if config.has_api_key() {
            mask_key(&config.api_key).green()
        } else {
            "not set".red()
        };
        format!(
            "{} {}\n{} {}\n",
            "API key:".cyan().bold(),
            key,
            "Model:  ".cyan().bold(),
            config.model
        )
    }

    pub fn format_notice(notice: &Notice) -> String {
        let title = match notice.level {
            NoticeLevel::Info => notice.title.green().bold(),
            NoticeLevel::Warning => notice.title.yellow().bold(),
            NoticeLevel::Error => notice.title.red().bold(),
        };
        format!("{}: {}", title, notice.description)
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(50);
        format!("{}\n{}\n{}", line.blue(), title.bold(), line.blue())
    }
}

/// Keep the last four characters of a key visible.
fn mask_key(key: &str) -> String {
    let count = key.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = key.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(8), tail)
}

/// Prints notices to stderr.
pub struct ConsoleNotices;

impl NoticeSink for ConsoleNotices {
    fn notify(&self, notice: Notice) {
        eprintln!("{}", ConsoleFormatter::format_notice(&notice));
    }
}
