//! Conversation domain entities

use super::value_objects::{ChatTurn, ConversationId, MessageId};
use crate::core::string::truncate_chars;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title every conversation starts with until one is derived.
pub const NEW_CHAT_TITLE: &str = "New Chat";

/// Maximum number of characters kept when deriving a title.
pub const TITLE_MAX_CHARS: usize = 50;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message in a conversation (Entity)
///
/// Assistant content is replaced wholesale on every streamed delta; the
/// stored string is always the complete text received so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Set on a user message whose reply could not be obtained.
    #[serde(default, alias = "error")]
    pub failed: bool,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            failed: false,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Empty assistant message inserted before any output arrives.
    pub fn placeholder() -> Self {
        Self::assistant(String::new())
    }

    /// An assistant message that has not received any content yet.
    pub fn is_placeholder(&self) -> bool {
        self.role == Role::Assistant && self.content.is_empty()
    }

    pub fn to_turn(&self) -> ChatTurn {
        ChatTurn::new(self.role, self.content.clone())
    }
}

/// One ordered thread of messages (Entity)
///
/// Messages are append-only: the only mutations after insertion are content
/// replacement, the `failed` flag, and retraction of a single message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    id: ConversationId,
    title: String,
    messages: Vec<Message>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::with_id(ConversationId::generate())
    }

    /// Empty conversation with a caller-chosen id.
    pub fn with_id(id: ConversationId) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: NEW_CHAT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns `true` while the title is still the sentinel.
    pub fn has_default_title(&self) -> bool {
        self.title == NEW_CHAT_TITLE
    }

    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    fn message_mut(&mut self, id: &MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| &m.id == id)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Append a message at the tail.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.touch();
    }

    /// Replace the content of one message. Returns `false` if it is missing.
    pub fn set_message_content(&mut self, id: &MessageId, content: impl Into<String>) -> bool {
        let Some(message) = self.message_mut(id) else {
            return false;
        };
        message.content = content.into();
        self.touch();
        true
    }

    /// Retract one message, preserving the order of the rest.
    pub fn remove_message(&mut self, id: &MessageId) -> Option<Message> {
        let index = self.messages.iter().position(|m| &m.id == id)?;
        let removed = self.messages.remove(index);
        self.touch();
        Some(removed)
    }

    /// Flag a message as failed. Returns `false` if it is missing.
    pub fn mark_failed(&mut self, id: &MessageId) -> bool {
        let Some(message) = self.message_mut(id) else {
            return false;
        };
        message.failed = true;
        self.touch();
        true
    }

    /// Derive the title from the most recent user message.
    ///
    /// Only applies while the title is still [`NEW_CHAT_TITLE`]; once a title
    /// has been derived this is a no-op. Returns `true` if the title changed.
    pub fn derive_title(&mut self) -> bool {
        if !self.has_default_title() {
            return false;
        }
        let Some(last_user) = self.messages.iter().rev().find(|m| m.role == Role::User) else {
            return false;
        };
        self.title = truncate_chars(&last_user.content, TITLE_MAX_CHARS);
        true
    }

    /// The full history reduced to `{role, content}` pairs.
    pub fn turns(&self) -> Vec<ChatTurn> {
        self.messages.iter().map(Message::to_turn).collect()
    }

    /// Drop empty assistant messages left behind by an interrupted stream.
    ///
    /// Returns the number of messages removed.
    pub fn drop_placeholders(&mut self) -> usize {
        let before = self.messages.len();
        self.messages.retain(|m| !m.is_placeholder());
        before - self.messages.len()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
