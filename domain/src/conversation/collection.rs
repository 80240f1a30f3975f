//! In-memory conversation collection with the active pointer.
//!
//! Every operation that names a conversation or message by id is a silent
//! no-op when the id is unknown: a streamed update may still arrive after its
//! conversation was deleted.

use super::entities::{Conversation, Message};
use super::value_objects::{ConversationId, MessageId};
use std::collections::HashSet;

/// Ordered set of conversations plus the zero-or-one active id.
#[derive(Debug, Clone, Default)]
pub struct ConversationCollection {
    conversations: Vec<Conversation>,
    active_id: Option<ConversationId>,
}

impl ConversationCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a collection from persisted parts.
    ///
    /// Conversations with a duplicate id are dropped (first one wins) and an
    /// active id that does not match a conversation is cleared.
    pub fn from_parts(
        conversations: Vec<Conversation>,
        active_id: Option<ConversationId>,
    ) -> Self {
        let mut seen = HashSet::new();
        let conversations: Vec<Conversation> = conversations
            .into_iter()
            .filter(|c| seen.insert(c.id().clone()))
            .collect();
        let active_id = active_id.filter(|id| conversations.iter().any(|c| c.id() == id));
        Self {
            conversations,
            active_id,
        }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn active_id(&self) -> Option<&ConversationId> {
        self.active_id.as_ref()
    }

    pub fn get(&self, id: &ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id() == id)
    }

    fn get_mut(&mut self, id: &ConversationId) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id() == id)
    }

    pub fn contains(&self, id: &ConversationId) -> bool {
        self.get(id).is_some()
    }

    /// The active conversation, if the pointer is set and resolves.
    pub fn active(&self) -> Option<&Conversation> {
        self.active_id.as_ref().and_then(|id| self.get(id))
    }

    /// Create an empty conversation at the tail and make it active.
    pub fn create(&mut self) -> ConversationId {
        self.create_with_id(ConversationId::generate())
    }

    /// Like [`create`](Self::create), using an id allocated beforehand.
    pub fn create_with_id(&mut self, id: ConversationId) -> ConversationId {
        self.conversations.push(Conversation::with_id(id.clone()));
        self.active_id = Some(id.clone());
        id
    }

    /// Point the active id at `id` without checking that it exists.
    pub fn select(&mut self, id: ConversationId) {
        self.active_id = Some(id);
    }

    /// Remove a conversation.
    ///
    /// If it was active, the first remaining conversation becomes active, or
    /// none when the collection is now empty.
    pub fn delete(&mut self, id: &ConversationId) -> Option<Conversation> {
        let index = self.conversations.iter().position(|c| c.id() == id)?;
        let removed = self.conversations.remove(index);
        if self.active_id.as_ref() == Some(id) {
            self.active_id = self.conversations.first().map(|c| c.id().clone());
        }
        Some(removed)
    }

    /// Empty the collection and clear the active pointer.
    pub fn clear(&mut self) {
        self.conversations.clear();
        self.active_id = None;
    }

    pub fn append_message(&mut self, id: &ConversationId, message: Message) -> bool {
        match self.get_mut(id) {
            Some(conversation) => {
                conversation.push(message);
                true
            }
            None => false,
        }
    }

    pub fn update_message_content(
        &mut self,
        id: &ConversationId,
        message_id: &MessageId,
        content: impl Into<String>,
    ) -> bool {
        self.get_mut(id)
            .is_some_and(|c| c.set_message_content(message_id, content))
    }

    pub fn remove_message(&mut self, id: &ConversationId, message_id: &MessageId) -> bool {
        self.get_mut(id)
            .is_some_and(|c| c.remove_message(message_id).is_some())
    }

    pub fn mark_failed(&mut self, id: &ConversationId, message_id: &MessageId) -> bool {
        self.get_mut(id).is_some_and(|c| c.mark_failed(message_id))
    }

    pub fn derive_title(&mut self, id: &ConversationId) -> bool {
        self.get_mut(id).is_some_and(Conversation::derive_title)
    }

    /// Drop interrupted-stream placeholders from every conversation.
    pub fn drop_placeholders(&mut self) -> usize {
        self.conversations
            .iter_mut()
            .map(Conversation::drop_placeholders)
            .sum()
    }
}
