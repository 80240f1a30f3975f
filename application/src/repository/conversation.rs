//! Conversation repository
//!
//! Wraps the domain [`ConversationCollection`] and mirrors it to the store
//! under [`keys::CONVERSATIONS`] and [`keys::CURRENT_CONVERSATION_ID`].

use super::keys;
use crate::ports::key_value_store::KeyValueStore;
use crate::ports::notice::Notice;
use cogerphere_domain::{Conversation, ConversationCollection, ConversationId, Message, MessageId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Title of the notice raised when persisted state cannot be read.
pub const STORAGE_NOTICE_TITLE: &str = "Storage";

/// In-memory conversation collection backed by a key/value store.
pub struct ConversationRepository {
    store: Arc<dyn KeyValueStore>,
    collection: ConversationCollection,
}

impl ConversationRepository {
    /// Empty repository that persists to `store`. Nothing is read.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            collection: ConversationCollection::new(),
        }
    }

    /// Load the collection from `store`, recovering from bad data.
    ///
    /// A corrupt conversation list is discarded with a warning notice. A
    /// dangling active id is cleared. Empty assistant placeholders left by an
    /// interrupted stream are dropped.
    pub fn load(store: Arc<dyn KeyValueStore>) -> (Self, Vec<Notice>) {
        let mut notices = Vec::new();

        let conversations = match store.get(keys::CONVERSATIONS) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Conversation>>(&raw) {
                Ok(conversations) => conversations,
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable conversation list");
                    notices.push(Notice::warning(
                        STORAGE_NOTICE_TITLE,
                        "Failed to load saved chats",
                    ));
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read conversation list");
                notices.push(Notice::warning(
                    STORAGE_NOTICE_TITLE,
                    "Failed to load saved chats",
                ));
                Vec::new()
            }
        };

        let active_id = match store.get(keys::CURRENT_CONVERSATION_ID) {
            Ok(raw) => raw
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map(ConversationId::new),
            Err(e) => {
                warn!(error = %e, "Failed to read active conversation id");
                None
            }
        };

        let requested_active = active_id.clone();
        let mut collection = ConversationCollection::from_parts(conversations, active_id);
        if requested_active.is_some() && collection.active_id().is_none() {
            debug!(
                active_id = ?requested_active,
                "Cleared active id that no longer references a conversation"
            );
        }

        let dropped = collection.drop_placeholders();
        if dropped > 0 {
            debug!(dropped, "Dropped empty placeholders left by an interrupted stream");
        }

        info!(
            conversations = collection.len(),
            active = ?collection.active_id().map(ConversationId::as_str),
            "Loaded conversations"
        );

        let repository = Self { store, collection };
        if dropped > 0 || requested_active.as_ref() != repository.collection.active_id() {
            repository.persist();
        }
        (repository, notices)
    }

    pub fn conversations(&self) -> &[Conversation] {
        self.collection.conversations()
    }

    pub fn active_id(&self) -> Option<&ConversationId> {
        self.collection.active_id()
    }

    pub fn active(&self) -> Option<&Conversation> {
        self.collection.active()
    }

    pub fn get(&self, id: &ConversationId) -> Option<&Conversation> {
        self.collection.get(id)
    }

    pub fn create_conversation(&mut self) -> ConversationId {
        self.create_conversation_with_id(ConversationId::generate())
    }

    /// Create a conversation under an id the caller already handed out.
    pub fn create_conversation_with_id(&mut self, id: ConversationId) -> ConversationId {
        let id = self.collection.create_with_id(id);
        debug!(conversation_id = %id, "Created conversation");
        self.persist();
        id
    }

    /// Set the active id. Existence is not checked.
    pub fn select_conversation(&mut self, id: ConversationId) {
        self.collection.select(id);
        self.persist_active();
    }

    pub fn delete_conversation(&mut self, id: &ConversationId) -> bool {
        let removed = self.collection.delete(id).is_some();
        if removed {
            debug!(conversation_id = %id, "Deleted conversation");
        }
        self.persist();
        removed
    }

    pub fn clear_all(&mut self) {
        self.collection.clear();
        self.persist();
    }

    pub fn append_message(&mut self, id: &ConversationId, message: Message) -> bool {
        self.mutate(|c| c.append_message(id, message))
    }

    pub fn update_message_content(
        &mut self,
        id: &ConversationId,
        message_id: &MessageId,
        content: impl Into<String>,
    ) -> bool {
        self.mutate(|c| c.update_message_content(id, message_id, content))
    }

    pub fn remove_message(&mut self, id: &ConversationId, message_id: &MessageId) -> bool {
        self.mutate(|c| c.remove_message(id, message_id))
    }

    pub fn mark_failed(&mut self, id: &ConversationId, message_id: &MessageId) -> bool {
        self.mutate(|c| c.mark_failed(id, message_id))
    }

    pub fn derive_title(&mut self, id: &ConversationId) -> bool {
        self.mutate(|c| c.derive_title(id))
    }

    fn mutate(&mut self, f: impl FnOnce(&mut ConversationCollection) -> bool) -> bool {
        let changed = f(&mut self.collection);
        if changed {
            self.persist_conversations();
        }
        changed
    }

    fn persist(&self) {
        self.persist_conversations();
        self.persist_active();
    }

    fn persist_conversations(&self) {
        let json = match serde_json::to_string(self.collection.conversations()) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize conversations");
                return;
            }
        };
        if let Err(e) = self.store.set(keys::CONVERSATIONS, &json) {
            warn!(error = %e, "Failed to persist conversations");
        }
    }

    fn persist_active(&self) {
        let result = match self.collection.active_id() {
            Some(id) => self.store.set(keys::CURRENT_CONVERSATION_ID, id.as_str()),
            None => self.store.remove(keys::CURRENT_CONVERSATION_ID),
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist active conversation id");
        }
    }
}
