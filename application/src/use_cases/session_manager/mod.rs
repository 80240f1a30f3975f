//! Session manager use case.
//!
//! Owns the conversation repository and provider settings, drives sends
//! against the [`CompletionGateway`], and exposes cancellation of in-flight
//! replies.
//!
//! All state sits behind one `std::sync::Mutex` that is never held across an
//! `.await`, so a `SessionManager` can be shared as `Arc<SessionManager>`
//! and `stop_streaming` may be called from another task while a send is
//! suspended.

mod streaming;

#[cfg(test)]
mod tests;

use crate::ports::completion_gateway::{CompletionGateway, GatewayError};
use crate::ports::conversation_logger::{ConversationLogger, NoConversationLogger};
use crate::ports::key_value_store::KeyValueStore;
use crate::ports::notice::{NoNotices, Notice, NoticeSink};
use crate::repository::conversation::ConversationRepository;
use crate::repository::provider::ProviderSettings;
use cogerphere_domain::{
    Conversation, ConversationId, DEFAULT_MODEL, Message, ProviderConfig, SendPhase,
    ValidationError,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Errors returned by [`SessionManager`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("A reply is already streaming for conversation {0}")]
    StreamInFlight(ConversationId),

    #[error(transparent)]
    Transport(#[from] GatewayError),
}

impl SessionError {
    /// Title of the notice shown for this error.
    pub fn title(&self) -> &'static str {
        match self {
            SessionError::Validation(e) => e.title(),
            SessionError::StreamInFlight(_) => "Busy",
            SessionError::Transport(_) => "Error",
        }
    }
}

/// One outstanding send.
struct InFlight {
    token: CancellationToken,
    phase: SendPhase,
}

struct SessionState {
    conversations: ConversationRepository,
    provider: ProviderSettings,
    in_flight: HashMap<ConversationId, InFlight>,
    config_loading: bool,
}

/// Conversation session manager.
///
/// Created once per process. Call [`restore`](Self::restore) before use to
/// load persisted conversations and provider configuration.
pub struct SessionManager {
    gateway: Arc<dyn CompletionGateway>,
    store: Arc<dyn KeyValueStore>,
    notices: Arc<dyn NoticeSink>,
    conversation_logger: Arc<dyn ConversationLogger>,
    default_model: String,
    state: Mutex<SessionState>,
}

impl SessionManager {
    pub fn new(gateway: Arc<dyn CompletionGateway>, store: Arc<dyn KeyValueStore>) -> Self {
        let state = SessionState {
            conversations: ConversationRepository::new(store.clone()),
            provider: ProviderSettings::new(store.clone(), DEFAULT_MODEL),
            in_flight: HashMap::new(),
            config_loading: true,
        };
        Self {
            gateway,
            store,
            notices: Arc::new(NoNotices),
            conversation_logger: Arc::new(NoConversationLogger),
            default_model: DEFAULT_MODEL.to_string(),
            state: Mutex::new(state),
        }
    }

    pub fn with_notice_sink(mut self, notices: Arc<dyn NoticeSink>) -> Self {
        self.notices = notices;
        self
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    /// Model substituted when the persisted one is missing or empty.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        let provider = ProviderSettings::new(self.store.clone(), self.default_model.clone());
        self.state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .provider = provider;
        self
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load persisted state. Recovery notices are forwarded to the notice
    /// sink and also returned.
    pub fn restore(&self) -> Vec<Notice> {
        let (conversations, mut notices) = ConversationRepository::load(self.store.clone());
        let (provider, provider_notice) =
            ProviderSettings::load(self.store.clone(), self.default_model.clone());
        notices.extend(provider_notice);

        {
            let mut state = self.lock();
            state.conversations = conversations;
            state.provider = provider;
            state.config_loading = false;
        }

        for notice in &notices {
            self.notices.notify(notice.clone());
        }
        notices
    }

    // ==================== Readers ====================

    pub fn conversations(&self) -> Vec<Conversation> {
        self.lock().conversations.conversations().to_vec()
    }

    pub fn active_conversation_id(&self) -> Option<ConversationId> {
        self.lock().conversations.active_id().cloned()
    }

    pub fn active_conversation(&self) -> Option<Conversation> {
        self.lock().conversations.active().cloned()
    }

    /// Messages of the active conversation, empty when none is active.
    pub fn active_messages(&self) -> Vec<Message> {
        self.lock()
            .conversations
            .active()
            .map(|c| c.messages().to_vec())
            .unwrap_or_default()
    }

    pub fn conversation(&self, id: &ConversationId) -> Option<Conversation> {
        self.lock().conversations.get(id).cloned()
    }

    /// `true` while any send is in flight.
    pub fn is_loading(&self) -> bool {
        !self.lock().in_flight.is_empty()
    }

    /// `true` until [`restore`](Self::restore) has run.
    pub fn is_config_loading(&self) -> bool {
        self.lock().config_loading
    }

    pub fn provider_config(&self) -> ProviderConfig {
        self.lock().provider.config().clone()
    }

    /// Phase of the send in flight for `id`, or `Idle`.
    pub fn phase(&self, id: &ConversationId) -> SendPhase {
        self.lock()
            .in_flight
            .get(id)
            .map(|f| f.phase)
            .unwrap_or(SendPhase::Idle)
    }

    // ==================== Conversation management ====================

    pub fn create_conversation(&self) -> ConversationId {
        self.lock().conversations.create_conversation()
    }

    /// Make `id` active. Existence is not validated.
    pub fn select_conversation(&self, id: ConversationId) {
        self.lock().conversations.select_conversation(id);
    }

    /// Delete a conversation, cancelling its in-flight send first.
    pub fn delete_conversation(&self, id: &ConversationId) -> bool {
        let removed = {
            let mut state = self.lock();
            if let Some(in_flight) = state.in_flight.get(id) {
                debug!(conversation_id = %id, "Cancelling in-flight send before delete");
                in_flight.token.cancel();
            }
            state.conversations.delete_conversation(id)
        };
        if removed {
            self.notices
                .notify(Notice::info("Chat Deleted", "The chat has been deleted"));
        }
        removed
    }

    /// Delete every conversation, cancelling all in-flight sends first.
    pub fn clear_conversations(&self) {
        {
            let mut state = self.lock();
            for in_flight in state.in_flight.values() {
                in_flight.token.cancel();
            }
            state.conversations.clear_all();
        }
        info!("Cleared all conversations");
        self.notices
            .notify(Notice::info("Chats Cleared", "All chats have been cleared"));
    }

    /// Replace and persist the provider configuration.
    pub fn set_provider_config(&self, config: ProviderConfig) {
        self.lock().provider.update(config);
        self.notices.notify(Notice::info(
            "API Key Updated",
            "Your API configuration has been updated",
        ));
    }

    // ==================== Cancellation ====================

    /// Cancel every in-flight send. Returns `false` if nothing was in flight.
    pub fn stop_streaming(&self) -> bool {
        let state = self.lock();
        for (id, in_flight) in &state.in_flight {
            debug!(conversation_id = %id, "Stop requested");
            in_flight.token.cancel();
        }
        !state.in_flight.is_empty()
    }

    /// Cancel the in-flight send of one conversation.
    pub fn stop_streaming_for(&self, id: &ConversationId) -> bool {
        match self.lock().in_flight.get(id) {
            Some(in_flight) => {
                debug!(conversation_id = %id, "Stop requested");
                in_flight.token.cancel();
                true
            }
            None => false,
        }
    }
}
