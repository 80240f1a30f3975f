//! The send path: validate, stage messages, stream the reply, settle.

use super::{InFlight, SessionError, SessionManager};
use crate::ports::completion_gateway::{CompletionRequest, GatewayError};
use crate::ports::conversation_logger::{ConversationEvent, events};
use crate::ports::notice::Notice;
use crate::ports::progress::{NoStreamProgress, StreamProgressNotifier};
use cogerphere_domain::core::string::is_blank;
use cogerphere_domain::{
    Conversation, ConversationId, Message, MessageId, SendOutcome, SendPhase, StreamEvent,
    ValidationError,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A send that passed validation and has its messages staged.
struct PreparedSend {
    conversation_id: ConversationId,
    user_message_id: MessageId,
    placeholder_id: MessageId,
    token: CancellationToken,
    request: CompletionRequest,
}

/// How the streaming loop ended.
enum StreamResult {
    Completed(String),
    Failed(GatewayError),
    Cancelled,
}

impl SessionManager {
    /// Send `content` into the active conversation and wait for the reply.
    pub async fn send_message(&self, content: &str) -> Result<SendOutcome, SessionError> {
        self.send_message_with_progress(content, &NoStreamProgress)
            .await
    }

    /// Send `content` into the active conversation, reporting progress.
    ///
    /// Creates a conversation first when none is active. Cancellation via
    /// [`stop_streaming`](Self::stop_streaming) resolves to
    /// [`SendOutcome::Cancelled`], not an error.
    pub async fn send_message_with_progress(
        &self,
        content: &str,
        progress: &dyn StreamProgressNotifier,
    ) -> Result<SendOutcome, SessionError> {
        let target = self.send_target();
        progress.on_phase(&target, SendPhase::Validating);
        let prepared = match self.begin_send(content, &target) {
            Ok(prepared) => prepared,
            Err(e) => {
                progress.on_phase(&target, SendPhase::Idle);
                return Err(e);
            }
        };
        progress.on_phase(&prepared.conversation_id, SendPhase::AwaitingFirstByte);

        let result = self.stream_reply(&prepared, progress).await;
        self.finish_send(prepared, result, progress)
    }

    /// Conversation a send would land in: the active one, or the id a new
    /// conversation will be created under.
    fn send_target(&self) -> ConversationId {
        self.lock()
            .conversations
            .active()
            .map(|c| c.id().clone())
            .unwrap_or_else(ConversationId::generate)
    }

    fn begin_send(
        &self,
        content: &str,
        target: &ConversationId,
    ) -> Result<PreparedSend, SessionError> {
        let mut state = self.lock();

        let validation = if is_blank(content) {
            Err(ValidationError::EmptyMessage)
        } else {
            state.provider.config().ensure_ready()
        };
        if let Err(e) = validation {
            drop(state);
            debug!(error = %e, "Send rejected");
            self.notices.notify(Notice::error(e.title(), e.to_string()));
            return Err(e.into());
        }

        let conversation_id = if state.conversations.get(target).is_some() {
            target.clone()
        } else {
            state.conversations.create_conversation_with_id(target.clone())
        };

        if state.in_flight.contains_key(&conversation_id) {
            drop(state);
            let error = SessionError::StreamInFlight(conversation_id);
            warn!(error = %error, "Send rejected");
            self.notices
                .notify(Notice::warning(error.title(), error.to_string()));
            return Err(error);
        }

        let user_message = Message::user(content);
        let user_message_id = user_message.id.clone();
        state
            .conversations
            .append_message(&conversation_id, user_message);

        let turns = state
            .conversations
            .get(&conversation_id)
            .map(Conversation::turns)
            .unwrap_or_default();

        let placeholder = Message::placeholder();
        let placeholder_id = placeholder.id.clone();
        state
            .conversations
            .append_message(&conversation_id, placeholder);

        let token = CancellationToken::new();
        state.in_flight.insert(
            conversation_id.clone(),
            InFlight {
                token: token.clone(),
                phase: SendPhase::AwaitingFirstByte,
            },
        );
        let config = state.provider.config().clone();
        drop(state);

        info!(
            conversation_id = %conversation_id,
            model = %config.model,
            turns = turns.len(),
            "Sending message"
        );
        self.conversation_logger.log(ConversationEvent::new(
            events::MESSAGE_SENT,
            json!({
                "conversation_id": conversation_id.as_str(),
                "message_id": user_message_id.as_str(),
                "model": config.model,
                "content": content,
            }),
        ));

        Ok(PreparedSend {
            conversation_id,
            user_message_id,
            placeholder_id,
            token,
            request: CompletionRequest::new(config, turns),
        })
    }

    async fn stream_reply(
        &self,
        prepared: &PreparedSend,
        progress: &dyn StreamProgressNotifier,
    ) -> StreamResult {
        let token = &prepared.token;

        let mut handle = tokio::select! {
            biased;
            _ = token.cancelled() => return StreamResult::Cancelled,
            result = self.gateway.stream_completion(prepared.request.clone(), token.clone()) => {
                match result {
                    Ok(handle) => handle,
                    Err(GatewayError::Cancelled) => return StreamResult::Cancelled,
                    Err(e) => return StreamResult::Failed(e),
                }
            }
        };

        let mut buffer = String::new();
        loop {
            let event = tokio::select! {
                biased;
                _ = token.cancelled() => return StreamResult::Cancelled,
                event = handle.recv() => event,
            };

            match event {
                Some(StreamEvent::Delta(chunk)) => {
                    if chunk.is_empty() {
                        continue;
                    }
                    buffer.push_str(&chunk);
                    if self.record_delta(prepared, &buffer) {
                        progress.on_phase(&prepared.conversation_id, SendPhase::Streaming);
                    }
                    progress.on_content(&prepared.conversation_id, &prepared.placeholder_id, &buffer);
                }
                Some(StreamEvent::Completed(full)) => {
                    if buffer.is_empty() {
                        buffer = full;
                    }
                    return StreamResult::Completed(buffer);
                }
                Some(StreamEvent::Error(message)) => {
                    return StreamResult::Failed(GatewayError::StreamError(message));
                }
                // Producer went away without a terminal event
                None => return StreamResult::Completed(buffer),
            }
        }
    }

    /// Store the accumulated text. Returns `true` on the first delta.
    fn record_delta(&self, prepared: &PreparedSend, buffer: &str) -> bool {
        let mut state = self.lock();
        state.conversations.update_message_content(
            &prepared.conversation_id,
            &prepared.placeholder_id,
            buffer,
        );
        match state.in_flight.get_mut(&prepared.conversation_id) {
            Some(in_flight) if in_flight.phase == SendPhase::AwaitingFirstByte => {
                in_flight.phase = SendPhase::Streaming;
                true
            }
            _ => false,
        }
    }

    fn finish_send(
        &self,
        prepared: PreparedSend,
        result: StreamResult,
        progress: &dyn StreamProgressNotifier,
    ) -> Result<SendOutcome, SessionError> {
        let PreparedSend {
            conversation_id,
            user_message_id,
            placeholder_id,
            request,
            ..
        } = prepared;

        let (phase, outcome) = {
            let mut state = self.lock();
            state.in_flight.remove(&conversation_id);

            match result {
                StreamResult::Completed(content) => {
                    if content.is_empty() {
                        warn!(conversation_id = %conversation_id, "Stream completed without content");
                        state
                            .conversations
                            .remove_message(&conversation_id, &placeholder_id);
                    } else {
                        state.conversations.update_message_content(
                            &conversation_id,
                            &placeholder_id,
                            content.as_str(),
                        );
                    }
                    state.conversations.derive_title(&conversation_id);
                    (
                        SendPhase::Completed,
                        Ok(SendOutcome::Completed {
                            conversation_id: conversation_id.clone(),
                            message_id: placeholder_id.clone(),
                            content,
                        }),
                    )
                }
                StreamResult::Failed(error) => {
                    state
                        .conversations
                        .remove_message(&conversation_id, &placeholder_id);
                    state
                        .conversations
                        .mark_failed(&conversation_id, &user_message_id);
                    (SendPhase::Failed, Err(error))
                }
                StreamResult::Cancelled => {
                    state
                        .conversations
                        .remove_message(&conversation_id, &placeholder_id);
                    (
                        SendPhase::Cancelled,
                        Ok(SendOutcome::Cancelled {
                            conversation_id: conversation_id.clone(),
                        }),
                    )
                }
            }
        };

        let outcome = match outcome {
            Ok(SendOutcome::Completed {
                conversation_id,
                message_id,
                content,
            }) => {
                info!(
                    conversation_id = %conversation_id,
                    chars = content.chars().count(),
                    "Reply completed"
                );
                self.conversation_logger.log(ConversationEvent::new(
                    events::STREAM_COMPLETED,
                    json!({
                        "conversation_id": conversation_id.as_str(),
                        "message_id": message_id.as_str(),
                        "model": request.config.model,
                        "content": content,
                    }),
                ));
                Ok(SendOutcome::Completed {
                    conversation_id,
                    message_id,
                    content,
                })
            }
            Ok(cancelled) => {
                info!(conversation_id = %conversation_id, "Reply cancelled");
                self.conversation_logger.log(ConversationEvent::new(
                    events::STREAM_CANCELLED,
                    json!({ "conversation_id": conversation_id.as_str() }),
                ));
                Ok(cancelled)
            }
            Err(error) => {
                warn!(
                    conversation_id = %conversation_id,
                    status = ?error.status(),
                    error = %error,
                    "Reply failed"
                );
                self.conversation_logger.log(ConversationEvent::new(
                    events::STREAM_FAILED,
                    json!({
                        "conversation_id": conversation_id.as_str(),
                        "message_id": user_message_id.as_str(),
                        "status": error.status(),
                        "error": error.to_string(),
                    }),
                ));
                self.notices
                    .notify(Notice::error("Error", error.to_string()));
                Err(SessionError::Transport(error))
            }
        };

        progress.on_phase(&conversation_id, phase);
        outcome
    }
}
