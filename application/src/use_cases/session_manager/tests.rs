use super::*;
use crate::ports::completion_gateway::{CompletionRequest, StreamHandle};
use crate::ports::conversation_logger::{ConversationEvent, events};
use crate::ports::key_value_store::InMemoryStore;
use crate::ports::notice::NoticeLevel;
use crate::ports::progress::StreamProgressNotifier;
use crate::repository::keys;
use async_trait::async_trait;
use cogerphere_domain::{MessageId, Role, SendOutcome, StreamEvent};
use std::time::Duration;
use tokio::sync::mpsc;

// ==================== Mocks ====================

enum Script {
    /// Deliver these events, then close the stream.
    Events(Vec<StreamEvent>),
    /// Deliver these events and keep the stream open.
    Hang(Vec<StreamEvent>),
    /// Reject the request before any body arrives.
    Fail(GatewayError),
}

struct MockGateway {
    script: Script,
    requests: Mutex<Vec<CompletionRequest>>,
    open_streams: Mutex<Vec<mpsc::Sender<StreamEvent>>>,
}

impl MockGateway {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            requests: Mutex::new(Vec::new()),
            open_streams: Mutex::new(Vec::new()),
        })
    }

    fn replying(chunks: &[&str]) -> Arc<Self> {
        let mut events: Vec<StreamEvent> = chunks
            .iter()
            .map(|c| StreamEvent::Delta(c.to_string()))
            .collect();
        events.push(StreamEvent::Completed(chunks.concat()));
        Self::new(Script::Events(events))
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionGateway for MockGateway {
    async fn stream_completion(
        &self,
        request: CompletionRequest,
        _cancel: CancellationToken,
    ) -> Result<StreamHandle, GatewayError> {
        self.requests.lock().unwrap().push(request);
        let (events, keep_open) = match &self.script {
            Script::Fail(error) => return Err(error.clone()),
            Script::Events(events) => (events, false),
            Script::Hang(events) => (events, true),
        };
        let (tx, rx) = mpsc::channel(events.len() + 1);
        for event in events {
            tx.try_send(event.clone()).unwrap();
        }
        if keep_open {
            self.open_streams.lock().unwrap().push(tx);
        }
        Ok(StreamHandle::new(rx))
    }
}

#[derive(Default)]
struct RecordingNotices {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotices {
    fn all(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl NoticeSink for RecordingNotices {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

#[derive(Default)]
struct RecordingProgress {
    phases: Mutex<Vec<SendPhase>>,
    contents: Mutex<Vec<String>>,
}

impl StreamProgressNotifier for RecordingProgress {
    fn on_phase(&self, _conversation_id: &ConversationId, phase: SendPhase) {
        self.phases.lock().unwrap().push(phase);
    }

    fn on_content(&self, _conversation_id: &ConversationId, _message_id: &MessageId, content: &str) {
        self.contents.lock().unwrap().push(content.to_string());
    }
}

#[derive(Default)]
struct RecordingLogger {
    events: Mutex<Vec<&'static str>>,
}

impl ConversationLogger for RecordingLogger {
    fn log(&self, event: ConversationEvent) {
        self.events.lock().unwrap().push(event.event_type);
    }
}

struct Harness {
    manager: SessionManager,
    notices: Arc<RecordingNotices>,
    store: Arc<InMemoryStore>,
}

fn harness_with_store(gateway: Arc<MockGateway>, store: Arc<InMemoryStore>) -> Harness {
    let notices = Arc::new(RecordingNotices::default());
    let manager = SessionManager::new(gateway, store.clone()).with_notice_sink(notices.clone());
    manager.restore();
    Harness {
        manager,
        notices,
        store,
    }
}

fn harness(gateway: Arc<MockGateway>) -> Harness {
    let store = Arc::new(
        InMemoryStore::new().with_entry(keys::PROVIDER_CONFIG, r#"{"apiKey":"sk-test","model":"openai/gpt-4o-mini"}"#),
    );
    harness_with_store(gateway, store)
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn assistant_count(messages: &[Message]) -> usize {
    messages.iter().filter(|m| m.role == Role::Assistant).count()
}

// ==================== Validation ====================

#[tokio::test]
async fn whitespace_message_is_rejected_without_state_change() {
    let gateway = MockGateway::replying(&["unused"]);
    let h = harness(gateway.clone());

    let err = h.manager.send_message("   \n\t").await.unwrap_err();

    assert_eq!(err, SessionError::Validation(ValidationError::EmptyMessage));
    assert!(h.manager.conversations().is_empty());
    assert!(gateway.requests().is_empty());
    assert_eq!(h.notices.all()[0].title, "Message Required");
}

#[tokio::test]
async fn rejected_send_reports_validating_then_idle() {
    let gateway = MockGateway::replying(&["unused"]);
    let h = harness(gateway);
    let progress = RecordingProgress::default();

    h.manager
        .send_message_with_progress("", &progress)
        .await
        .unwrap_err();

    assert_eq!(*progress.phases.lock().unwrap(), vec![
        SendPhase::Validating,
        SendPhase::Idle,
    ]);
    assert!(h.manager.conversations().is_empty());
}

#[derive(Default)]
struct TargetProgress {
    targets: Mutex<Vec<(ConversationId, SendPhase)>>,
}

impl StreamProgressNotifier for TargetProgress {
    fn on_phase(&self, conversation_id: &ConversationId, phase: SendPhase) {
        self.targets
            .lock()
            .unwrap()
            .push((conversation_id.clone(), phase));
    }
}

#[tokio::test]
async fn validating_is_reported_against_the_conversation_it_creates() {
    let gateway = MockGateway::replying(&["ok"]);
    let h = harness(gateway);
    let progress = TargetProgress::default();

    let outcome = h
        .manager
        .send_message_with_progress("hi", &progress)
        .await
        .unwrap();

    let targets = progress.targets.lock().unwrap();
    assert_eq!(targets[0].1, SendPhase::Validating);
    assert!(targets.iter().all(|(id, _)| id == outcome.conversation_id()));
    assert_eq!(h.manager.active_conversation_id().as_ref(), Some(outcome.conversation_id()));
}

#[tokio::test]
async fn missing_api_key_emits_exactly_one_notice() {
    let gateway = MockGateway::replying(&["unused"]);
    let h = harness_with_store(gateway.clone(), Arc::new(InMemoryStore::new()));
    let id = h.manager.create_conversation();

    let err = h.manager.send_message("hello").await.unwrap_err();

    assert_eq!(err, SessionError::Validation(ValidationError::MissingApiKey));
    assert!(h.manager.conversation(&id).unwrap().messages().is_empty());
    let notices = h.notices.all();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert_eq!(notices[0].title, "API Key Required");
    assert_eq!(notices[0].description, "Please set your API key in settings");
    assert!(gateway.requests().is_empty());
}

// ==================== Streaming ====================

#[tokio::test]
async fn deltas_accumulate_into_final_content() {
    let gateway = MockGateway::replying(&["Hel", "lo"]);
    let h = harness(gateway);
    let progress = RecordingProgress::default();

    let outcome = h
        .manager
        .send_message_with_progress("hi", &progress)
        .await
        .unwrap();

    let SendOutcome::Completed { content, .. } = &outcome else {
        panic!("expected completion, got {:?}", outcome);
    };
    assert_eq!(content, "Hello");

    let messages = h.manager.active_messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "hi");
    assert_eq!(messages[1].content, "Hello");
    assert_eq!(assistant_count(&messages), 1);

    assert_eq!(*progress.contents.lock().unwrap(), vec!["Hel", "Hello"]);
    assert_eq!(*progress.phases.lock().unwrap(), vec![
        SendPhase::Validating,
        SendPhase::AwaitingFirstByte,
        SendPhase::Streaming,
        SendPhase::Completed,
    ]);
    assert!(!h.manager.is_loading());
}

#[tokio::test]
async fn send_creates_conversation_and_derives_title() {
    let gateway = MockGateway::replying(&["Sure."]);
    let h = harness(gateway);

    h.manager.send_message("Explain borrowing").await.unwrap();

    let conversations = h.manager.conversations();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].title(), "Explain borrowing");
    assert_eq!(h.manager.active_conversation_id().as_ref(), Some(conversations[0].id()));
}

#[tokio::test]
async fn send_with_dangling_active_id_creates_conversation() {
    let gateway = MockGateway::replying(&["ok"]);
    let h = harness(gateway);
    h.manager.select_conversation(ConversationId::new("ghost"));

    h.manager.send_message("hi").await.unwrap();

    let conversations = h.manager.conversations();
    assert_eq!(conversations.len(), 1);
    assert_ne!(conversations[0].id().as_str(), "ghost");
    assert_eq!(conversations[0].messages().len(), 2);
}

#[tokio::test]
async fn request_carries_history_without_placeholder() {
    let gateway = MockGateway::replying(&["second answer"]);
    let h = harness(gateway.clone());

    h.manager.send_message("first").await.unwrap();
    h.manager.send_message("second").await.unwrap();

    let requests = gateway.requests();
    assert_eq!(requests.len(), 2);
    let turns = &requests[1].turns;
    let shape: Vec<_> = turns.iter().map(|t| (t.role, t.content.as_str())).collect();
    assert_eq!(shape, vec![
        (Role::User, "first"),
        (Role::Assistant, "second answer"),
        (Role::User, "second"),
    ]);
    assert_eq!(requests[1].config.api_key, "sk-test");
}

#[tokio::test]
async fn title_is_not_rederived_on_later_sends() {
    let gateway = MockGateway::replying(&["ok"]);
    let h = harness(gateway);

    h.manager.send_message("first question").await.unwrap();
    h.manager.send_message("second question").await.unwrap();

    assert_eq!(h.manager.active_conversation().unwrap().title(), "first question");
}

#[tokio::test]
async fn completed_text_is_used_when_no_deltas_arrive() {
    let gateway = MockGateway::new(Script::Events(vec![StreamEvent::Completed(
        "whole reply".into(),
    )]));
    let h = harness(gateway);

    h.manager.send_message("hi").await.unwrap();

    assert_eq!(h.manager.active_messages()[1].content, "whole reply");
}

#[tokio::test]
async fn stream_closing_without_terminal_event_completes() {
    let gateway = MockGateway::new(Script::Events(vec![StreamEvent::Delta("partial".into())]));
    let h = harness(gateway);

    let outcome = h.manager.send_message("hi").await.unwrap();

    assert_eq!(outcome.phase(), SendPhase::Completed);
    assert_eq!(h.manager.active_messages()[1].content, "partial");
}

#[tokio::test]
async fn empty_reply_leaves_no_placeholder() {
    let gateway = MockGateway::new(Script::Events(vec![StreamEvent::Completed(String::new())]));
    let h = harness(gateway);

    h.manager.send_message("hi").await.unwrap();

    let messages = h.manager.active_messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::User);
}

#[tokio::test]
async fn streamed_content_is_persisted() {
    let gateway = MockGateway::replying(&["Hel", "lo"]);
    let h = harness(gateway);

    h.manager.send_message("hi").await.unwrap();

    let raw = h.store.get(keys::CONVERSATIONS).unwrap().unwrap();
    let saved: Vec<Conversation> = serde_json::from_str(&raw).unwrap();
    assert_eq!(saved[0].messages()[1].content, "Hello");
    assert_eq!(saved[0].title(), "hi");
}

// ==================== Failure ====================

#[tokio::test]
async fn unauthorized_reports_server_message_and_retracts_placeholder() {
    let gateway = MockGateway::new(Script::Fail(GatewayError::RequestFailed {
        status: 401,
        message: "bad key".into(),
    }));
    let h = harness(gateway);

    let err = h.manager.send_message("hi").await.unwrap_err();

    assert_eq!(err.to_string(), "bad key");
    let messages = h.manager.active_messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::User);
    assert!(messages[0].failed);
    assert!(h.manager.active_conversation().unwrap().has_default_title());

    let notices = h.notices.all();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].title, "Error");
    assert_eq!(notices[0].description, "bad key");
    assert!(!h.manager.is_loading());
}

#[tokio::test]
async fn mid_stream_error_fails_send() {
    let gateway = MockGateway::new(Script::Events(vec![
        StreamEvent::Delta("Hal".into()),
        StreamEvent::Error("upstream overloaded".into()),
    ]));
    let h = harness(gateway);
    let progress = RecordingProgress::default();

    let err = h
        .manager
        .send_message_with_progress("hi", &progress)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        SessionError::Transport(GatewayError::StreamError("upstream overloaded".into()))
    );
    assert_eq!(assistant_count(&h.manager.active_messages()), 0);
    assert_eq!(progress.phases.lock().unwrap().last(), Some(&SendPhase::Failed));
}

#[tokio::test]
async fn error_before_any_delta_marks_user_message_failed() {
    let gateway = MockGateway::new(Script::Events(vec![StreamEvent::Error(
        "No endpoints found".into(),
    )]));
    let h = harness(gateway);

    let err = h.manager.send_message("hi").await.unwrap_err();

    assert_eq!(
        err,
        SessionError::Transport(GatewayError::StreamError("No endpoints found".into()))
    );
    let messages = h.manager.active_messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "hi");
    assert!(messages[0].failed);
    let notices = h.notices.all();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert_eq!(notices[0].title, "Error");
    assert_eq!(notices[0].description, "No endpoints found");
}

#[tokio::test]
async fn failed_user_message_is_resent_in_history() {
    let gateway = MockGateway::new(Script::Fail(GatewayError::ConnectionError("refused".into())));
    let h = harness(gateway.clone());

    h.manager.send_message("one").await.unwrap_err();
    h.manager.send_message("two").await.unwrap_err();

    let turns = &gateway.requests()[1].turns;
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].content, "one");
}

// ==================== Cancellation ====================

#[tokio::test]
async fn stop_streaming_retracts_placeholder_and_keeps_user_message() {
    let gateway = MockGateway::new(Script::Hang(vec![StreamEvent::Delta("partial".into())]));
    let h = harness(gateway);
    let manager = &h.manager;

    let stop = async {
        wait_until(|| {
            manager
                .active_messages()
                .last()
                .is_some_and(|m| m.content == "partial")
        })
        .await;
        let id = manager.active_conversation_id().unwrap();
        assert_eq!(manager.phase(&id), SendPhase::Streaming);
        assert!(manager.is_loading());
        manager.stop_streaming()
    };
    let (outcome, stopped) = tokio::join!(manager.send_message("hi"), stop);

    assert!(stopped);
    assert_eq!(outcome.unwrap().phase(), SendPhase::Cancelled);
    let messages = manager.active_messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "hi");
    assert!(!messages[0].failed);
    assert!(h.notices.all().is_empty());
    assert!(!manager.is_loading());
}

#[tokio::test]
async fn stop_streaming_when_idle_is_noop() {
    let h = harness(MockGateway::replying(&["x"]));
    assert!(!h.manager.stop_streaming());
    assert!(!h.manager.stop_streaming_for(&ConversationId::new("none")));
}

#[tokio::test]
async fn second_send_on_same_conversation_is_rejected() {
    let gateway = MockGateway::new(Script::Hang(vec![StreamEvent::Delta("…".into())]));
    let h = harness(gateway.clone());
    let manager = &h.manager;

    let second = async {
        wait_until(|| manager.is_loading()).await;
        let result = manager.send_message("again").await;
        let id = manager.active_conversation_id().unwrap();
        assert!(manager.stop_streaming_for(&id));
        result
    };
    let (first, second) = tokio::join!(manager.send_message("hi"), second);

    assert!(matches!(second, Err(SessionError::StreamInFlight(_))));
    assert_eq!(first.unwrap().phase(), SendPhase::Cancelled);
    assert_eq!(gateway.requests().len(), 1);
    assert_eq!(manager.active_messages().len(), 1);
}

#[tokio::test]
async fn deleting_streaming_conversation_cancels_first() {
    let gateway = MockGateway::new(Script::Hang(vec![StreamEvent::Delta("partial".into())]));
    let h = harness(gateway);
    let manager = &h.manager;

    let delete = async {
        wait_until(|| manager.is_loading()).await;
        let id = manager.active_conversation_id().unwrap();
        assert!(manager.delete_conversation(&id));
        id
    };
    let (outcome, deleted) = tokio::join!(manager.send_message("hi"), delete);

    assert_eq!(
        outcome.unwrap(),
        SendOutcome::Cancelled {
            conversation_id: deleted.clone()
        }
    );
    assert!(manager.conversation(&deleted).is_none());
    assert!(manager.conversations().is_empty());
    assert!(!manager.is_loading());
}

// ==================== Management ====================

#[tokio::test]
async fn management_operations_emit_notices() {
    let h = harness(MockGateway::replying(&["x"]));
    let a = h.manager.create_conversation();
    h.manager.create_conversation();

    assert!(h.manager.delete_conversation(&a));
    h.manager.clear_conversations();
    h.manager
        .set_provider_config(ProviderConfig::new("sk-new", "meta-llama/llama-3-8b"));

    let titles: Vec<_> = h.notices.all().into_iter().map(|n| n.title).collect();
    assert_eq!(titles, vec!["Chat Deleted", "Chats Cleared", "API Key Updated"]);
    assert!(h.manager.conversations().is_empty());
    assert_eq!(h.manager.active_conversation_id(), None);
    assert_eq!(h.manager.provider_config().model, "meta-llama/llama-3-8b");
}

#[tokio::test]
async fn delete_of_active_falls_back_to_first() {
    let h = harness(MockGateway::replying(&["x"]));
    let a = h.manager.create_conversation();
    let b = h.manager.create_conversation();

    h.manager.delete_conversation(&b);

    assert_eq!(h.manager.active_conversation_id(), Some(a));
}

#[test]
fn restore_loads_persisted_state() {
    let store = Arc::new(InMemoryStore::new());
    {
        let first = SessionManager::new(MockGateway::replying(&["x"]), store.clone());
        first.restore();
        first.set_provider_config(ProviderConfig::new("sk-1", ""));
        first.create_conversation();
    }

    let second = SessionManager::new(MockGateway::replying(&["x"]), store)
        .with_default_model("mistralai/mistral-7b-instruct");
    assert!(second.is_config_loading());
    let notices = second.restore();

    assert!(notices.is_empty());
    assert!(!second.is_config_loading());
    assert_eq!(second.conversations().len(), 1);
    assert!(second.active_conversation().is_some());
    assert_eq!(second.provider_config().api_key, "sk-1");
    assert_eq!(second.provider_config().model, DEFAULT_MODEL);
}

#[test]
fn restore_forwards_recovery_notices() {
    let store = Arc::new(InMemoryStore::new().with_entry(keys::CONVERSATIONS, "garbage"));
    let notices = Arc::new(RecordingNotices::default());
    let manager = SessionManager::new(MockGateway::replying(&["x"]), store)
        .with_notice_sink(notices.clone());

    let returned = manager.restore();

    assert_eq!(returned.len(), 1);
    assert_eq!(notices.all(), returned);
    assert!(manager.conversations().is_empty());
}

#[tokio::test]
async fn transcript_events_follow_send_lifecycle() {
    let logger = Arc::new(RecordingLogger::default());
    let store = Arc::new(
        InMemoryStore::new().with_entry(keys::PROVIDER_CONFIG, r#"{"apiKey":"sk","model":"m"}"#),
    );
    let manager = SessionManager::new(MockGateway::replying(&["ok"]), store)
        .with_conversation_logger(logger.clone());
    manager.restore();

    manager.send_message("hi").await.unwrap();

    assert_eq!(*logger.events.lock().unwrap(), vec![
        events::MESSAGE_SENT,
        events::STREAM_COMPLETED
    ]);
}
