//! One-message-at-a-time exchange with the agent.
//!
//! A send goes through three phases so the caller's event loop is never
//! blocked on the network:
//!
//! 1. [`ConversationClient::begin`] records the user's message and claims the
//!    busy flag,
//! 2. [`PendingSend::execute`] performs the request (the only await point),
//! 3. [`ConversationClient::finish`] appends the agent's reply, or an error
//!    notice, and releases the flag.
//!
//! [`ConversationClient::send`] runs all three back to back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::client::AgentService;
use crate::error::{MessageSendError, SEND_ERROR_TEXT};
use crate::events::SessionIdentity;
use crate::protocol::{InboundEvent, OutboundMessage, RunRequest};
use crate::transcript::Transcript;

/// How reply fragments are joined into the displayed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyOrder {
    /// Each fragment goes in front of what was collected so far, followed by
    /// a newline: `[A, B]` reads `"BA\n\n"`.
    #[default]
    Reversed,
    /// Fragments in arrival order, each followed by a newline: `"A\nB\n"`.
    Chronological,
}

/// Join the text of every part of every event into one message.
///
/// Parts without text, or with empty text, are skipped. No events yields the
/// empty string.
pub fn aggregate_reply(events: &[InboundEvent], order: ReplyOrder) -> String {
    let mut message = String::new();
    for text in events.iter().flat_map(|event| event.texts()) {
        message = match order {
            ReplyOrder::Reversed => format!("{text}{message}\n"),
            ReplyOrder::Chronological => format!("{message}{text}\n"),
        };
    }
    message
}

/// Lifecycle of a single send: `Idle -> Sending -> {Succeeded, Failed} -> Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    Idle,
    Sending,
    Succeeded,
    Failed,
}

/// Holds the busy flag; releases it on drop so a cancelled or panicked
/// request still frees the client.
#[derive(Debug)]
struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self { flag: Arc::clone(flag) })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// A message that has been recorded in the transcript but not yet delivered.
#[derive(Debug)]
pub struct PendingSend {
    request: RunRequest,
    guard: BusyGuard,
}

impl PendingSend {
    pub fn request(&self) -> &RunRequest {
        &self.request
    }

    /// Deliver the message and wait for the whole reply.
    pub async fn execute(self, service: &dyn AgentService) -> SendOutcome {
        let result = service.run(&self.request).await;
        SendOutcome {
            result,
            _guard: self.guard,
        }
    }
}

/// Result of a delivered message, waiting to be written to the transcript.
#[derive(Debug)]
pub struct SendOutcome {
    result: Result<Vec<InboundEvent>, MessageSendError>,
    _guard: BusyGuard,
}

impl SendOutcome {
    pub fn result(&self) -> &Result<Vec<InboundEvent>, MessageSendError> {
        &self.result
    }
}

/// Sends user messages and turns the agent's events into transcript entries.
#[derive(Debug, Clone, Default)]
pub struct ConversationClient {
    busy: Arc<AtomicBool>,
    order: ReplyOrder,
}

impl ConversationClient {
    pub fn new(order: ReplyOrder) -> Self {
        Self {
            busy: Arc::new(AtomicBool::new(false)),
            order,
        }
    }

    pub fn reply_order(&self) -> ReplyOrder {
        self.order
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn state(&self) -> SendState {
        if self.is_busy() {
            SendState::Sending
        } else {
            SendState::Idle
        }
    }

    /// Record `text` as the user's message and prepare its request.
    ///
    /// Returns `None`, leaving the transcript untouched, when the trimmed
    /// text is empty or another send is still in flight.
    pub fn begin(
        &self,
        identity: &SessionIdentity,
        text: &str,
        transcript: &mut Transcript,
    ) -> Option<PendingSend> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let Some(guard) = BusyGuard::acquire(&self.busy) else {
            debug!("send rejected, previous message still in flight");
            return None;
        };

        transcript.push_user(text);
        let request = RunRequest::new(identity, OutboundMessage::user(text));

        Some(PendingSend { request, guard })
    }

    /// Write the reply (or the error notice) and release the busy flag.
    pub fn finish(&self, outcome: SendOutcome, transcript: &mut Transcript) -> SendState {
        let SendOutcome { result, _guard } = outcome;
        match result {
            Ok(events) => {
                transcript.push_agent(aggregate_reply(&events, self.order));
                SendState::Succeeded
            }
            Err(e) => {
                error!(error = %e, "message send failed");
                transcript.push_agent(SEND_ERROR_TEXT);
                SendState::Failed
            }
        }
    }

    /// Run a complete exchange. `None` means the send was rejected.
    pub async fn send(
        &self,
        service: &dyn AgentService,
        identity: &SessionIdentity,
        text: &str,
        transcript: &mut Transcript,
    ) -> Option<SendState> {
        let pending = self.begin(identity, text, transcript)?;
        let outcome = pending.execute(service).await;
        Some(self.finish(outcome, transcript))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use crate::events::TranscriptRole;
    use crate::protocol::{EventContent, Part};
    use crate::session::SessionStatus;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn event(texts: &[&str]) -> InboundEvent {
        InboundEvent {
            content: Some(EventContent {
                parts: texts.iter().map(|t| Part::text(*t)).collect(),
                role: Some("model".to_string()),
            }),
            ..Default::default()
        }
    }

    fn identity() -> SessionIdentity {
        SessionIdentity::new("doc-test-model", "0", "1").unwrap()
    }

    /// Replays a canned reply and remembers every request it saw.
    struct ScriptedService {
        reply: Mutex<Option<Result<Vec<InboundEvent>, MessageSendError>>>,
        requests: Mutex<Vec<RunRequest>>,
    }

    impl ScriptedService {
        fn new(reply: Result<Vec<InboundEvent>, MessageSendError>) -> Self {
            Self {
                reply: Mutex::new(Some(reply)),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AgentService for ScriptedService {
        async fn create_session(
            &self,
            _identity: &SessionIdentity,
        ) -> Result<SessionStatus, SessionError> {
            Ok(SessionStatus::Created)
        }

        async fn run(&self, request: &RunRequest) -> Result<Vec<InboundEvent>, MessageSendError> {
            self.requests.lock().unwrap().push(request.clone());
            self.reply.lock().unwrap().take().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[test]
    fn reversed_order_prepends_each_fragment() {
        let events = vec![event(&["A"]), event(&["B"])];
        assert_eq!(aggregate_reply(&events, ReplyOrder::Reversed), "BA\n\n");
    }

    #[test]
    fn reversed_order_applies_within_an_event() {
        let events = vec![event(&["one", "two", "three"])];
        assert_eq!(aggregate_reply(&events, ReplyOrder::Reversed), "threetwoone\n\n\n");
    }

    #[test]
    fn chronological_order_appends() {
        let events = vec![event(&["A"]), event(&["B"])];
        assert_eq!(aggregate_reply(&events, ReplyOrder::Chronological), "A\nB\n");
    }

    #[test]
    fn empty_replies_aggregate_to_nothing() {
        assert_eq!(aggregate_reply(&[], ReplyOrder::Reversed), "");

        let blanks = vec![event(&[""]), InboundEvent::default(), event(&[])];
        assert_eq!(aggregate_reply(&blanks, ReplyOrder::Reversed), "");
        assert_eq!(aggregate_reply(&blanks, ReplyOrder::Chronological), "");
    }

    #[test]
    fn begin_records_trimmed_text_before_any_request() {
        let client = ConversationClient::default();
        let mut transcript = Transcript::new();

        let pending = client.begin(&identity(), "  Hello \n", &mut transcript).unwrap();

        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.entries()[0].role, TranscriptRole::User);
        assert_eq!(transcript.entries()[0].text, "Hello");
        assert_eq!(pending.request().new_message, OutboundMessage::user("Hello"));
        assert!(!pending.request().streaming);
        assert_eq!(client.state(), SendState::Sending);
    }

    #[test]
    fn blank_text_is_ignored() {
        let client = ConversationClient::default();
        let mut transcript = Transcript::new();

        assert!(client.begin(&identity(), " \t\n", &mut transcript).is_none());
        assert!(transcript.is_empty());
        assert!(!client.is_busy());
    }

    #[tokio::test]
    async fn send_while_busy_is_a_no_op() {
        let service = ScriptedService::new(Ok(vec![event(&["Hi"])]));
        let client = ConversationClient::default();
        let mut transcript = Transcript::new();

        let pending = client.begin(&identity(), "first", &mut transcript).unwrap();
        let rejected = client.send(&service, &identity(), "second", &mut transcript).await;

        assert_eq!(rejected, None);
        assert_eq!(transcript.len(), 1);
        assert!(service.requests.lock().unwrap().is_empty());

        let outcome = pending.execute(&service).await;
        assert_eq!(client.finish(outcome, &mut transcript), SendState::Succeeded);
        assert_eq!(transcript.len(), 2);
        assert_eq!(service.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failure_appends_notice_and_frees_client() {
        let service = ScriptedService::new(Err(MessageSendError::Transport("connection refused".into())));
        let client = ConversationClient::default();
        let mut transcript = Transcript::new();

        let state = client.send(&service, &identity(), "Hello", &mut transcript).await;

        assert_eq!(state, Some(SendState::Failed));
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.entries()[1].role, TranscriptRole::Agent);
        assert_eq!(transcript.entries()[1].text, SEND_ERROR_TEXT);
        assert_eq!(client.state(), SendState::Idle);

        let again = client.send(&service, &identity(), "Hello again", &mut transcript).await;
        assert_eq!(again, Some(SendState::Succeeded));
        assert_eq!(transcript.len(), 4);
    }

    #[tokio::test]
    async fn empty_reply_still_appends_agent_entry() {
        let service = ScriptedService::new(Ok(Vec::new()));
        let client = ConversationClient::default();
        let mut transcript = Transcript::new();

        client.send(&service, &identity(), "Hello", &mut transcript).await;

        let last = transcript.last().unwrap();
        assert_eq!(last.role, TranscriptRole::Agent);
        assert_eq!(last.text, "");
    }

    #[tokio::test]
    async fn dropped_pending_send_releases_busy_flag() {
        let client = ConversationClient::default();
        let mut transcript = Transcript::new();

        let pending = client.begin(&identity(), "Hello", &mut transcript).unwrap();
        assert!(client.is_busy());
        drop(pending);
        assert!(!client.is_busy());
    }
}
