use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tracing::warn;

use crate::client::AgentService;
use crate::conversation::{ConversationClient, ReplyOrder, SendOutcome, SendState};
use crate::error::{SessionError, SESSION_ERROR_TEXT};
use crate::events::SessionIdentity;
use crate::session::{SessionManager, SessionStatus};
use crate::transcript::Transcript;

/// Drives one interface session: owns the transcript and sequences session
/// setup before every message exchange.
pub struct AgentOrchestrator {
    service: Arc<dyn AgentService>,
    session: Arc<SessionManager>,
    conversation: ConversationClient,
    identity: SessionIdentity,
    transcript: Transcript,
}

impl AgentOrchestrator {
    pub fn new(service: Arc<dyn AgentService>, identity: SessionIdentity, order: ReplyOrder) -> Self {
        let session = Arc::new(SessionManager::new(Arc::clone(&service)));

        Self {
            service,
            session,
            conversation: ConversationClient::new(order),
            identity,
            transcript: Transcript::new(),
        }
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_busy(&self) -> bool {
        self.conversation.is_busy()
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Future that performs the session creation attempt.
    ///
    /// Detached from `self` so an event loop can spawn it and hand the result
    /// back through [`AgentOrchestrator::apply_session_outcome`].
    pub fn session_task(&self) -> BoxFuture<'static, Result<SessionStatus, SessionError>> {
        let session = Arc::clone(&self.session);
        let identity = self.identity.clone();
        async move { session.ensure_session(&identity).await }.boxed()
    }

    /// Surface a failed session attempt as a notice; "already exists" and
    /// success stay silent.
    pub fn apply_session_outcome(&mut self, outcome: &Result<SessionStatus, SessionError>) {
        if outcome.is_err() {
            self.transcript.push_agent(SESSION_ERROR_TEXT);
        }
    }

    /// Ensure the session exists, reporting a failure in the transcript.
    pub async fn initialize(&mut self) -> Result<SessionStatus, SessionError> {
        let outcome = self.session_task().await;
        self.apply_session_outcome(&outcome);
        outcome
    }

    /// Record the user's message and return the request future, or `None`
    /// when the text is blank or a send is already in flight.
    ///
    /// The future first waits for the session attempt, issuing it if nobody
    /// has yet, so no message ever reaches the server ahead of it.
    pub fn submit(&mut self, text: &str) -> Option<BoxFuture<'static, SendOutcome>> {
        let pending = self
            .conversation
            .begin(&self.identity, text, &mut self.transcript)?;

        let service = Arc::clone(&self.service);
        let session = Arc::clone(&self.session);
        let identity = self.identity.clone();

        Some(async move {
            if let Err(e) = session.ensure_session(&identity).await {
                warn!(error = %e, "sending without a confirmed session");
            }
            pending.execute(service.as_ref()).await
        }
        .boxed())
    }

    /// Append the reply for a finished request.
    pub fn complete(&mut self, outcome: SendOutcome) -> SendState {
        self.conversation.finish(outcome, &mut self.transcript)
    }

    /// Submit and wait for the reply. `None` means the send was rejected.
    pub async fn send(&mut self, text: &str) -> Option<SendState> {
        let request = self.submit(text)?;
        let outcome = request.await;
        Some(self.complete(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MessageSendError, SEND_ERROR_TEXT};
    use crate::events::TranscriptRole;
    use crate::protocol::{EventContent, InboundEvent, Part, RunRequest};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingService {
        session_status: Option<u16>,
        calls: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl AgentService for RecordingService {
        async fn create_session(
            &self,
            _identity: &SessionIdentity,
        ) -> Result<SessionStatus, SessionError> {
            self.calls.lock().unwrap().push("session");
            match self.session_status {
                Some(status) => crate::session::classify_session_response(status, String::new()),
                None => Err(SessionError::Transport("connection refused".into())),
            }
        }

        async fn run(&self, _request: &RunRequest) -> Result<Vec<InboundEvent>, MessageSendError> {
            self.calls.lock().unwrap().push("run");
            Ok(vec![InboundEvent {
                content: Some(EventContent {
                    parts: vec![Part::text("Hi there")],
                    role: Some("model".into()),
                }),
                ..Default::default()
            }])
        }
    }

    fn orchestrator(service: Arc<RecordingService>) -> AgentOrchestrator {
        let identity = SessionIdentity::new("doc-test-model", "0", "1").unwrap();
        AgentOrchestrator::new(service, identity, ReplyOrder::Reversed)
    }

    #[tokio::test]
    async fn already_existing_session_is_silent() {
        let service = Arc::new(RecordingService { session_status: Some(400), ..Default::default() });
        let mut agent = orchestrator(service);

        assert_eq!(agent.initialize().await, Ok(SessionStatus::AlreadyExists));
        assert!(agent.transcript().is_empty());
    }

    #[tokio::test]
    async fn failed_session_is_surfaced_but_chat_continues() {
        let service = Arc::new(RecordingService::default());
        let mut agent = orchestrator(service);

        assert!(agent.initialize().await.is_err());
        assert_eq!(agent.transcript().len(), 1);
        assert_eq!(agent.transcript().entries()[0].role, TranscriptRole::Agent);
        assert_eq!(agent.transcript().entries()[0].text, SESSION_ERROR_TEXT);

        assert_eq!(agent.send("Hello").await, Some(SendState::Succeeded));
        assert_eq!(agent.transcript().last().unwrap().text, "Hi there\n");
        assert_ne!(agent.transcript().last().unwrap().text, SEND_ERROR_TEXT);
    }

    #[tokio::test]
    async fn session_attempt_precedes_first_message() {
        let service = Arc::new(RecordingService { session_status: Some(200), ..Default::default() });
        let mut agent = orchestrator(Arc::clone(&service));

        agent.send("Hello").await;
        agent.send("Again").await;

        assert_eq!(*service.calls.lock().unwrap(), vec!["session", "run", "run"]);
        assert!(agent.session().attempted());
    }

    #[tokio::test]
    async fn submit_while_busy_is_rejected() {
        let service = Arc::new(RecordingService { session_status: Some(200), ..Default::default() });
        let mut agent = orchestrator(service);

        let request = agent.submit("Hello").unwrap();
        assert!(agent.is_busy());
        assert!(agent.submit("Second").is_none());
        assert_eq!(agent.transcript().len(), 1);

        let outcome = request.await;
        assert_eq!(agent.complete(outcome), SendState::Succeeded);
        assert!(!agent.is_busy());
        assert_eq!(agent.transcript().len(), 2);
    }
}
