use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::client::AgentService;
use crate::error::SessionError;
use crate::events::SessionIdentity;

/// What the server said about the session we asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// A fresh session was created
    Created,
    /// The server answered 400, which it uses for "session already exists"
    AlreadyExists,
}

/// Map the HTTP status of a session creation request to its outcome.
pub fn classify_session_response(status: u16, body: String) -> Result<SessionStatus, SessionError> {
    match status {
        200..=299 => Ok(SessionStatus::Created),
        400 => Ok(SessionStatus::AlreadyExists),
        _ => Err(SessionError::Rejected { status, body }),
    }
}

/// Makes sure the conversation's session exists on the agent server.
///
/// The creation request is issued at most once per manager. Later calls get
/// the cached outcome; calls made while the request is in flight wait for it.
pub struct SessionManager {
    service: Arc<dyn AgentService>,
    attempt: OnceCell<Result<SessionStatus, SessionError>>,
    issued: AtomicBool,
}

impl SessionManager {
    pub fn new(service: Arc<dyn AgentService>) -> Self {
        Self {
            service,
            attempt: OnceCell::new(),
            issued: AtomicBool::new(false),
        }
    }

    /// Create the session for `identity`, tolerating "already exists".
    ///
    /// Only the first call talks to the server; the identity passed to later
    /// calls is ignored.
    pub async fn ensure_session(
        &self,
        identity: &SessionIdentity,
    ) -> Result<SessionStatus, SessionError> {
        self.attempt
            .get_or_init(|| async {
                self.issued.store(true, Ordering::Release);
                let outcome = self.service.create_session(identity).await;
                match &outcome {
                    Ok(SessionStatus::Created) => info!(session = %identity, "session created"),
                    Ok(SessionStatus::AlreadyExists) => {
                        info!(session = %identity, "session already exists")
                    }
                    Err(e) => error!(session = %identity, error = %e, "session creation failed"),
                }
                outcome
            })
            .await
            .clone()
    }

    /// Whether the creation request has been issued.
    pub fn attempted(&self) -> bool {
        self.issued.load(Ordering::Acquire)
    }

    /// Outcome of the creation request, once it has completed.
    pub fn outcome(&self) -> Option<&Result<SessionStatus, SessionError>> {
        self.attempt.get()
    }
}
