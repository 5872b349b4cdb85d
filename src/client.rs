use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::config::Config;
use crate::error::{MessageSendError, SessionError};
use crate::events::SessionIdentity;
use crate::protocol::{InboundEvent, RunRequest};
use crate::session::{classify_session_response, SessionStatus};

/// Remote conversational agent service.
///
/// The HTTP implementation is [`HttpAgentClient`]; the seam exists so the
/// session and conversation logic can run against any transport.
#[async_trait]
pub trait AgentService: Send + Sync {
    /// Create the session named by `identity`.
    async fn create_session(
        &self,
        identity: &SessionIdentity,
    ) -> std::result::Result<SessionStatus, SessionError>;

    /// Deliver one message and return every event the agent produced for it.
    async fn run(
        &self,
        request: &RunRequest,
    ) -> std::result::Result<Vec<InboundEvent>, MessageSendError>;
}

/// reqwest-backed client for the agent server's JSON API
#[derive(Clone)]
pub struct HttpAgentClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAgentClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self::with_client(&config.base_url, client))
    }

    /// Build from an existing reqwest client (no timeout is added).
    pub fn with_client(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn session_url(&self, identity: &SessionIdentity) -> String {
        format!("{}/{}", self.base_url, identity.session_path())
    }

    fn run_url(&self) -> String {
        format!("{}/run", self.base_url)
    }
}

#[async_trait]
impl AgentService for HttpAgentClient {
    async fn create_session(
        &self,
        identity: &SessionIdentity,
    ) -> std::result::Result<SessionStatus, SessionError> {
        let url = self.session_url(identity);
        debug!(%url, "creating session");

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        let status = response.status();
        let body = if status.is_success() {
            String::new()
        } else {
            response.text().await.unwrap_or_default()
        };

        classify_session_response(status.as_u16(), body)
    }

    async fn run(
        &self,
        request: &RunRequest,
    ) -> std::result::Result<Vec<InboundEvent>, MessageSendError> {
        let url = self.run_url();
        debug!(%url, session = %request.session_id, "sending message");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MessageSendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(transport_error)?;
        let events: Vec<InboundEvent> = serde_json::from_str(&body)
            .map_err(|e| MessageSendError::Decode(e.to_string()))?;

        debug!(events = events.len(), "received agent reply");
        Ok(events)
    }
}

fn transport_error(error: reqwest::Error) -> MessageSendError {
    if error.is_timeout() {
        MessageSendError::Timeout
    } else {
        MessageSendError::Transport(error.to_string())
    }
}
