use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::conversation::SendOutcome;
use crate::error::{IdentityError, SessionError};
use crate::session::SessionStatus;

/// Internal application events for coordinating between the event loop and
/// background request tasks
#[derive(Debug)]
pub enum AppEvent {
    /// The session creation attempt finished
    SessionResolved(Result<SessionStatus, SessionError>),

    /// A `/run` exchange finished
    ReplyReceived(SendOutcome),

    /// Request to exit the application
    ExitRequest,
}

/// Who produced a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptRole {
    User,
    Agent,
}

impl TranscriptRole {
    pub fn display_name(&self) -> &'static str {
        match self {
            TranscriptRole::User => "You",
            TranscriptRole::Agent => "Agent",
        }
    }
}

/// Individual transcript entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: TranscriptRole,
    pub text: String,
    /// Local time the entry was appended, for display only
    pub timestamp: DateTime<Local>,
}

impl TranscriptEntry {
    pub fn new(role: TranscriptRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Local::now(),
        }
    }
}

/// Identifies one conversation on the agent server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionIdentity {
    app_name: String,
    user_id: String,
    session_id: String,
}

impl SessionIdentity {
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        let identity = Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
        };

        for (field, value) in [
            ("app name", &identity.app_name),
            ("user id", &identity.user_id),
            ("session id", &identity.session_id),
        ] {
            if value.trim().is_empty() {
                return Err(IdentityError { field });
            }
        }

        Ok(identity)
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Path of the session resource, relative to the server base URL.
    pub fn session_path(&self) -> String {
        format!(
            "apps/{}/users/{}/sessions/{}",
            self.app_name, self.user_id, self.session_id
        )
    }
}

impl std::fmt::Display for SessionIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.app_name, self.user_id, self.session_id)
    }
}
