//! Error types for session setup and message exchange.
//!
//! None of these are fatal to the interface: each one degrades to a
//! chat-style notice in the transcript so the user can simply try again.

use thiserror::Error;

/// Transcript text shown when a `/run` exchange fails for any reason.
pub const SEND_ERROR_TEXT: &str = "Error contacting server.";

/// Transcript text shown when the session could not be created.
pub const SESSION_ERROR_TEXT: &str = "Could not start a session with the agent server.";

/// Failure to create the conversational session on the remote service.
///
/// Cloneable so the single creation attempt can be cached and shared by
/// every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session creation rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("session creation failed: {0}")]
    Transport(String),
}

/// Failure during a `/run` exchange.
#[derive(Debug, Error)]
pub enum MessageSendError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("agent server returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode agent reply: {0}")]
    Decode(String),
    #[error("request timed out")]
    Timeout,
}

/// An identity component was empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} must not be empty")]
pub struct IdentityError {
    pub field: &'static str,
}
