//! Terminal chat client for session-scoped conversational agent servers.
//!
//! The client creates (or reuses) a session at
//! `{base_url}/apps/{app}/users/{user}/sessions/{session}` and then posts
//! each user message to `{base_url}/run`, turning the returned events into a
//! single reply in an append-only transcript.

pub mod agent;
pub mod app;
pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod events;
pub mod logging;
pub mod protocol;
pub mod session;
pub mod transcript;
pub mod ui;

pub use agent::AgentOrchestrator;
pub use client::{AgentService, HttpAgentClient};
pub use config::Config;
pub use conversation::{aggregate_reply, ConversationClient, ReplyOrder, SendState};
pub use error::{MessageSendError, SessionError, SEND_ERROR_TEXT, SESSION_ERROR_TEXT};
pub use events::{SessionIdentity, TranscriptEntry, TranscriptRole};
pub use session::{SessionManager, SessionStatus};
pub use transcript::Transcript;
