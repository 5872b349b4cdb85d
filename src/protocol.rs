//! Wire types for the agent server's JSON API.

use serde::{Deserialize, Serialize};

use crate::events::SessionIdentity;

/// A single text fragment of a message.
///
/// Parts carrying something other than text (function calls, inline data)
/// decode with `text: None` and are skipped during aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

/// Message sent on behalf of the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    parts: Vec<Part>,
    role: &'static str,
}

impl OutboundMessage {
    /// Wrap `text` as the single part of a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::text(text)],
            role: "user",
        }
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn role(&self) -> &str {
        self.role
    }
}

/// Body of `POST {base_url}/run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
    pub new_message: OutboundMessage,
    pub streaming: bool,
}

impl RunRequest {
    /// Non-streaming request carrying `message` within `identity`'s session.
    pub fn new(identity: &SessionIdentity, message: OutboundMessage) -> Self {
        Self {
            app_name: identity.app_name().to_string(),
            user_id: identity.user_id().to_string(),
            session_id: identity.session_id().to_string(),
            new_message: message,
            streaming: false,
        }
    }
}

/// Content block of an inbound event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EventContent {
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default)]
    pub role: Option<String>,
}

/// One element of the array returned by `/run`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub content: Option<EventContent>,
    #[serde(default, alias = "finish_reason")]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub invocation_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub actions: Option<serde_json::Value>,
    #[serde(default)]
    pub usage_metadata: Option<serde_json::Value>,
}

impl InboundEvent {
    /// Non-empty text fragments of this event, in wire order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.content
            .iter()
            .flat_map(|content| content.parts.iter())
            .filter_map(|part| part.text.as_deref())
            .filter(|text| !text.is_empty())
    }
}
