//! Wire shapes of the three backend endpoints.
//!
//! Unknown fields are ignored on deserialization so the client stays
//! compatible with backends that return extra metadata (`session_id`,
//! `retryable`, ...).

use serde::{Deserialize, Serialize};

use crate::message::ChatMessage;

/// Response body of `GET /api/models`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelList {
    /// Available model identifiers.
    pub models: Vec<String>,
}

/// Response body of `GET /api/history`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPage {
    /// Conversation entries in display order. Absent field reads as empty.
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

/// Response body of `POST /api/send`.
///
/// The backend may return `text` and `error` in any combination; interpreting
/// that combination is the caller's job via [`SendReply::display_text`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReply {
    /// Model response text, when the backend produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Backend error label, when the request was rejected or degraded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendReply {
    /// Resolves the reply into the text shown in the conversation: a
    /// non-empty `text` wins, then a synthesized `Error: ...` entry, then a
    /// fixed fallback when the backend returned neither.
    pub fn display_text(&self) -> String {
        match (&self.text, &self.error) {
            (Some(text), _) if !text.is_empty() => text.clone(),
            (_, Some(error)) => format!("Error: {error}"),
            _ => "No response text.".to_string(),
        }
    }
}
