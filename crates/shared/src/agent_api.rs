//! Chat data model shared between the provider client and the front end.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String, // "system" | "user" | "assistant"
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One prompt bound for one endpoint. Fields are private so a request
/// cannot change after it has been handed to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    prompt: String,
    model: String,
    endpoint: Url,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>, endpoint: Url) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            endpoint,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Wire payload for the chat endpoint.
    pub fn payload(&self) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [ChatMessage::user(self.prompt.clone())],
            "stream": true,
        })
    }
}

/// Why a chat request ended without text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChatFailure {
    #[error("Error calling chat endpoint: {0}")]
    Transport(String),

    #[error("Chat endpoint returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Chat request timed out after {secs:.1}s")]
    Timeout { secs: f64 },

    #[error("Model server error: {error}\nRaw: {raw}")]
    ServerReported {
        error: String,
        raw: serde_json::Value,
    },

    #[error("No valid response from model server\nRaw: {raw}")]
    NoValidResponse { raw: serde_json::Value },

    #[error("No response from model server")]
    NoResponse,

    #[error("Chat request cancelled")]
    Cancelled,
}

/// Terminal outcome of one chat request.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatResult {
    Success(String),
    Failure(ChatFailure),
}

impl ChatResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ChatResult::Success(_))
    }

    /// Reply text on success, failure description otherwise.
    pub fn text(&self) -> String {
        match self {
            ChatResult::Success(text) => text.clone(),
            ChatResult::Failure(failure) => failure.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The single message a worker delivers for each request it runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEvent {
    pub id: RequestId,
    pub result: ChatResult,
}

/// Outcome of the model-server pre-flight check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityStatus {
    pub available: bool,
    pub detail: Option<String>,
}

impl AvailabilityStatus {
    pub fn available() -> Self {
        Self {
            available: true,
            detail: None,
        }
    }

    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self {
            available: false,
            detail: Some(detail.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let req = ChatRequest::new(
            "hi there",
            "llama2",
            Url::parse("http://localhost:11434/api/chat").unwrap(),
        );
        assert_eq!(
            req.payload(),
            serde_json::json!({
                "model": "llama2",
                "messages": [{"role": "user", "content": "hi there"}],
                "stream": true,
            })
        );
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(
            ChatFailure::NoResponse.to_string(),
            "No response from model server"
        );
        let raw = serde_json::json!({"done": true});
        let msg = ChatFailure::NoValidResponse { raw }.to_string();
        assert!(msg.starts_with("No valid response"));
        assert!(msg.contains("\"done\":true"));
    }

    #[test]
    fn test_result_text() {
        assert_eq!(ChatResult::Success("ok".into()).text(), "ok");
        assert!(ChatResult::Failure(ChatFailure::Cancelled)
            .text()
            .contains("cancelled"));
    }

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }
}
