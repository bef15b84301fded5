//! Diagnostics seam for the chat path.
//!
//! The fold and the HTTP client report what they see through a
//! [`ChatObserver`]; nothing an observer does can change a request's outcome.

use serde_json::Value;
use shared::agent_api::{ChatFailure, ChatRequest, ChatResult};
use tracing::{debug, error, warn};

pub trait ChatObserver: Send + Sync {
    fn request_sent(&self, _request: &ChatRequest, _payload: &Value) {}

    fn chunk_received(&self, _chunk: &Value) {}

    /// A body line that could not be decoded and was skipped.
    fn line_rejected(&self, _line: &str, _reason: &str) {}

    fn request_finished(&self, _result: &ChatResult) {}
}

/// Writes every event to the `tracing` diagnostic log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ChatObserver for TracingObserver {
    fn request_sent(&self, request: &ChatRequest, payload: &Value) {
        debug!(endpoint = %request.endpoint(), %payload, "sending chat request");
    }

    fn chunk_received(&self, chunk: &Value) {
        debug!(%chunk, "chat stream chunk");
    }

    fn line_rejected(&self, line: &str, reason: &str) {
        error!(line, reason, "error parsing chat stream line");
    }

    fn request_finished(&self, result: &ChatResult) {
        match result {
            ChatResult::Success(text) => debug!(len = text.len(), "chat request finished"),
            ChatResult::Failure(ChatFailure::Cancelled) => warn!("chat request cancelled"),
            ChatResult::Failure(failure) => error!(%failure, "chat request failed"),
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl ChatObserver for SilentObserver {}
