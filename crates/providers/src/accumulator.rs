//! Folds decoded stream lines into a single [`ChatResult`].

use crate::ndjson::BodyLine;
use crate::observer::ChatObserver;
use serde_json::Value;
use shared::agent_api::{ChatFailure, ChatResult};

/// In-progress state for one streamed reply.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    last: Option<Value>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one body line. Returns `Some` when the line ends the stream
    /// (a server-reported error); the caller must stop reading then.
    pub fn push_line(&mut self, line: &str, observer: &dyn ChatObserver) -> Option<ChatResult> {
        let chunk = match serde_json::from_str::<Value>(line) {
            Ok(chunk @ Value::Object(_)) => chunk,
            Ok(_) => {
                observer.line_rejected(line, "not a JSON object");
                return None;
            }
            Err(e) => {
                observer.line_rejected(line, &e.to_string());
                return None;
            }
        };
        observer.chunk_received(&chunk);

        if let Some(err) = chunk.get("error") {
            let error = match err {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Some(ChatResult::Failure(ChatFailure::ServerReported {
                error,
                raw: chunk,
            }));
        }

        if let Some(fragment) = chunk
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
        {
            self.text.push_str(fragment);
        }
        self.last = Some(chunk);
        None
    }

    /// Fold one line as split from the body. Lines the splitter could not
    /// decode are reported and skipped like malformed JSON.
    pub fn push_body_line(
        &mut self,
        line: BodyLine,
        observer: &dyn ChatObserver,
    ) -> Option<ChatResult> {
        match line {
            Ok(text) => self.push_line(&text, observer),
            Err(rejected) => {
                observer.line_rejected(&rejected.preview, &rejected.reason);
                None
            }
        }
    }

    /// Outcome once the body has ended without a server-reported error.
    pub fn finish(self) -> ChatResult {
        let trimmed = self.text.trim();
        if !trimmed.is_empty() {
            return ChatResult::Success(trimmed.to_string());
        }
        match self.last {
            Some(raw) => ChatResult::Failure(ChatFailure::NoValidResponse { raw }),
            None => ChatResult::Failure(ChatFailure::NoResponse),
        }
    }

    /// Fold a complete sequence of lines, stopping at the first terminal one.
    pub fn fold<I, S>(lines: I, observer: &dyn ChatObserver) -> ChatResult
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut acc = Self::new();
        for line in lines {
            if let Some(done) = acc.push_line(line.as_ref(), observer) {
                return done;
            }
        }
        acc.finish()
    }
}
