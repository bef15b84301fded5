//! Chat session state: one request in flight at a time, results folded
//! back into the panel.

use crate::panel::{ChatPanel, Entry};
use providers::worker::{ChatTicket, ChatWorker};
use shared::agent_api::{ChatEvent, ChatResult, RequestId};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Still waiting on the last reply; cancel it or wait")]
    Busy,

    #[error("Nothing to send")]
    EmptyPrompt,
}

pub struct ChatSession {
    worker: ChatWorker,
    tx: UnboundedSender<ChatEvent>,
    panel: ChatPanel,
    in_flight: Option<ChatTicket>,
}

impl ChatSession {
    /// Completed requests arrive on the returned receiver; feed them back
    /// through [`ChatSession::handle_event`].
    pub fn new(worker: ChatWorker) -> (Self, UnboundedReceiver<ChatEvent>) {
        let (tx, rx) = unbounded_channel();
        let session = Self {
            worker,
            tx,
            panel: ChatPanel::new(),
            in_flight: None,
        };
        (session, rx)
    }

    pub fn panel(&self) -> &ChatPanel {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut ChatPanel {
        &mut self.panel
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn submit(&mut self, prompt: &str) -> Result<RequestId, SessionError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(SessionError::EmptyPrompt);
        }
        if self.is_busy() {
            return Err(SessionError::Busy);
        }

        self.panel.begin(prompt);
        let ticket = self.worker.spawn(prompt, self.tx.clone());
        let id = ticket.id;
        info!(%id, prompt_len = prompt.len(), "chat submitted");
        self.in_flight = Some(ticket);
        Ok(id)
    }

    /// Abort the pending request. The session stays busy until the
    /// cancellation event comes back.
    pub fn cancel(&mut self) -> bool {
        match &self.in_flight {
            Some(ticket) => {
                info!(id = %ticket.id, "cancelling chat request");
                ticket.cancel();
                true
            }
            None => false,
        }
    }

    /// Apply a worker event. Events for anything other than the request in
    /// flight are dropped and `None` is returned.
    pub fn handle_event(&mut self, event: ChatEvent) -> Option<&Entry> {
        match &self.in_flight {
            Some(ticket) if ticket.id == event.id => {}
            _ => {
                debug!(id = %event.id, "ignoring stale chat event");
                return None;
            }
        }
        self.in_flight = None;

        let reply = match event.result {
            ChatResult::Success(text) => Ok(text),
            ChatResult::Failure(failure) => Err(failure.to_string()),
        };
        Some(self.panel.finish(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::EntryKind;
    use providers::{OllamaClient, SilentObserver};
    use serde_json::json;
    use shared::agent_api::ChatFailure;
    use shared::settings::ChatConfig;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn session_with(
        template: ResponseTemplate,
    ) -> (MockServer, ChatSession, UnboundedReceiver<ChatEvent>) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(template)
            .mount(&server)
            .await;
        let chat = url_for(&server);
        let config = ChatConfig::new(chat, "llama2")
            .with_timeouts(Duration::from_secs(5), Duration::from_secs(1));
        let worker = ChatWorker::new(
            Arc::new(OllamaClient::new(config).unwrap()),
            Arc::new(SilentObserver),
        );
        let (session, rx) = ChatSession::new(worker);
        (server, session, rx)
    }

    fn url_for(server: &MockServer) -> url::Url {
        format!("{}/api/chat", server.uri()).parse().unwrap()
    }

    fn reply(text: &str) -> ResponseTemplate {
        let line = json!({"message": {"content": text}});
        ResponseTemplate::new(200).set_body_string(format!("{}\n", line))
    }

    #[tokio::test]
    async fn test_round_trip_updates_panel() {
        let (_server, mut session, mut rx) = session_with(reply("Hi there")).await;

        session.submit("  hello  ").unwrap();
        assert!(session.is_busy());
        assert!(!session.panel().input_enabled());

        let event = rx.recv().await.unwrap();
        let entry = session.handle_event(event).unwrap();
        assert_eq!(entry.body, "Hi there");
        assert!(!session.is_busy());
        assert!(session.panel().input_enabled());
        assert_eq!(session.panel().entries()[0].body, "hello");
    }

    #[tokio::test]
    async fn test_second_submit_while_busy_is_rejected() {
        let slow = reply("late").set_delay(Duration::from_millis(300));
        let (_server, mut session, mut rx) = session_with(slow).await;

        session.submit("first").unwrap();
        assert_eq!(session.submit("second"), Err(SessionError::Busy));
        let placeholders = session
            .panel()
            .entries()
            .iter()
            .filter(|e| e.kind == EntryKind::Thinking)
            .count();
        assert_eq!(placeholders, 1);

        let event = rx.recv().await.unwrap();
        session.handle_event(event).unwrap();
        assert!(session.submit("second").is_ok());
    }

    #[tokio::test]
    async fn test_empty_prompt_is_rejected() {
        let (_server, mut session, _rx) = session_with(reply("x")).await;
        assert_eq!(session.submit("   "), Err(SessionError::EmptyPrompt));
        assert!(session.panel().entries().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_clears_placeholder() {
        let slow = reply("late").set_delay(Duration::from_secs(3));
        let (_server, mut session, mut rx) = session_with(slow).await;

        session.submit("hello").unwrap();
        assert!(session.cancel());
        let event = rx.recv().await.unwrap();
        assert_eq!(event.result, ChatResult::Failure(ChatFailure::Cancelled));

        let entry = session.handle_event(event).unwrap();
        assert_eq!(entry.kind, EntryKind::Error);
        assert!(!session.panel().pending());
        assert!(!session.cancel());
    }

    #[tokio::test]
    async fn test_stale_event_is_ignored() {
        let (_server, mut session, _rx) = session_with(reply("x")).await;
        let stale = ChatEvent {
            id: RequestId::new(),
            result: ChatResult::Success("old".into()),
        };
        assert!(session.handle_event(stale).is_none());
        assert!(session.panel().entries().is_empty());
    }

    #[tokio::test]
    async fn test_stale_event_leaves_current_request_pending() {
        let (_server, mut session, mut rx) = session_with(reply("fresh")).await;

        let first = session.submit("first").unwrap();
        let event = rx.recv().await.unwrap();
        session.handle_event(event).unwrap();

        let second = session.submit("second").unwrap();
        let late = ChatEvent {
            id: first,
            result: ChatResult::Success("old".into()),
        };
        assert!(session.handle_event(late).is_none());
        assert!(session.is_busy());
        assert!(session.panel().pending());
        assert!(!session.panel().input_enabled());

        let event = rx.recv().await.unwrap();
        assert_eq!(event.id, second);
        let entry = session.handle_event(event).unwrap();
        assert_eq!(entry.body, "fresh");
        assert!(!session.is_busy());
        assert!(session
            .panel()
            .entries()
            .iter()
            .all(|e| e.body != "old"));
    }
}
