//! Background chat requests: one tokio task per prompt, one event per task.

use crate::observer::ChatObserver;
use crate::ollama::OllamaClient;
use futures::future::{AbortHandle, Abortable};
use shared::agent_api::{ChatEvent, ChatFailure, ChatResult, RequestId};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Handle to a request in flight.
#[derive(Debug, Clone)]
pub struct ChatTicket {
    pub id: RequestId,
    abort: AbortHandle,
}

impl ChatTicket {
    /// Stop the request. The worker still delivers exactly one event for
    /// it, carrying `ChatFailure::Cancelled` unless the reply already won.
    pub fn cancel(&self) {
        self.abort.abort();
    }
}

/// Spawns chat requests without limiting how many run at once; callers that
/// need one-at-a-time semantics serialize above this layer.
#[derive(Clone)]
pub struct ChatWorker {
    client: Arc<OllamaClient>,
    observer: Arc<dyn ChatObserver>,
}

impl ChatWorker {
    pub fn new(client: Arc<OllamaClient>, observer: Arc<dyn ChatObserver>) -> Self {
        Self { client, observer }
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }

    /// Start a request on the current tokio runtime. Its single
    /// [`ChatEvent`] is sent on `tx`.
    pub fn spawn(&self, prompt: impl Into<String>, tx: UnboundedSender<ChatEvent>) -> ChatTicket {
        let id = RequestId::new();
        let request = self.client.request(prompt);
        let (abort, abort_reg) = AbortHandle::new_pair();
        let client = Arc::clone(&self.client);
        let observer = Arc::clone(&self.observer);

        debug!(%id, "spawning chat request");
        tokio::spawn(async move {
            let chat = async { client.chat(&request, observer.as_ref()).await };
            let result = match Abortable::new(chat, abort_reg).await {
                Ok(result) => result,
                Err(_aborted) => {
                    let result = ChatResult::Failure(ChatFailure::Cancelled);
                    observer.request_finished(&result);
                    result
                }
            };
            // Receiver gone means nobody is waiting any more
            let _ = tx.send(ChatEvent { id, result });
        });

        ChatTicket { id, abort }
    }
}
