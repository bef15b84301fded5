use crate::accumulator::StreamAccumulator;
use crate::ndjson::NdjsonLines;
use crate::observer::ChatObserver;
use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use shared::agent_api::{AvailabilityStatus, ChatFailure, ChatRequest, ChatResult};
use shared::settings::ChatConfig;
use tracing::debug;

/// Most of an error response body kept for the failure message.
const ERROR_BODY_LIMIT: usize = 4 * 1024;

/// `GET /api/tags` response body.
#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    #[serde(default)]
    name: String,
}

/// HTTP client for an Ollama-compatible model server.
pub struct OllamaClient {
    http: Client,
    config: ChatConfig,
}

impl OllamaClient {
    pub fn new(config: ChatConfig) -> Result<Self> {
        let http = Client::builder()
            .pool_max_idle_per_host(2)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn request(&self, prompt: impl Into<String>) -> ChatRequest {
        ChatRequest::new(
            prompt,
            self.config.model.clone(),
            self.config.chat_endpoint.clone(),
        )
    }

    /// Send one prompt and fold the streamed reply. Never retries; every
    /// failure comes back as `ChatResult::Failure`.
    pub async fn chat(&self, request: &ChatRequest, observer: &dyn ChatObserver) -> ChatResult {
        let payload = request.payload();
        observer.request_sent(request, &payload);
        let result = self.stream_chat(request, &payload, observer).await;
        observer.request_finished(&result);
        result
    }

    async fn stream_chat(
        &self,
        request: &ChatRequest,
        payload: &serde_json::Value,
        observer: &dyn ChatObserver,
    ) -> ChatResult {
        let resp = match self
            .http
            .post(request.endpoint().clone())
            .timeout(self.config.request_timeout)
            .json(payload)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return ChatResult::Failure(self.transport_failure(e)),
        };

        let status = resp.status();
        if !status.is_success() {
            return ChatResult::Failure(ChatFailure::HttpStatus {
                status: status.as_u16(),
                body: error_body(resp).await,
            });
        }

        // The server streams one JSON object per line
        let mut stream = resp.bytes_stream();
        let mut lines = NdjsonLines::new();
        let mut acc = StreamAccumulator::new();

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => return ChatResult::Failure(self.transport_failure(e)),
            };
            for line in lines.feed(&bytes) {
                if let Some(done) = acc.push_body_line(line, observer) {
                    return done;
                }
            }
        }

        if let Some(line) = lines.finish() {
            if let Some(done) = acc.push_body_line(line, observer) {
                return done;
            }
        }
        acc.finish()
    }

    fn transport_failure(&self, e: reqwest::Error) -> ChatFailure {
        if e.is_timeout() {
            ChatFailure::Timeout {
                secs: self.config.request_timeout.as_secs_f64(),
            }
        } else {
            ChatFailure::Transport(e.to_string())
        }
    }

    /// Names reported by the listing endpoint.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let resp = self
            .http
            .get(self.config.tags_endpoint.clone())
            .timeout(self.config.probe_timeout)
            .send()
            .await?
            .error_for_status()?;
        let body: TagsResponse = resp.json().await.context("malformed model list")?;
        Ok(body.models.into_iter().map(|m| m.name).collect())
    }

    /// Pre-flight check: is the configured model listed by the server?
    /// Substring match, so `llama2` accepts `llama2:7b`.
    pub async fn check_available(&self) -> AvailabilityStatus {
        let model = &self.config.model;
        match self.list_models().await {
            Ok(names) => {
                debug!(count = names.len(), "model list received");
                if names.iter().any(|name| name.contains(model.as_str())) {
                    AvailabilityStatus::available()
                } else {
                    AvailabilityStatus::unavailable(format!(
                        "Model '{}' not found. Run: ollama pull {}",
                        model, model
                    ))
                }
            }
            Err(e) => AvailabilityStatus::unavailable(format!(
                "Model server not reachable: {:#}",
                e
            )),
        }
    }
}

/// First [`ERROR_BODY_LIMIT`] bytes of a failed response, trimmed. A body
/// that breaks off mid-read keeps what arrived.
async fn error_body(resp: reqwest::Response) -> String {
    let mut body = Vec::new();
    let mut stream = resp.bytes_stream();
    while let Some(Ok(bytes)) = stream.next().await {
        let room = ERROR_BODY_LIMIT - body.len();
        body.extend_from_slice(&bytes[..bytes.len().min(room)]);
        if body.len() >= ERROR_BODY_LIMIT {
            break;
        }
    }
    String::from_utf8_lossy(&body).trim().to_string()
}
