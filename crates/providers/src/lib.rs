pub mod accumulator;
pub mod ndjson;
pub mod observer;
pub mod ollama;
pub mod worker;

pub use observer::{ChatObserver, SilentObserver, TracingObserver};
pub use ollama::OllamaClient;
pub use worker::{ChatTicket, ChatWorker};
