pub mod agent_api;
pub mod settings;

pub use agent_api::{AvailabilityStatus, ChatEvent, ChatFailure, ChatRequest, ChatResult, RequestId};
pub use settings::{AppSettings, ChatConfig};
