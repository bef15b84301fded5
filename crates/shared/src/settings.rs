//! Configuration surface: three `KEY=value` settings read from the process
//! environment (after an optional `.env` file) and written back the same way.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const BROWSER_COMMAND_KEY: &str = "BROWSER_COMMAND";
pub const CHAT_URL_KEY: &str = "OLLAMA_API_URL";
pub const MODEL_KEY: &str = "OLLAMA_MODEL";
pub const TAGS_URL_KEY: &str = "OLLAMA_TAGS_URL";

pub const DEFAULT_BROWSER_COMMAND: &str = "google-chrome";
pub const DEFAULT_CHAT_URL: &str = "http://localhost:11434/api/chat";
pub const DEFAULT_MODEL: &str = "llama2";

pub const CHAT_TIMEOUT: Duration = Duration::from_secs(60);
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    pub browser_command: String,
    pub chat_url: String,
    pub model: String,
    /// Listing endpoint override; derived from `chat_url` when unset
    pub tags_url: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            browser_command: DEFAULT_BROWSER_COMMAND.into(),
            chat_url: DEFAULT_CHAT_URL.into(),
            model: DEFAULT_MODEL.into(),
            tags_url: None,
        }
    }
}

impl AppSettings {
    /// Resolve settings through `lookup`, falling back to defaults for
    /// missing or blank values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            browser_command: get(BROWSER_COMMAND_KEY, DEFAULT_BROWSER_COMMAND),
            chat_url: get(CHAT_URL_KEY, DEFAULT_CHAT_URL),
            model: get(MODEL_KEY, DEFAULT_MODEL),
            tags_url: lookup(TAGS_URL_KEY)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Process environment first, then `env_file` if it exists.
    pub fn load(env_file: &Path) -> Result<Self> {
        let file_values = read_env_file(env_file)?;
        Ok(Self::from_lookup(|key| {
            std::env::var(key)
                .ok()
                .or_else(|| file_values.get(key).cloned())
        }))
    }

    /// Persist as `KEY=value` lines, replacing the file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut out = format!(
            "{}={}\n{}={}\n{}={}\n",
            BROWSER_COMMAND_KEY,
            self.browser_command,
            CHAT_URL_KEY,
            self.chat_url,
            MODEL_KEY,
            self.model
        );
        if let Some(tags) = &self.tags_url {
            out.push_str(&format!("{}={}\n", TAGS_URL_KEY, tags));
        }
        fs::write(path, out).with_context(|| format!("writing settings to {}", path.display()))?;
        tracing::info!(path = %path.display(), "settings saved");
        Ok(())
    }

    pub fn chat_config(&self) -> Result<ChatConfig> {
        let chat_endpoint = Url::parse(&self.chat_url)
            .with_context(|| format!("invalid {}: {}", CHAT_URL_KEY, self.chat_url))?;
        let mut config = ChatConfig::new(chat_endpoint, self.model.clone());
        if let Some(tags) = &self.tags_url {
            config.tags_endpoint =
                Url::parse(tags).with_context(|| format!("invalid {}: {}", TAGS_URL_KEY, tags))?;
        }
        Ok(config)
    }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let iter = dotenv::from_path_iter(path)
        .with_context(|| format!("opening env file {}", path.display()))?;
    let mut values = HashMap::new();
    for item in iter {
        let (key, value) =
            item.with_context(|| format!("parsing env file {}", path.display()))?;
        values.insert(key, value);
    }
    Ok(values)
}

/// Resolved configuration handed to the chat client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    pub chat_endpoint: Url,
    pub tags_endpoint: Url,
    pub model: String,
    pub request_timeout: Duration,
    pub probe_timeout: Duration,
}

impl ChatConfig {
    pub fn new(chat_endpoint: Url, model: impl Into<String>) -> Self {
        let tags_endpoint = listing_endpoint_for(&chat_endpoint);
        Self {
            chat_endpoint,
            tags_endpoint,
            model: model.into(),
            request_timeout: CHAT_TIMEOUT,
            probe_timeout: PROBE_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, request: Duration, probe: Duration) -> Self {
        self.request_timeout = request;
        self.probe_timeout = probe;
        self
    }
}

/// `.../api/chat` becomes `.../api/tags`; anything else maps to `/api/tags`
/// on the same origin.
pub fn listing_endpoint_for(chat: &Url) -> Url {
    let mut tags = chat.clone();
    tags.set_query(None);
    tags.set_fragment(None);
    let path = chat.path().trim_end_matches('/');
    match path.strip_suffix("/api/chat") {
        Some(prefix) => tags.set_path(&format!("{}/api/tags", prefix)),
        None => tags.set_path("/api/tags"),
    }
    tags
}
