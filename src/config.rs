use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::kernel::error::SessionError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    /// Cadence of the status poller.
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
    /// Uploads are long-running; they get their own ceiling.
    pub upload_timeout_secs: u64,
    /// Capacity of the kernel event channel.
    pub event_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval_ms: crate::kernel::time::POLL_INTERVAL_MS,
            request_timeout_secs: 30,
            upload_timeout_secs: 600,
            event_buffer: 100,
        }
    }
}

impl ClientConfig {
    pub fn from_json(raw: &str) -> Result<Self, SessionError> {
        let config: ClientConfig = serde_json::from_str(raw)
            .map_err(|e| SessionError::InvalidSettings(format!("config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.base_url.trim().is_empty() {
            return Err(SessionError::InvalidSettings("base_url is empty".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(SessionError::InvalidSettings("poll_interval_ms must be > 0".to_string()));
        }
        if self.event_buffer == 0 {
            return Err(SessionError::InvalidSettings("event_buffer must be > 0".to_string()));
        }
        Ok(())
    }

    /// Base URL without a trailing slash, ready for path joins.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }
}

/// Whisper model sizes the AUDIO pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelSize {
    #[serde(rename = "tiny")]
    Tiny,
    #[serde(rename = "base")]
    Base,
    #[serde(rename = "small")]
    Small,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "large-v3")]
    LargeV3,
}

impl ModelSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::LargeV3 => "large-v3",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "tiny" => Some(ModelSize::Tiny),
            "base" => Some(ModelSize::Base),
            "small" => Some(ModelSize::Small),
            "medium" => Some(ModelSize::Medium),
            "large-v3" | "large" => Some(ModelSize::LargeV3),
            _ => None,
        }
    }
}

impl Default for ModelSize {
    fn default() -> Self {
        ModelSize::Small
    }
}

/// Transcription settings sent along with an AUDIO submission.
/// Frozen into the session once the backend assigns a job id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub language: String,
    pub model_size: ModelSize,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            model_size: ModelSize::default(),
        }
    }
}

impl AudioSettings {
    pub fn new(language: &str, model_size: ModelSize) -> Result<Self, SessionError> {
        let language = normalize_language(language)
            .ok_or_else(|| SessionError::InvalidSettings("language is empty".to_string()))?;
        Ok(Self { language, model_size })
    }
}

pub fn normalize_language(input: &str) -> Option<String> {
    let trimmed = input.trim().to_lowercase();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
