use thiserror::Error;

const MAX_DETAIL_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("invalid asset: {0}")]
    InvalidAsset(String),
}

impl TransportError {
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_decode() {
            TransportError::Decode(e.to_string())
        } else {
            TransportError::Network(e.to_string())
        }
    }

    /// Message safe to show a user. Backend `detail` wins when there is one.
    pub fn user_message(&self) -> String {
        match self {
            TransportError::Http { detail, .. } if !detail.is_empty() => detail.clone(),
            TransportError::Http { status, .. } => format!("Request failed with status {}", status),
            TransportError::Network(_) => "Could not reach the backend".to_string(),
            TransportError::Timeout => "The backend did not respond in time".to_string(),
            TransportError::Decode(_) => "Unexpected response from the backend".to_string(),
            TransportError::InvalidAsset(msg) => msg.clone(),
        }
    }
}

/// Pulls a readable message out of an error body.
///
/// The backend answers errors as `{"detail": ...}`; a string detail is used
/// as is, structured details are rendered as JSON. Anything else falls back to
/// the (truncated) raw body.
pub fn extract_detail(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        match value.get("detail") {
            Some(serde_json::Value::String(detail)) => return detail.trim().to_string(),
            Some(serde_json::Value::Null) | None => {}
            Some(other) => return other.to_string(),
        }
    }
    body.trim().chars().take(MAX_DETAIL_CHARS).collect()
}
