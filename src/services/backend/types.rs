use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use super::error::TransportError;
use crate::kernel::session::{SearchHit, SearchResult};

/// A video ready to be uploaded.
#[derive(Debug, Clone)]
pub struct Asset {
    pub file_name: String,
    pub mime: String,
    pub bytes: Arc<Vec<u8>>,
}

impl Asset {
    pub fn from_bytes(file_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            mime: mime_for(file_name).to_string(),
            bytes: Arc::new(bytes),
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| TransportError::InvalidAsset(format!("no file name in {}", path.display())))?
            .to_string();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| TransportError::InvalidAsset(format!("{}: {}", path.display(), e)))?;
        Ok(Self::from_bytes(&file_name, bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    pub job_id: String,
}

/// Typed status response. `ready` is the only readiness signal; `error` set
/// to a non-empty string is terminal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusReport {
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl StatusReport {
    pub fn stage(&self) -> &str {
        self.stage.as_deref().unwrap_or("")
    }

    /// Clamped to 0..=100. No monotonicity is assumed.
    pub fn progress_percent(&self) -> u8 {
        match self.progress {
            Some(p) if p.is_finite() => p.round().clamp(0.0, 100.0) as u8,
            _ => 0,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: u32,
    pub clip_duration: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub best: Option<SearchHit>,
    #[serde(default)]
    pub alternates: Option<Vec<SearchHit>>,
}

impl SearchResponse {
    pub fn into_result(self) -> SearchResult {
        SearchResult {
            best: self.best,
            alternates: self.alternates.unwrap_or_default(),
        }
    }
}
