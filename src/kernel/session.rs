use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::time::Tick;
use crate::config::AudioSettings;

/// Local identity of a session. Distinct from the backend's job id, which
/// only exists after a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque identifier assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(raw: &str) -> Self {
        JobId(raw.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobMode {
    /// Dialogue search over a transcript.
    Audio,
    /// Description search over sampled frames.
    Scene,
}

impl JobMode {
    /// Path segment the backend routes this mode under.
    pub fn path_segment(&self) -> &'static str {
        match self {
            JobMode::Audio => "audio",
            JobMode::Scene => "scene",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "audio" => Some(JobMode::Audio),
            "scene" => Some(JobMode::Scene),
            _ => None,
        }
    }
}

impl Default for JobMode {
    fn default() -> Self {
        JobMode::Audio
    }
}

impl fmt::Display for JobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// Search sub-state. Only exists inside `JobState::Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchState {
    Idle,
    Searching,
    HasResult,
    SearchFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    Idle,
    Submitting,
    Processing,
    Ready(SearchState),
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Ready(_) | JobState::Failed)
    }

    pub fn search_state(&self) -> Option<SearchState> {
        match self {
            JobState::Ready(search) => Some(*search),
            _ => None,
        }
    }
}

/// One ranked match returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Offset into the video, in seconds.
    pub start: f64,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    /// Backend-relative URL of the extracted clip.
    #[serde(default)]
    pub clip_url: Option<String>,
}

impl SearchHit {
    pub fn at(start: f64) -> Self {
        Self {
            start,
            timestamp: None,
            text: None,
            score: None,
            clip_url: None,
        }
    }
}

/// A settled search. `best == None` is the "no match" outcome, which is a
/// result and not a failure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResult {
    pub best: Option<SearchHit>,
    pub alternates: Vec<SearchHit>,
}

impl SearchResult {
    pub fn is_no_match(&self) -> bool {
        self.best.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Failure {
    /// Submission rejected or never reached the backend.
    Submission(String),
    /// Backend reported an error in an otherwise successful status response.
    Processing(String),
}

impl Failure {
    pub fn message(&self) -> &str {
        match self {
            Failure::Submission(msg) | Failure::Processing(msg) => msg,
        }
    }
}

/// The client-side record of one upload-through-search run.
///
/// Fields are crate-private and read through the getters below; every
/// mutation goes through the transitions in `machine.rs`.
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) id: SessionId,
    pub(crate) mode: JobMode,
    pub(crate) state: JobState,
    pub(crate) asset_name: Option<String>,
    pub(crate) audio: Option<AudioSettings>,
    pub(crate) job_id: Option<JobId>,
    pub(crate) upload_percent: u8,
    pub(crate) stage: String,
    pub(crate) progress_percent: u8,
    pub(crate) ready: bool,
    pub(crate) failure: Option<Failure>,
    pub(crate) last_tick: Option<Tick>,
    pub(crate) poll_failures: u32,
    pub(crate) last_query: Option<String>,
    pub(crate) search_result: Option<SearchResult>,
    pub(crate) clip_reference: Option<String>,
    pub(crate) search_error: Option<String>,
}

impl Session {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn mode(&self) -> JobMode {
        self.mode
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn search_state(&self) -> Option<SearchState> {
        self.state.search_state()
    }

    pub fn asset_name(&self) -> Option<&str> {
        self.asset_name.as_deref()
    }

    pub fn audio_settings(&self) -> Option<&AudioSettings> {
        self.audio.as_ref()
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.job_id.as_ref()
    }

    pub fn upload_percent(&self) -> u8 {
        self.upload_percent
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.message())
    }

    pub fn last_tick(&self) -> Option<Tick> {
        self.last_tick
    }

    /// Consecutive status fetches that failed in transport. Informational.
    pub fn poll_failures(&self) -> u32 {
        self.poll_failures
    }

    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    /// Only exposed while the session is ready; a result never leaks across
    /// sessions because every new session starts empty.
    pub fn search_result(&self) -> Option<&SearchResult> {
        if self.ready {
            self.search_result.as_ref()
        } else {
            None
        }
    }

    pub fn clip_reference(&self) -> Option<&str> {
        self.clip_reference.as_deref()
    }

    pub fn search_error(&self) -> Option<&str> {
        self.search_error.as_deref()
    }

    pub fn is_searching(&self) -> bool {
        self.state == JobState::Ready(SearchState::Searching)
    }
}
