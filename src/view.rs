//! Display projection of a session. Read-only; nothing here feeds back into
//! transitions.

use crate::kernel::machine::{meaningful_chars, MIN_QUERY_CHARS};
use crate::kernel::session::{Failure, JobMode, JobState, SearchHit, SearchState, Session};

/// `HH:MM:SS`, fractional seconds floored. Negative or non-finite input
/// renders as zero.
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

pub fn hit_label(hit: &SearchHit) -> String {
    match hit.timestamp.as_deref().map(str::trim) {
        Some(ts) if !ts.is_empty() => ts.to_string(),
        _ => format_timestamp(hit.start),
    }
}

/// Transcript text for dialogue hits; scene hits carry only a score.
pub fn hit_summary(hit: &SearchHit) -> String {
    match hit.text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => match hit.score {
            Some(score) => format!("Scene match (score: {})", score),
            None => "Scene match".to_string(),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub label: String,
    pub summary: String,
    /// Set only on the row built from the best match.
    pub is_best: bool,
}

impl From<&SearchHit> for ResultRow {
    fn from(hit: &SearchHit) -> Self {
        Self {
            label: hit_label(hit),
            summary: hit_summary(hit),
            is_best: false,
        }
    }
}

/// Best match first, then alternates. Empty unless the session holds a
/// result.
pub fn result_rows(session: &Session) -> Vec<ResultRow> {
    let Some(result) = session.search_result() else {
        return Vec::new();
    };
    let best = result.best.iter().map(|hit| ResultRow {
        is_best: true,
        ..ResultRow::from(hit)
    });
    best.chain(result.alternates.iter().map(ResultRow::from))
        .collect()
}

pub fn can_search(session: &Session, query: &str) -> bool {
    session.job_id().is_some()
        && session.is_ready()
        && !session.is_searching()
        && meaningful_chars(query) >= MIN_QUERY_CHARS
}

pub fn status_line(session: &Session) -> Option<String> {
    let line = match session.state() {
        JobState::Idle => return None,
        JobState::Submitting => format!("Uploading… {}%", session.upload_percent()),
        JobState::Processing => match session.last_tick() {
            None => "Upload complete. Processing started…".to_string(),
            Some(_) => format!(
                "Processing ({}): {} ({}%)",
                session.mode(),
                session.stage(),
                session.progress_percent()
            ),
        },
        JobState::Failed => match session.failure() {
            Some(Failure::Submission(msg)) => format!("Upload failed: {}", msg),
            Some(Failure::Processing(msg)) => format!("Processing failed: {}", msg),
            None => "Processing failed.".to_string(),
        },
        JobState::Ready(SearchState::Idle) => match session.mode() {
            JobMode::Audio => "Audio transcription ready. You can search now.".to_string(),
            JobMode::Scene => "Scene index ready. You can search now.".to_string(),
        },
        JobState::Ready(SearchState::Searching) => match session.mode() {
            JobMode::Audio => "Searching transcript…".to_string(),
            JobMode::Scene => "Searching scenes…".to_string(),
        },
        JobState::Ready(SearchState::HasResult) => {
            match session.search_result().and_then(|r| r.best.as_ref()) {
                Some(best) => format!("Jumped to {}.", hit_label(best)),
                None => "No matches found. Try a clearer/shorter query.".to_string(),
            }
        }
        JobState::Ready(SearchState::SearchFailed) => format!(
            "Search failed: {}",
            session.search_error().unwrap_or("unknown error")
        ),
    };
    Some(line)
}
