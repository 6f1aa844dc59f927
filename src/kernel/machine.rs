//! Legal transitions of a job session.
//!
//! `IDLE -> SUBMITTING -> PROCESSING -> {READY | FAILED}`, with a nested search
//! sub-state inside READY. Everything here is pure: no I/O, no timers, no
//! channels. Effects (starting the poller, dispatching a search) are the
//! lifecycle manager's business.

use tracing::debug;

use super::error::SessionError;
use super::session::{
    Failure, JobId, JobMode, JobState, SearchResult, SearchState, Session, SessionId,
};
use super::time::Tick;
use crate::config::AudioSettings;
use crate::services::backend::StatusReport;

pub const MIN_QUERY_CHARS: usize = 2;

/// What a status tick did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Stage/progress updated, still processing.
    Progressed,
    BecameReady,
    Failed,
    /// Arrived after a terminal state, or older than the last applied tick.
    Discarded,
}

impl TickOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TickOutcome::BecameReady | TickOutcome::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchAdmission {
    /// Sub-state moved to SEARCHING; the caller must dispatch the request.
    Started,
    /// A search is already in flight. Nothing changed.
    InFlight,
}

/// Counts the characters that carry meaning in a query.
pub fn meaningful_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

impl Session {
    pub fn new(mode: JobMode) -> Self {
        Self {
            id: SessionId::new(),
            mode,
            state: JobState::Idle,
            asset_name: None,
            audio: None,
            job_id: None,
            upload_percent: 0,
            stage: String::new(),
            progress_percent: 0,
            ready: false,
            failure: None,
            last_tick: None,
            poll_failures: 0,
            last_query: None,
            search_result: None,
            clip_reference: None,
            search_error: None,
        }
    }

    pub fn begin_submission(
        &mut self,
        asset_name: &str,
        audio: Option<AudioSettings>,
    ) -> Result<(), SessionError> {
        if self.state != JobState::Idle {
            return Err(SessionError::InvalidState {
                op: "begin submission",
                state: self.state,
            });
        }
        self.state = JobState::Submitting;
        self.asset_name = Some(asset_name.to_string());
        // Settings only travel with AUDIO jobs.
        self.audio = match self.mode {
            JobMode::Audio => audio,
            JobMode::Scene => None,
        };
        self.upload_percent = 0;
        Ok(())
    }

    /// Advisory; ignored outside SUBMITTING.
    pub fn on_upload_progress(&mut self, percent: u8) {
        if self.state == JobState::Submitting {
            self.upload_percent = percent.min(100);
        }
    }

    pub fn on_submitted(&mut self, job_id: JobId) -> Result<(), SessionError> {
        if self.state != JobState::Submitting {
            return Err(SessionError::InvalidState {
                op: "accept job id",
                state: self.state,
            });
        }
        self.state = JobState::Processing;
        self.job_id = Some(job_id);
        self.upload_percent = 100;
        self.stage = "UPLOADED".to_string();
        self.progress_percent = 0;
        self.ready = false;
        Ok(())
    }

    pub fn on_submit_failed(&mut self, message: &str) -> Result<(), SessionError> {
        if self.state != JobState::Submitting {
            return Err(SessionError::InvalidState {
                op: "record submission failure",
                state: self.state,
            });
        }
        self.state = JobState::Failed;
        self.failure = Some(Failure::Submission(message.to_string()));
        Ok(())
    }

    pub fn on_status_tick(
        &mut self,
        tick: Tick,
        report: &StatusReport,
    ) -> Result<TickOutcome, SessionError> {
        match self.state {
            JobState::Processing => {}
            JobState::Ready(_) | JobState::Failed => {
                debug!("Discarding tick {} after terminal state {:?}", tick.seq, self.state);
                return Ok(TickOutcome::Discarded);
            }
            state => {
                return Err(SessionError::InvalidState {
                    op: "apply status tick",
                    state,
                })
            }
        }

        if let Some(last) = self.last_tick {
            if tick <= last {
                debug!("Discarding superseded tick {} (last applied {})", tick.seq, last.seq);
                return Ok(TickOutcome::Discarded);
            }
        }
        self.last_tick = Some(tick);
        self.poll_failures = 0;

        if let Some(error) = report.error_message() {
            self.state = JobState::Failed;
            self.failure = Some(Failure::Processing(error.to_string()));
            return Ok(TickOutcome::Failed);
        }

        self.stage = report.stage().to_string();
        self.progress_percent = report.progress_percent();

        if report.ready {
            self.ready = true;
            self.state = JobState::Ready(SearchState::Idle);
            return Ok(TickOutcome::BecameReady);
        }

        Ok(TickOutcome::Progressed)
    }

    /// A status fetch failed in transport. Never a transition.
    pub fn on_poll_failed(&mut self) {
        if self.state == JobState::Processing {
            self.poll_failures = self.poll_failures.saturating_add(1);
        }
    }

    pub fn begin_search(&mut self, text: &str) -> Result<SearchAdmission, SessionError> {
        let search = match self.state {
            JobState::Ready(search) => search,
            _ => return Err(SessionError::NotReady),
        };
        if self.job_id.is_none() {
            return Err(SessionError::MissingJobId);
        }
        if search == SearchState::Searching {
            return Ok(SearchAdmission::InFlight);
        }
        if meaningful_chars(text) < MIN_QUERY_CHARS {
            return Err(SessionError::InvalidQuery {
                min: MIN_QUERY_CHARS,
            });
        }

        self.state = JobState::Ready(SearchState::Searching);
        self.last_query = Some(text.to_string());
        self.search_result = None;
        self.clip_reference = None;
        self.search_error = None;
        Ok(SearchAdmission::Started)
    }

    pub fn on_search_result(
        &mut self,
        result: SearchResult,
        clip_reference: Option<String>,
    ) -> Result<(), SessionError> {
        if self.state != JobState::Ready(SearchState::Searching) {
            return Err(SessionError::InvalidState {
                op: "accept search result",
                state: self.state,
            });
        }
        self.state = JobState::Ready(SearchState::HasResult);
        // No match never carries a clip.
        self.clip_reference = if result.is_no_match() { None } else { clip_reference };
        self.search_result = Some(result);
        Ok(())
    }

    pub fn on_search_failed(&mut self, message: &str) -> Result<(), SessionError> {
        if self.state != JobState::Ready(SearchState::Searching) {
            return Err(SessionError::InvalidState {
                op: "record search failure",
                state: self.state,
            });
        }
        self.state = JobState::Ready(SearchState::SearchFailed);
        self.search_result = None;
        self.clip_reference = None;
        self.search_error = Some(message.to_string());
        Ok(())
    }
}
