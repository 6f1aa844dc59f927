use super::epoch::SessionEpoch;
use super::session::{JobId, SearchResult};
use super::time::Tick;
use crate::services::backend::{StatusReport, TransportError};

/// Messages from background tasks back to the manager.
///
/// Every variant carries the epoch of the session that started the work; the
/// manager drops anything whose epoch is no longer current.
#[derive(Debug, Clone)]
pub enum Event {
    UploadProgress {
        epoch: SessionEpoch,
        percent: u8,
    },
    Submitted {
        epoch: SessionEpoch,
        result: Result<JobId, TransportError>,
    },
    StatusArrived {
        epoch: SessionEpoch,
        tick: Tick,
        report: StatusReport,
    },
    /// Transport failure on a poll tick. Absorbed, never terminal.
    PollFailed {
        epoch: SessionEpoch,
        tick: Tick,
        error: TransportError,
    },
    SearchSettled {
        epoch: SessionEpoch,
        outcome: Result<SettledSearch, TransportError>,
    },
}

/// A search response already mapped for display.
#[derive(Debug, Clone, PartialEq)]
pub struct SettledSearch {
    pub result: SearchResult,
    pub clip_reference: Option<String>,
}

impl Event {
    pub fn epoch(&self) -> SessionEpoch {
        match self {
            Event::UploadProgress { epoch, .. }
            | Event::Submitted { epoch, .. }
            | Event::StatusArrived { epoch, .. }
            | Event::PollFailed { epoch, .. }
            | Event::SearchSettled { epoch, .. } => *epoch,
        }
    }
}
