use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::kernel::epoch::SessionEpoch;
use crate::kernel::event::{Event, SettledSearch};
use crate::kernel::session::{JobId, JobMode};
use crate::services::backend::{SearchRequest, SearchResponse, Transport};

/// Result cap sent with every search.
pub const TOP_K: u32 = 3;
/// Length of the clip the backend cuts around the best match, in seconds.
pub const CLIP_DURATION_SECS: f64 = 10.0;

pub fn build_request(query: &str) -> SearchRequest {
    SearchRequest {
        query: query.to_string(),
        top_k: TOP_K,
        clip_duration: CLIP_DURATION_SECS,
    }
}

/// Absolute clip URL with a cache-busting `t` parameter, so a re-cut clip at
/// the same path is fetched again.
pub fn resolve_clip_url(base_url: &str, clip_url: &str, nonce: u128) -> String {
    let base = base_url.trim_end_matches('/');
    let separator = if clip_url.contains('?') { '&' } else { '?' };
    if clip_url.starts_with("http://") || clip_url.starts_with("https://") {
        format!("{}{}t={}", clip_url, separator, nonce)
    } else if clip_url.starts_with('/') {
        format!("{}{}{}t={}", base, clip_url, separator, nonce)
    } else {
        format!("{}/{}{}t={}", base, clip_url, separator, nonce)
    }
}

pub fn map_response(base_url: &str, response: SearchResponse, nonce: u128) -> SettledSearch {
    let result = response.into_result();
    let clip_reference = result
        .best
        .as_ref()
        .and_then(|best| best.clip_url.as_deref())
        .filter(|url| !url.is_empty())
        .map(|url| resolve_clip_url(base_url, url, nonce));

    SettledSearch {
        result,
        clip_reference,
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

#[derive(Debug)]
struct InFlight {
    epoch: SessionEpoch,
    token: CancellationToken,
}

/// Submits at most one search at a time and reports the settlement as an
/// `Event::SearchSettled`.
pub struct SearchDispatcher {
    transport: Arc<dyn Transport>,
    tx: mpsc::Sender<Event>,
    base_url: String,
    in_flight: Option<InFlight>,
}

impl SearchDispatcher {
    pub fn new(transport: Arc<dyn Transport>, tx: mpsc::Sender<Event>, base_url: &str) -> Self {
        Self {
            transport,
            tx,
            base_url: base_url.trim_end_matches('/').to_string(),
            in_flight: None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Returns false without doing anything if a search is already running.
    pub fn dispatch(&mut self, epoch: SessionEpoch, mode: JobMode, job_id: JobId, query: &str) -> bool {
        if self.in_flight.is_some() {
            debug!("Search already in flight; ignoring new query");
            return false;
        }

        let token = CancellationToken::new();
        let request = build_request(query);
        let transport = self.transport.clone();
        let tx = self.tx.clone();
        let base_url = self.base_url.clone();
        let task_token = token.clone();

        info!("Searching {} job {} (top_k={})", mode, job_id, request.top_k);

        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = task_token.cancelled() => return,
                result = transport.search(mode, &job_id, &request) => result,
            };
            if task_token.is_cancelled() {
                return;
            }

            let outcome = outcome.map(|response| map_response(&base_url, response, now_millis()));
            tokio::select! {
                _ = task_token.cancelled() => {}
                _ = tx.send(Event::SearchSettled { epoch, outcome }) => {}
            }
        });

        self.in_flight = Some(InFlight { epoch, token });
        true
    }

    /// Called when the settlement for `epoch` has been applied.
    pub fn settle(&mut self, epoch: SessionEpoch) {
        if self.in_flight.as_ref().map_or(false, |f| f.epoch == epoch) {
            self.in_flight = None;
        }
    }

    /// Cancels the running search, if any. Its result will never be sent.
    pub fn abandon(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            debug!("Abandoning in-flight search for epoch {:?}", in_flight.epoch);
            in_flight.token.cancel();
        }
    }
}

impl Drop for SearchDispatcher {
    fn drop(&mut self) {
        self.abandon();
    }
}
