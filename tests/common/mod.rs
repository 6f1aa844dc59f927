#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clipfinder::config::AudioSettings;
use clipfinder::kernel::session::{JobId, JobMode, SearchHit};
use clipfinder::services::backend::{
    Asset, ProgressFn, SearchRequest, SearchResponse, StatusReport, Transport, TransportError,
};

/// Scripted backend. Status responses are served in order; once the script
/// runs out the fallback is repeated forever.
pub struct FakeTransport {
    submit_result: Mutex<Result<String, TransportError>>,
    submit_delay: Duration,
    progress_steps: Vec<u8>,
    statuses: Mutex<VecDeque<Result<StatusReport, TransportError>>>,
    fallback_status: Result<StatusReport, TransportError>,
    status_delay: Duration,
    searches: Mutex<VecDeque<Result<SearchResponse, TransportError>>>,
    search_delay: Duration,

    pub submit_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub submitted: Mutex<Vec<(JobMode, String, Option<AudioSettings>)>>,
    pub search_requests: Mutex<Vec<SearchRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            submit_result: Mutex::new(Ok("job-1".to_string())),
            submit_delay: Duration::from_millis(50),
            progress_steps: Vec::new(),
            statuses: Mutex::new(VecDeque::new()),
            fallback_status: Ok(processing("EXTRACTING", 10.0)),
            status_delay: Duration::ZERO,
            searches: Mutex::new(VecDeque::new()),
            search_delay: Duration::from_millis(50),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
            search_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_submit_result(self, result: Result<&str, TransportError>) -> Self {
        *self.submit_result.lock().unwrap() = result.map(|id| id.to_string());
        self
    }

    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    pub fn with_progress_steps(mut self, steps: Vec<u8>) -> Self {
        self.progress_steps = steps;
        self
    }

    pub fn with_statuses(self, statuses: Vec<Result<StatusReport, TransportError>>) -> Self {
        *self.statuses.lock().unwrap() = statuses.into();
        self
    }

    pub fn with_fallback_status(mut self, status: Result<StatusReport, TransportError>) -> Self {
        self.fallback_status = status;
        self
    }

    /// Keeps every status fetch in flight for `delay`.
    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = delay;
        self
    }

    pub fn with_searches(self, searches: Vec<Result<SearchResponse, TransportError>>) -> Self {
        *self.searches.lock().unwrap() = searches.into();
        self
    }

    pub fn with_search_delay(mut self, delay: Duration) -> Self {
        self.search_delay = delay;
        self
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn submit(
        &self,
        mode: JobMode,
        asset: &Asset,
        audio: Option<&AudioSettings>,
        progress: ProgressFn,
    ) -> Result<JobId, TransportError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted
            .lock()
            .unwrap()
            .push((mode, asset.file_name.clone(), audio.cloned()));

        for step in &self.progress_steps {
            progress(*step);
            tokio::time::sleep(self.submit_delay).await;
        }
        tokio::time::sleep(self.submit_delay).await;

        self.submit_result.lock().unwrap().clone().map(JobId)
    }

    async fn fetch_status(&self, _mode: JobMode, _job_id: &JobId) -> Result<StatusReport, TransportError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if !self.status_delay.is_zero() {
            tokio::time::sleep(self.status_delay).await;
        }
        let next = self.statuses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback_status.clone())
    }

    async fn search(
        &self,
        _mode: JobMode,
        _job_id: &JobId,
        request: &SearchRequest,
    ) -> Result<SearchResponse, TransportError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.search_requests.lock().unwrap().push(request.clone());
        tokio::time::sleep(self.search_delay).await;
        let next = self.searches.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(SearchResponse::default()))
    }
}

pub fn processing(stage: &str, progress: f64) -> StatusReport {
    StatusReport {
        stage: Some(stage.to_string()),
        progress: Some(progress),
        ready: false,
        error: None,
    }
}

pub fn ready() -> StatusReport {
    StatusReport {
        stage: Some("READY".to_string()),
        progress: Some(100.0),
        ready: true,
        error: None,
    }
}

pub fn failed(message: &str) -> StatusReport {
    StatusReport {
        stage: Some("FAILED".to_string()),
        progress: Some(0.0),
        ready: false,
        error: Some(message.to_string()),
    }
}

pub fn hit(start: f64, text: &str, clip_url: Option<&str>) -> SearchHit {
    SearchHit {
        start,
        timestamp: None,
        text: Some(text.to_string()),
        score: Some(0.9),
        clip_url: clip_url.map(|u| u.to_string()),
    }
}

pub fn found(best: SearchHit, alternates: Vec<SearchHit>) -> SearchResponse {
    SearchResponse {
        best: Some(best),
        alternates: Some(alternates),
    }
}

pub fn video() -> Asset {
    Asset::from_bytes("movie.mp4", vec![7u8; 4096])
}

pub fn as_transport(fake: &Arc<FakeTransport>) -> Arc<dyn Transport> {
    fake.clone()
}
