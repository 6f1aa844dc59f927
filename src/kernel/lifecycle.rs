use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::epoch::SessionEpoch;
use super::error::SessionError;
use super::event::Event;
use super::machine::{SearchAdmission, TickOutcome};
use super::session::{JobId, JobMode, JobState, Session};
use crate::config::{AudioSettings, ClientConfig};
use crate::poller::{PollerHandle, StatusPoller};
use crate::search::SearchDispatcher;
use crate::services::backend::{Asset, ProgressFn, Transport};

/// Owns the one current session and every task working on its behalf.
///
/// All background work reports back through a single channel; `apply` checks
/// each event's epoch against the current one before any transition runs, so
/// work started for a superseded session can never mutate the new one.
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    receiver: mpsc::Receiver<Event>,
    tx: mpsc::Sender<Event>,
    session: Session,
    epoch: SessionEpoch,
    // Survives resets; copied into the session at submission.
    audio: AudioSettings,
    submission: Option<CancellationToken>,
    status_poller: StatusPoller,
    poller: Option<PollerHandle>,
    search: SearchDispatcher,
    discarded: u64,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self::with_mode(transport, config, JobMode::default())
    }

    pub fn with_mode(transport: Arc<dyn Transport>, config: ClientConfig, mode: JobMode) -> Self {
        let (tx, receiver) = mpsc::channel(config.event_buffer.max(1));
        let session = Session::new(mode);
        let epoch = SessionEpoch::first(session.id());
        let status_poller = StatusPoller::new(transport.clone(), tx.clone(), config.poll_interval());
        let search = SearchDispatcher::new(transport.clone(), tx.clone(), config.base());

        info!("Session manager ready ({} mode, backend {})", mode, config.base());

        Self {
            transport,
            config,
            receiver,
            tx,
            session,
            epoch,
            audio: AudioSettings::default(),
            submission: None,
            status_poller,
            poller: None,
            search,
            discarded: 0,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn epoch(&self) -> SessionEpoch {
        self.epoch
    }

    pub fn mode(&self) -> JobMode {
        self.session.mode()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn audio_settings(&self) -> &AudioSettings {
        &self.audio
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().map_or(false, |p| !p.is_finished())
    }

    pub fn is_submitting(&self) -> bool {
        self.submission.is_some()
    }

    pub fn is_search_in_flight(&self) -> bool {
        self.search.is_in_flight()
    }

    /// Events dropped because they belonged to a superseded session.
    pub fn discarded_events(&self) -> u64 {
        self.discarded
    }

    pub fn set_audio_settings(&mut self, settings: AudioSettings) -> Result<(), SessionError> {
        if self.session.job_id().is_some() || self.session.state() == JobState::Submitting {
            return Err(SessionError::SettingsLocked);
        }
        self.audio = settings;
        Ok(())
    }

    pub fn reset(&mut self) -> SessionEpoch {
        let mode = self.session.mode();
        self.renew(mode)
    }

    pub fn switch_mode(&mut self, mode: JobMode) -> SessionEpoch {
        self.renew(mode)
    }

    /// Stops everything tied to the current session. The session itself is
    /// left as is.
    pub fn shutdown(&mut self) {
        self.teardown();
    }

    /// Every upload is a new run: the current session is replaced before the
    /// submission starts.
    pub fn start_upload(&mut self, asset: Asset) -> Result<SessionEpoch, SessionError> {
        let mode = self.session.mode();
        let epoch = self.renew(mode);

        let audio = match mode {
            JobMode::Audio => Some(self.audio.clone()),
            JobMode::Scene => None,
        };
        self.session.begin_submission(&asset.file_name, audio.clone())?;

        let token = CancellationToken::new();
        let progress_tx = self.tx.clone();
        // Progress is advisory: drop updates rather than block the upload.
        let progress: ProgressFn = Arc::new(move |percent| {
            let _ = progress_tx.try_send(Event::UploadProgress { epoch, percent });
        });

        let transport = self.transport.clone();
        let tx = self.tx.clone();
        let task_token = token.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                _ = task_token.cancelled() => return,
                result = transport.submit(mode, &asset, audio.as_ref(), progress) => result,
            };
            if task_token.is_cancelled() {
                return;
            }
            tokio::select! {
                _ = task_token.cancelled() => {}
                _ = tx.send(Event::Submitted { epoch, result }) => {}
            }
        });

        self.submission = Some(token);
        Ok(epoch)
    }

    /// Validates locally, then dispatches. A call while a search is in flight
    /// is a no-op.
    pub fn begin_search(&mut self, query: &str) -> Result<SearchAdmission, SessionError> {
        let admission = self.session.begin_search(query)?;
        match admission {
            SearchAdmission::Started => {
                let job_id = self
                    .session
                    .job_id()
                    .cloned()
                    .ok_or(SessionError::MissingJobId)?;
                let mode = self.session.mode();
                if !self.search.dispatch(self.epoch, mode, job_id, query) {
                    // Nothing will settle this search; release the session.
                    warn!("Search dispatcher busy while session was not searching");
                    self.session.on_search_failed("A search is already running")?;
                    return Ok(SearchAdmission::InFlight);
                }
            }
            SearchAdmission::InFlight => debug!("Search already in flight; ignoring"),
        }
        Ok(admission)
    }

    /// Applies one event. Returns whether it changed the session.
    pub fn apply(&mut self, event: Event) -> bool {
        if event.epoch() != self.epoch {
            self.discarded += 1;
            info!(
                "Discarded stale event: epoch {} vs current {}",
                event.epoch().generation,
                self.epoch.generation
            );
            return false;
        }

        match event {
            Event::UploadProgress { percent, .. } => {
                let before = self.session.upload_percent();
                self.session.on_upload_progress(percent);
                before != self.session.upload_percent()
            }
            Event::Submitted { result, .. } => {
                self.submission = None;
                match result {
                    Ok(job_id) => match self.session.on_submitted(job_id.clone()) {
                        Ok(()) => {
                            info!("Job {} accepted; processing started", job_id);
                            self.start_polling(job_id);
                            true
                        }
                        Err(e) => {
                            warn!("Ignoring job id {}: {}", job_id, e);
                            false
                        }
                    },
                    Err(error) => {
                        warn!("Submission failed: {}", error);
                        self.session.on_submit_failed(&error.user_message()).is_ok()
                    }
                }
            }
            Event::StatusArrived { tick, report, .. } => match self.session.on_status_tick(tick, &report) {
                Ok(outcome) => {
                    if outcome.is_terminal() {
                        self.stop_polling();
                    }
                    match outcome {
                        TickOutcome::BecameReady => info!("Job is ready for search"),
                        TickOutcome::Failed => warn!(
                            "Processing failed: {}",
                            self.session.error_message().unwrap_or_default()
                        ),
                        TickOutcome::Progressed => debug!(
                            "Tick {}: {} ({}%)",
                            tick.seq,
                            self.session.stage(),
                            self.session.progress_percent()
                        ),
                        TickOutcome::Discarded => {}
                    }
                    outcome != TickOutcome::Discarded
                }
                Err(e) => {
                    warn!("Status tick rejected: {}", e);
                    false
                }
            },
            Event::PollFailed { tick, error, .. } => {
                self.session.on_poll_failed();
                warn!(
                    "Status poll {} failed ({} in a row), will retry: {}",
                    tick.seq,
                    self.session.poll_failures(),
                    error
                );
                true
            }
            Event::SearchSettled { epoch, outcome } => {
                self.search.settle(epoch);
                let applied = match outcome {
                    Ok(settled) => {
                        if settled.result.is_no_match() {
                            info!("Search settled with no match");
                        }
                        self.session
                            .on_search_result(settled.result, settled.clip_reference)
                    }
                    Err(error) => {
                        warn!("Search failed: {}", error);
                        self.session.on_search_failed(&error.user_message())
                    }
                };
                match applied {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Search settlement rejected: {}", e);
                        false
                    }
                }
            }
        }
    }

    /// Applies everything already queued without waiting.
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.receiver.try_recv() {
            if self.apply(event) {
                applied += 1;
            }
        }
        applied
    }

    /// Waits for the next event and applies it.
    pub async fn step(&mut self) -> bool {
        match self.receiver.recv().await {
            Some(event) => self.apply(event),
            None => false,
        }
    }

    /// Steps until `done` holds for the current session. Returns false when
    /// there is no background work left that could make it hold.
    pub async fn wait_until<F>(&mut self, done: F) -> bool
    where
        F: Fn(&Session) -> bool,
    {
        loop {
            let busy = self.has_background_work();
            self.process_pending();
            if done(&self.session) {
                return true;
            }
            if !busy {
                return false;
            }
            self.step().await;
        }
    }

    fn has_background_work(&self) -> bool {
        self.is_submitting() || self.is_polling() || self.is_search_in_flight()
    }

    fn start_polling(&mut self, job_id: JobId) {
        self.stop_polling();
        self.poller = Some(self.status_poller.start(self.epoch, self.session.mode(), job_id));
    }

    fn stop_polling(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.cancel();
        }
    }

    fn teardown(&mut self) {
        if let Some(token) = self.submission.take() {
            token.cancel();
        }
        self.stop_polling();
        self.search.abandon();
    }

    fn renew(&mut self, mode: JobMode) -> SessionEpoch {
        self.teardown();
        let session = Session::new(mode);
        self.epoch = self.epoch.succeed(session.id());
        self.session = session;
        info!("New {} session (generation {})", mode, self.epoch.generation);
        self.epoch
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.teardown();
    }
}
