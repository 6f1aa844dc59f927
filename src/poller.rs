use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::kernel::epoch::SessionEpoch;
use crate::kernel::event::Event;
use crate::kernel::session::{JobId, JobMode};
use crate::kernel::time::Tick;
use crate::services::backend::Transport;

/// Owned handle to one running poller. Dropping it cancels the task.
#[derive(Debug)]
pub struct PollerHandle {
    epoch: SessionEpoch,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn epoch(&self) -> SessionEpoch {
        self.epoch
    }

    /// Idempotent. No tick reaches the channel after this returns.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

pub struct StatusPoller {
    transport: Arc<dyn Transport>,
    tx: mpsc::Sender<Event>,
    interval: Duration,
}

impl StatusPoller {
    pub fn new(transport: Arc<dyn Transport>, tx: mpsc::Sender<Event>, interval: Duration) -> Self {
        Self {
            transport,
            tx,
            interval,
        }
    }

    /// Spawns a poller bound to one job. The first fetch happens one interval
    /// after start.
    pub fn start(&self, epoch: SessionEpoch, mode: JobMode, job_id: JobId) -> PollerHandle {
        let token = CancellationToken::new();
        let task = tokio::spawn(run(
            self.transport.clone(),
            self.tx.clone(),
            token.clone(),
            self.interval,
            epoch,
            mode,
            job_id,
        ));

        PollerHandle { epoch, token, task }
    }
}

async fn run(
    transport: Arc<dyn Transport>,
    tx: mpsc::Sender<Event>,
    token: CancellationToken,
    period: Duration,
    epoch: SessionEpoch,
    mode: JobMode,
    job_id: JobId,
) {
    info!("Poller started for job {} every {}ms", job_id, period.as_millis());

    let mut cadence = interval_at(Instant::now() + period, period);
    cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut tick = Tick::new();

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = cadence.tick() => {}
        }

        tick = tick.next();
        let fetched = tokio::select! {
            _ = token.cancelled() => break,
            result = transport.fetch_status(mode, &job_id) => result,
        };
        // Cancellation may have raced the fetch; its result is dropped.
        if token.is_cancelled() {
            break;
        }

        match fetched {
            Ok(report) => {
                let terminal = report.ready || report.error_message().is_some();
                if !emit(&tx, &token, Event::StatusArrived { epoch, tick, report }).await {
                    break;
                }
                if terminal {
                    info!("Poller for job {} reached a terminal status at tick {}", job_id, tick.seq);
                    break;
                }
            }
            Err(error) => {
                debug!("Poll tick {} for job {} failed: {}", tick.seq, job_id, error);
                if !emit(&tx, &token, Event::PollFailed { epoch, tick, error }).await {
                    break;
                }
            }
        }
    }

    debug!("Poller for job {} stopped", job_id);
}

async fn emit(tx: &mpsc::Sender<Event>, token: &CancellationToken, event: Event) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        sent = tx.send(event) => sent.is_ok(),
    }
}
