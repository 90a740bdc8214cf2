//! Single task owning the [`GenerationController`].
//!
//! All state changes go through messages handled one at a time. Network
//! calls run in their own tasks and report back with the epoch they were
//! started for, so a result from a superseded job never lands on the new one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::{JobStatusResponse, TimetableApi};
use crate::clock::Clock;
use crate::controller::{GenerationController, Tick};
use crate::error::GenerationError;
use crate::estimate::Progress;
use crate::storage::StateStore;
use crate::{AppState, Phase};

pub enum ControllerMessage {
    /// Launch a new job for `class_count` classes.
    Start {
        class_count: u32,
        response_tx: oneshot::Sender<Result<u64, GenerationError>>,
    },
    /// Advance the local countdown.
    Tick,
    JobStarted {
        epoch: u64,
        job_id: String,
    },
    ResultFetched {
        epoch: u64,
        response: JobStatusResponse,
    },
    Failed {
        epoch: u64,
        error: GenerationError,
    },
    Snapshot {
        response_tx: oneshot::Sender<AppState>,
    },
}

/// Read-only picture of the controller for presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationView {
    pub phase: Phase,
    pub epoch: u64,
    pub job_id: Option<String>,
    pub progress: Option<Progress>,
    pub last_error: Option<String>,
    pub lesson_count: usize,
}

impl GenerationView {
    fn of<S: StateStore, C: Clock>(controller: &GenerationController<S, C>) -> Self {
        let job = controller.job();
        Self {
            phase: job.phase(),
            epoch: job.epoch,
            job_id: job.job_id.clone(),
            progress: controller.progress(),
            last_error: job.last_error.clone(),
            lesson_count: job.lessons.len(),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.phase.is_settled()
    }
}

struct GenerationDriver<S, C> {
    controller: GenerationController<S, C>,
    api: Arc<dyn TimetableApi>,
    message_tx: mpsc::WeakSender<ControllerMessage>,
    view_tx: watch::Sender<GenerationView>,
    /// Epoch whose result fetch has already been dispatched.
    fetching: Option<u64>,
    tick_interval: Duration,
}

/// Spawns the driver task. It stops once every handle has been dropped.
pub fn spawn_driver<S, C>(
    controller: GenerationController<S, C>,
    api: Arc<dyn TimetableApi>,
    tick_interval: Duration,
) -> ControllerHandle
where
    S: StateStore + 'static,
    C: Clock + 'static,
{
    let (message_tx, message_rx) = mpsc::channel(64);
    let (view_tx, view_rx) = watch::channel(GenerationView::of(&controller));

    let driver = GenerationDriver {
        controller,
        api,
        message_tx: message_tx.downgrade(),
        view_tx,
        fetching: None,
        tick_interval,
    };
    let task = tokio::spawn(driver.run(message_rx));

    ControllerHandle {
        message_tx,
        view_rx,
        task: Arc::new(task),
    }
}

impl<S, C> GenerationDriver<S, C>
where
    S: StateStore + 'static,
    C: Clock + 'static,
{
    async fn run(mut self, mut message_rx: mpsc::Receiver<ControllerMessage>) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // A restored state may already be past its countdown.
        self.dispatch_fetch();
        self.publish();

        loop {
            let generating = self.controller.job().is_generating;

            tokio::select! {
                msg = message_rx.recv() => match msg {
                    Some(msg) => self.handle(msg),
                    None => break,
                },
                _ = ticker.tick(), if generating => self.handle(ControllerMessage::Tick),
            }

            self.dispatch_fetch();
            self.publish();
        }

        tracing::debug!("generation driver stopped");
    }

    fn handle(&mut self, msg: ControllerMessage) {
        match msg {
            ControllerMessage::Start {
                class_count,
                response_tx,
            } => {
                let result = self.controller.begin_generation(class_count);
                if let Ok(epoch) = result {
                    self.fetching = None;
                    self.spawn_start(epoch);
                }
                let _ = response_tx.send(result);
            }
            ControllerMessage::Tick => match self.controller.tick() {
                Ok(Tick::Elapsed) => tracing::debug!("countdown finished"),
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "tick failed to persist"),
            },
            ControllerMessage::JobStarted { epoch, job_id } => {
                if let Err(e) = self.controller.record_job_started(epoch, job_id) {
                    tracing::error!(error = %e, "could not record job id");
                }
            }
            ControllerMessage::ResultFetched { epoch, response } => {
                let result = self.controller.record_result(epoch, response);
                log_storage_failure(result, "job result");
            }
            ControllerMessage::Failed { epoch, error } => {
                let result = self.controller.fail(epoch, error);
                log_storage_failure(result, "job failure");
            }
            ControllerMessage::Snapshot { response_tx } => {
                let _ = response_tx.send(self.controller.state().clone());
            }
        }
    }

    fn spawn_start(&self, epoch: u64) {
        let api = Arc::clone(&self.api);
        let message_tx = self.message_tx.clone();
        tokio::spawn(async move {
            let msg = match api.start_job().await {
                Ok(job_id) => ControllerMessage::JobStarted { epoch, job_id },
                Err(e) => ControllerMessage::Failed {
                    epoch,
                    error: GenerationError::StartFailed(e),
                },
            };
            if let Some(tx) = message_tx.upgrade() {
                let _ = tx.send(msg).await;
            }
        });
    }

    /// Fetches the result at most once per epoch.
    fn dispatch_fetch(&mut self) {
        let Some((epoch, job_id)) = self.controller.pending_fetch() else {
            return;
        };
        if self.fetching == Some(epoch) {
            return;
        }
        self.fetching = Some(epoch);
        tracing::info!(epoch, job_id = %job_id, "fetching generation result");

        let api = Arc::clone(&self.api);
        let message_tx = self.message_tx.clone();
        tokio::spawn(async move {
            let msg = match api.job_status(&job_id).await {
                Ok(response) => ControllerMessage::ResultFetched { epoch, response },
                Err(e) => ControllerMessage::Failed {
                    epoch,
                    error: GenerationError::FetchError(e),
                },
            };
            if let Some(tx) = message_tx.upgrade() {
                let _ = tx.send(msg).await;
            }
        });
    }

    fn publish(&self) {
        self.view_tx.send_replace(GenerationView::of(&self.controller));
    }
}

/// Job failures are recorded and logged by the controller; a failed save is not.
fn log_storage_failure(result: Result<(), GenerationError>, what: &str) {
    if let Err(GenerationError::Storage(e)) = result {
        tracing::error!(error = %e, "could not persist {}", what);
    }
}

#[derive(Clone)]
pub struct ControllerHandle {
    message_tx: mpsc::Sender<ControllerMessage>,
    view_rx: watch::Receiver<GenerationView>,
    task: Arc<JoinHandle<()>>,
}

impl ControllerHandle {
    /// Launches a job and returns its epoch.
    pub async fn start(&self, class_count: u32) -> Result<u64, GenerationError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(ControllerMessage::Start {
            class_count,
            response_tx,
        })
        .await?;
        response_rx
            .await
            .map_err(|_| GenerationError::ControllerStopped)?
    }

    pub async fn tick(&self) -> Result<(), GenerationError> {
        self.send(ControllerMessage::Tick).await
    }

    pub async fn snapshot(&self) -> Result<AppState, GenerationError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(ControllerMessage::Snapshot { response_tx }).await?;
        response_rx
            .await
            .map_err(|_| GenerationError::ControllerStopped)
    }

    pub fn view(&self) -> GenerationView {
        self.view_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GenerationView> {
        self.view_rx.clone()
    }

    /// Waits until the job of `epoch` (or a later one) has settled.
    pub async fn wait_settled(&self, epoch: u64) -> Result<GenerationView, GenerationError> {
        let mut view_rx = self.view_rx.clone();
        let view = view_rx
            .wait_for(|view| view.epoch >= epoch && view.is_settled())
            .await
            .map_err(|_| GenerationError::ControllerStopped)?;
        Ok(view.clone())
    }

    /// Waits until the backend has accepted the job of `epoch`, or the job
    /// has ended without an id.
    pub async fn wait_started(&self, epoch: u64) -> Result<GenerationView, GenerationError> {
        let mut view_rx = self.view_rx.clone();
        let view = view_rx
            .wait_for(|view| {
                view.epoch > epoch
                    || (view.epoch == epoch && (view.job_id.is_some() || view.is_settled()))
            })
            .await
            .map_err(|_| GenerationError::ControllerStopped)?;
        Ok(view.clone())
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    async fn send(&self, msg: ControllerMessage) -> Result<(), GenerationError> {
        self.message_tx
            .send(msg)
            .await
            .map_err(|_| GenerationError::ControllerStopped)
    }
}
