//! Generation job lifecycle: launch, simulated progress, single result fetch.
//!
//! The controller is a synchronous state machine over [`AppState`]. Every
//! mutation is persisted through the injected [`StateStore`] before the
//! method returns. Network calls happen outside of it; their continuations
//! come back tagged with the epoch captured at launch and are dropped when
//! a newer job has been started in the meantime.

use crate::api::{JobStatusResponse, TimetableApi, RESULT_SUCCESS};
use crate::clock::Clock;
use crate::decode::{decode_result, DecodedTimetable};
use crate::error::{GenerationError, Result, StoreError};
use crate::estimate::{deadline_millis, estimated_duration_seconds, Progress};
use crate::storage::StateStore;
use crate::{AppState, Phase, TimetableJobState};

/// What happens to the previous timetable when a new job is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionPolicy {
    /// Clear the old result at launch, even if the new job later fails.
    #[default]
    DiscardOnStart,
    /// Keep showing the old result until a new one decodes successfully.
    KeepUntilSuccess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// No job is ticking.
    Idle,
    /// Still within the estimate.
    Running(Progress),
    /// The adjusted duration has elapsed; the result should be fetched now.
    Elapsed,
}

pub struct GenerationController<S, C> {
    state: AppState,
    store: S,
    clock: C,
    retention: RetentionPolicy,
}

impl<S: StateStore, C: Clock> GenerationController<S, C> {
    pub fn new(state: AppState, store: S, clock: C, retention: RetentionPolicy) -> Self {
        Self {
            state,
            store,
            clock,
            retention,
        }
    }

    /// Rebuilds the controller from whatever the store holds.
    pub fn restore(store: S, clock: C, retention: RetentionPolicy) -> std::result::Result<Self, StoreError> {
        let mut state = store.load()?.unwrap_or_default();
        let job = &mut state.timetable;
        if job.starting {
            // The start request died with the previous process.
            let error = GenerationError::StartInterrupted;
            tracing::warn!(epoch = job.epoch, error = %error, "discarding launch without job id");
            job.starting = false;
            job.is_generating = false;
            job.job_id = None;
            job.last_error = Some(error.user_message().to_string());
            store.save(&state)?;
        } else if state.timetable.is_generating {
            tracing::info!(
                epoch = state.timetable.epoch,
                job_id = ?state.timetable.job_id,
                "resuming generation from stored state"
            );
        }
        Ok(Self::new(state, store, clock, retention))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn job(&self) -> &TimetableJobState {
        &self.state.timetable
    }

    pub fn phase(&self) -> Phase {
        self.state.timetable.phase()
    }

    pub fn epoch(&self) -> u64 {
        self.state.timetable.epoch
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Simulated progress of the running job, if any.
    pub fn progress(&self) -> Option<Progress> {
        let job = &self.state.timetable;
        if !job.is_generating {
            return None;
        }
        let start = job.start_timestamp?;
        Some(Progress::at(
            start,
            job.estimated_duration_seconds,
            self.clock.now_millis(),
        ))
    }

    /// Applies a change to the non-job part of the state and persists it.
    pub fn update_state(&mut self, update: impl FnOnce(&mut AppState)) -> Result<()> {
        update(&mut self.state);
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        self.store.save(&self.state)?;
        Ok(())
    }

    fn is_current(&self, epoch: u64, what: &str) -> bool {
        let current = self.state.timetable.epoch;
        if epoch != current {
            tracing::debug!(epoch, current, "dropping stale {what}");
        }
        epoch == current
    }

    /// Resets the job state for a new launch and returns its epoch.
    ///
    /// Any job still in flight is superseded; its continuations will carry
    /// an older epoch and be ignored.
    pub fn begin_generation(&mut self, class_count: u32) -> Result<u64> {
        let now = self.clock.now_millis();
        let job = &mut self.state.timetable;
        if job.is_generating || job.starting || job.job_id.is_some() {
            tracing::warn!(
                epoch = job.epoch,
                job_id = ?job.job_id,
                "starting a new generation over an unfinished job"
            );
        }

        job.epoch += 1;
        job.job_id = None;
        job.is_generating = true;
        job.starting = true;
        job.estimated_duration_seconds = estimated_duration_seconds(class_count);
        job.start_timestamp = Some(now);
        job.last_error = None;
        if self.retention == RetentionPolicy::DiscardOnStart {
            job.exists = false;
            job.class_names.clear();
            job.teacher_names.clear();
            job.num_periods = 0;
            job.lessons.clear();
        }

        tracing::info!(
            epoch = job.epoch,
            class_count,
            estimated_secs = job.estimated_duration_seconds,
            "generation launched"
        );
        let epoch = job.epoch;
        self.persist()?;
        Ok(epoch)
    }

    pub fn record_job_started(&mut self, epoch: u64, job_id: String) -> Result<()> {
        if !self.is_current(epoch, "job start") {
            return Ok(());
        }
        tracing::info!(epoch, job_id = %job_id, "remote job assigned");
        self.state.timetable.job_id = Some(job_id);
        self.state.timetable.starting = false;
        self.persist()
    }

    /// Advances the local countdown. Never touches the network.
    pub fn tick(&mut self) -> Result<Tick> {
        let job = &self.state.timetable;
        if !job.is_generating {
            return Ok(Tick::Idle);
        }
        let now = self.clock.now_millis();
        let start = job.start_timestamp.unwrap_or(now);
        if now >= deadline_millis(start, job.estimated_duration_seconds) {
            self.state.timetable.is_generating = false;
            tracing::info!(epoch = self.state.timetable.epoch, "estimated duration elapsed");
            self.persist()?;
            return Ok(Tick::Elapsed);
        }
        Ok(Tick::Running(Progress::at(
            start,
            job.estimated_duration_seconds,
            now,
        )))
    }

    /// Epoch and job id of a job whose countdown is over but whose result
    /// has not been fetched.
    pub fn pending_fetch(&self) -> Option<(u64, String)> {
        let job = &self.state.timetable;
        if job.is_generating {
            return None;
        }
        job.job_id.clone().map(|id| (job.epoch, id))
    }

    /// Interprets the single status response of a job.
    pub fn record_result(&mut self, epoch: u64, response: JobStatusResponse) -> Result<()> {
        if !self.is_current(epoch, "job result") {
            return Ok(());
        }
        match interpret(&response) {
            Ok(decoded) => {
                self.apply_decoded(decoded);
                self.persist()
            }
            Err(e) => self.fail(epoch, e),
        }
    }

    /// Terminates the job of `epoch` with `error`.
    ///
    /// Returns the error back unless it belongs to a stale epoch.
    pub fn fail(&mut self, epoch: u64, error: GenerationError) -> Result<()> {
        if !self.is_current(epoch, "job failure") {
            return Ok(());
        }
        tracing::warn!(epoch, error = %error, "generation failed");
        let job = &mut self.state.timetable;
        job.is_generating = false;
        job.starting = false;
        job.job_id = None;
        job.last_error = Some(error.user_message().to_string());
        self.persist()?;
        Err(error)
    }

    fn apply_decoded(&mut self, decoded: DecodedTimetable) {
        let job = &mut self.state.timetable;
        tracing::info!(
            epoch = job.epoch,
            lessons = decoded.lessons.len(),
            classes = decoded.class_names.len(),
            "timetable decoded"
        );
        job.class_names = decoded.class_names;
        job.teacher_names = decoded.teacher_names;
        job.num_periods = decoded.num_periods;
        job.lessons = decoded.lessons;
        job.exists = true;
        job.is_generating = false;
        job.starting = false;
        job.job_id = None;
        job.last_error = None;
    }

    /// Launches a job: resets state, asks the backend for a job id, stores it.
    pub async fn start_generation(&mut self, api: &dyn TimetableApi, class_count: u32) -> Result<()> {
        let epoch = self.begin_generation(class_count)?;
        match api.start_job().await {
            Ok(job_id) => self.record_job_started(epoch, job_id),
            Err(e) => self.fail(epoch, GenerationError::StartFailed(e)),
        }
    }

    /// Fetches the job result once, if one is due. Returns whether a fetch
    /// was made.
    pub async fn fetch_result(&mut self, api: &dyn TimetableApi) -> Result<bool> {
        let Some((epoch, job_id)) = self.pending_fetch() else {
            return Ok(false);
        };
        match api.job_status(&job_id).await {
            Ok(response) => self.record_result(epoch, response)?,
            Err(e) => self.fail(epoch, GenerationError::FetchError(e))?,
        }
        Ok(true)
    }
}

/// Decision tree over a job status response.
pub fn interpret(response: &JobStatusResponse) -> std::result::Result<DecodedTimetable, GenerationError> {
    if !response.is_finished() {
        return Err(GenerationError::GenerationTimedOutOrFailed {
            status: response.status.clone(),
        });
    }
    let result = match (&response.result, response.result_status()) {
        (Some(result), Some(RESULT_SUCCESS)) => result,
        (_, status) => {
            return Err(GenerationError::GenerationRejected {
                status: status.unwrap_or("missing").to_string(),
            })
        }
    };
    Ok(decode_result(result)?)
}
