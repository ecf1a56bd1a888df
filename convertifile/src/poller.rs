//! Status polling engine
//!
//! Given a task id, the poller queries the status endpoint on a fixed
//! interval, classifies each payload into a [`TaskState`], pushes status
//! and progress through a [`JobUpdater`], and resolves once the task
//! completes, fails, times out or is cancelled.
//!
//! - Explicit `meta.message` / `meta.progress` always win over the
//!   state's default label and progress.
//! - After `max_retries` polls without a terminal state the job is
//!   reported as timed out.
//! - More than `error_backoff_threshold` consecutive transient errors
//!   switch the poller to twice the interval for the rest of the task.
//! - Once `probe_after` attempts have passed and the payload still carries
//!   no `status` field, the result endpoint is probed once with HEAD; a
//!   200 completes the job with a synthesized file name.

use crate::client::ConversionBackend;
use crate::config::PollPolicy;
use crate::error::{ConvertError, Result};
use crate::types::{ConversionResult, SourceFile, TaskId, TaskState, TaskStatusPayload};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Status shown when the retry ceiling is reached
pub const TIMED_OUT_STATUS: &str = "Timed out! Retry later.";

/// Status shown when the fallback probe finds the result
pub const PROBE_COMPLETED_STATUS: &str = "Conversion completed!";

/// Sink for the observable state of the jobs of a batch
///
/// Every call addresses one job by index. Implementations must apply each
/// call as a single atomic replacement of that job's record.
pub trait JobUpdater: Send + Sync {
    fn set_status(&self, index: usize, status: &str);
    fn set_progress(&self, index: usize, progress: u8);
    fn set_result(&self, index: usize, result: ConversionResult);

    /// Called once after the last job of a batch resolved
    fn batch_finished(&self, _total: usize) {}
}

/// How a polled task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed(ConversionResult),
    /// The backend reported failure
    Failed { message: String },
    /// Retry ceiling reached without a terminal state
    TimedOut,
    /// The job's token was cancelled; nothing further was reported
    Cancelled,
}

/// What the poller needs to know about the job it polls for
#[derive(Debug, Clone)]
pub struct JobContext {
    pub index: usize,
    pub target_format: String,
    /// Name used when the backend does not report one
    pub fallback_name: String,
}

impl JobContext {
    pub fn new(index: usize, file: &SourceFile, target_format: &str) -> Self {
        Self {
            index,
            target_format: target_format.to_string(),
            fallback_name: file.derived_output_name(target_format),
        }
    }
}

/// Polls task status against a [`ConversionBackend`]
#[derive(Clone)]
pub struct Poller {
    backend: Arc<dyn ConversionBackend>,
    policy: PollPolicy,
}

impl Poller {
    pub fn new(backend: Arc<dyn ConversionBackend>, policy: PollPolicy) -> Self {
        Self { backend, policy }
    }

    /// Poll `task_id` until it resolves
    ///
    /// Fails with [`ConvertError::TaskIdMissing`] or on an invalid policy;
    /// transient poll errors are absorbed and counted against the retry
    /// ceiling. The first status request goes out right away.
    pub async fn poll(
        &self,
        task_id: &TaskId,
        job: &JobContext,
        updater: &dyn JobUpdater,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome> {
        if task_id.is_empty() {
            return Err(ConvertError::TaskIdMissing);
        }
        self.policy.validate()?;

        let mut ticker = poll_ticker(Instant::now(), self.policy.interval());
        let mut attempt: u32 = 0;
        let mut consecutive_errors: u32 = 0;
        let mut backed_off = false;
        let mut probed = false;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(PollOutcome::Cancelled),
                _ = ticker.tick() => {}
            }

            attempt += 1;
            if attempt > self.policy.max_retries {
                tracing::warn!(task_id = %task_id, attempts = attempt - 1, "polling timed out");
                updater.set_status(job.index, TIMED_OUT_STATUS);
                return Ok(PollOutcome::TimedOut);
            }

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(PollOutcome::Cancelled),
                fetched = self.backend.fetch_status(task_id) => fetched,
            };

            let payload = match fetched {
                Ok(payload) => {
                    consecutive_errors = 0;
                    payload
                }
                Err(e) => {
                    consecutive_errors += 1;
                    tracing::warn!(
                        task_id = %task_id,
                        attempt,
                        consecutive_errors,
                        "status poll failed: {}",
                        e
                    );
                    if consecutive_errors > self.policy.error_backoff_threshold && !backed_off {
                        backed_off = true;
                        let slow = self.policy.backoff_interval();
                        tracing::info!(task_id = %task_id, interval_ms = slow.as_millis() as u64, "backing off");
                        ticker = poll_ticker(Instant::now() + slow, slow);
                    }
                    continue;
                }
            };

            tracing::debug!(task_id = %task_id, attempt, status = payload.raw_status(), "status polled");

            if attempt > self.policy.probe_after && payload.lacks_status() && !probed {
                probed = true;
                if self.probe(task_id, cancel).await {
                    if cancel.is_cancelled() {
                        return Ok(PollOutcome::Cancelled);
                    }
                    let result = ConversionResult {
                        file_url: self.backend.result_url(task_id.as_str()),
                        file_name: job.fallback_name.clone(),
                    };
                    updater.set_status(job.index, PROBE_COMPLETED_STATUS);
                    updater.set_progress(job.index, 100);
                    updater.set_result(job.index, result.clone());
                    return Ok(PollOutcome::Completed(result));
                }
            }

            if cancel.is_cancelled() {
                return Ok(PollOutcome::Cancelled);
            }

            if let Some(outcome) = self.apply(task_id, &payload, job, updater) {
                return Ok(outcome);
            }
        }
    }

    async fn probe(&self, task_id: &TaskId, cancel: &CancellationToken) -> bool {
        let probed = tokio::select! {
            biased;
            _ = cancel.cancelled() => return false,
            probed = self.backend.probe_result(task_id) => probed,
        };
        match probed {
            Ok(found) => {
                tracing::debug!(task_id = %task_id, found, "result probe");
                found
            }
            Err(e) => {
                tracing::debug!(task_id = %task_id, "result probe failed: {}", e);
                false
            }
        }
    }

    /// Push one payload through the updater; returns the outcome on a
    /// terminal state.
    fn apply(
        &self,
        task_id: &TaskId,
        payload: &TaskStatusPayload,
        job: &JobContext,
        updater: &dyn JobUpdater,
    ) -> Option<PollOutcome> {
        let state = TaskState::classify(payload);

        let status = match payload.meta_message() {
            Some(message) => message.to_string(),
            None => state.default_message(payload),
        };
        updater.set_status(job.index, &status);

        if let Some(progress) = payload.meta_progress().or_else(|| state.default_progress()) {
            updater.set_progress(job.index, progress);
        }

        match state {
            TaskState::Completed => {
                let file_name = payload
                    .reported_file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| job.fallback_name.clone());
                let file_id = payload.file_id().unwrap_or(task_id.as_str());
                let result = ConversionResult {
                    file_url: self.backend.result_url(file_id),
                    file_name,
                };
                tracing::info!(task_id = %task_id, file = %result.file_name, "conversion completed");
                updater.set_result(job.index, result.clone());
                Some(PollOutcome::Completed(result))
            }
            TaskState::Failed => {
                let message = payload.error_message().to_string();
                tracing::warn!(task_id = %task_id, "conversion failed: {}", message);
                Some(PollOutcome::Failed { message })
            }
            _ => None,
        }
    }
}

/// Interval whose first tick fires at `start`
fn poll_ticker(start: Instant, period: Duration) -> Interval {
    let mut ticker = interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
