//! Sequential batch runner
//!
//! Jobs of a batch run strictly one after another: job `i + 1` is submitted
//! only after job `i` resolved and the inter-job delay elapsed. Every
//! per-job error is caught here and rendered as `"Error: {message}"`; it
//! never stops the remaining jobs.

use crate::client::ConversionBackend;
use crate::error::ConvertError;
use crate::poller::{JobContext, JobUpdater, PollOutcome, Poller};
use crate::settings::ConversionSettings;
use crate::types::{ConversionResult, SourceFile};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// One file of a batch with its target format and settings snapshot
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub file: SourceFile,
    pub format: String,
    pub settings: ConversionSettings,
}

/// Final outcome of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum JobOutcome {
    Completed { result: ConversionResult },
    Failed { message: String },
    TimedOut,
    Errored { message: String, retryable: bool },
    Cancelled,
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed { .. })
    }
}

/// Outcomes of a whole batch, in job order
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub outcomes: Vec<JobOutcome>,
}

impl BatchReport {
    pub fn completed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_completed()).count()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

/// Cancellation handles of the running batch
struct ActiveBatch {
    id: Uuid,
    batch: CancellationToken,
    jobs: Vec<CancellationToken>,
}

/// A batch whose cancellation handles are already registered
///
/// The batch counts as running from [`BatchRunner::prepare`] until this
/// value is dropped, so cancels sent before the run starts are kept.
pub struct PreparedBatch {
    id: Uuid,
    jobs: Vec<BatchJob>,
    batch: CancellationToken,
    tokens: Vec<CancellationToken>,
    active: Arc<Mutex<Option<ActiveBatch>>>,
}

impl PreparedBatch {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl Drop for PreparedBatch {
    fn drop(&mut self) {
        let mut active = self.active.lock();
        if active.as_ref().map(|a| a.id) == Some(self.id) {
            *active = None;
        }
    }
}

pub struct BatchRunner {
    backend: Arc<dyn ConversionBackend>,
    poller: Poller,
    updater: Arc<dyn JobUpdater>,
    inter_job_delay: Duration,
    active: Arc<Mutex<Option<ActiveBatch>>>,
    shutdown: CancellationToken,
}

impl BatchRunner {
    pub fn new(
        backend: Arc<dyn ConversionBackend>,
        poller: Poller,
        updater: Arc<dyn JobUpdater>,
        inter_job_delay: Duration,
    ) -> Self {
        Self {
            backend,
            poller,
            updater,
            inter_job_delay,
            active: Arc::new(Mutex::new(None)),
            shutdown: CancellationToken::new(),
        }
    }

    /// Register a batch so it can be cancelled before [`run_prepared`]
    /// picks it up
    ///
    /// [`run_prepared`]: BatchRunner::run_prepared
    pub fn prepare(&self, jobs: Vec<BatchJob>) -> PreparedBatch {
        let id = Uuid::new_v4();
        let batch = self.shutdown.child_token();
        let tokens: Vec<CancellationToken> = jobs.iter().map(|_| batch.child_token()).collect();
        *self.active.lock() = Some(ActiveBatch {
            id,
            batch: batch.clone(),
            jobs: tokens.clone(),
        });

        PreparedBatch {
            id,
            jobs,
            batch,
            tokens,
            active: Arc::clone(&self.active),
        }
    }

    /// Run every job in order and report how each ended
    pub async fn run(&self, jobs: Vec<BatchJob>) -> BatchReport {
        let prepared = self.prepare(jobs);
        self.run_prepared(prepared).await
    }

    pub async fn run_prepared(&self, prepared: PreparedBatch) -> BatchReport {
        let jobs = &prepared.jobs;
        let batch = &prepared.batch;

        let mut report = BatchReport {
            batch_id: prepared.id,
            outcomes: Vec::with_capacity(jobs.len()),
        };
        tracing::info!(batch_id = %report.batch_id, jobs = jobs.len(), "batch started");

        for (index, (job, token)) in jobs.iter().zip(&prepared.tokens).enumerate() {
            if batch.is_cancelled() {
                report.outcomes.push(JobOutcome::Cancelled);
                continue;
            }

            let outcome = self.run_job(index, job, token).await;
            tracing::debug!(index, ?outcome, "job resolved");
            report.outcomes.push(outcome);

            if index + 1 < jobs.len() {
                tokio::select! {
                    _ = batch.cancelled() => {}
                    _ = tokio::time::sleep(self.inter_job_delay) => {}
                }
            }
        }

        drop(prepared);
        tracing::info!(
            batch_id = %report.batch_id,
            completed = report.completed(),
            total = report.total(),
            "batch finished"
        );
        self.updater.batch_finished(report.total());
        report
    }

    async fn run_job(&self, index: usize, job: &BatchJob, cancel: &CancellationToken) -> JobOutcome {
        if cancel.is_cancelled() {
            return JobOutcome::Cancelled;
        }

        self.updater.set_status(index, "Starting conversion");
        let form = job.settings.encode(&job.file, &job.format);

        self.updater.set_status(index, "Sending to server");
        let submitted = tokio::select! {
            biased;
            _ = cancel.cancelled() => return JobOutcome::Cancelled,
            submitted = self.backend.submit(form) => submitted,
        };

        let task_id = match submitted {
            Ok(task_id) => task_id,
            Err(e) => return self.errored(index, e),
        };

        let context = JobContext::new(index, &job.file, &job.format);
        match self
            .poller
            .poll(&task_id, &context, self.updater.as_ref(), cancel)
            .await
        {
            Ok(PollOutcome::Completed(result)) => JobOutcome::Completed { result },
            Ok(PollOutcome::Failed { message }) => JobOutcome::Failed { message },
            Ok(PollOutcome::TimedOut) => JobOutcome::TimedOut,
            Ok(PollOutcome::Cancelled) => JobOutcome::Cancelled,
            Err(e) => self.errored(index, e),
        }
    }

    fn errored(&self, index: usize, e: ConvertError) -> JobOutcome {
        tracing::error!(index, "conversion error: {}", e);
        let message = e.to_string();
        self.updater.set_status(index, &format!("Error: {}", message));
        JobOutcome::Errored {
            message,
            retryable: e.is_retryable(),
        }
    }

    /// Stop one job of the running batch; it reports nothing further
    pub fn cancel_job(&self, index: usize) -> bool {
        let active = self.active.lock();
        match active.as_ref().and_then(|a| a.jobs.get(index)) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Stop the running batch, including jobs not started yet
    pub fn cancel_all(&self) -> bool {
        match self.active.lock().as_ref() {
            Some(active) => {
                active.batch.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Cancel the running batch and refuse later ones
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for BatchRunner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollPolicy;
    use crate::settings::MediaKind;
    use crate::testing::{
        Call, RecordingUpdater, ScriptedBackend, Step, Submission, Update,
    };
    use serde_json::json;
    use tokio::time::Instant;

    const BASE: &str = "http://backend.test/convertifileapp";

    fn image_job(name: &str, format: &str) -> BatchJob {
        BatchJob {
            file: SourceFile::new(name, vec![0u8; 16]).with_mime("image/png"),
            format: format.to_string(),
            settings: ConversionSettings::defaults(MediaKind::Image),
        }
    }

    fn runner(backend: &Arc<ScriptedBackend>, updater: &Arc<RecordingUpdater>) -> BatchRunner {
        BatchRunner::new(
            backend.clone(),
            Poller::new(backend.clone(), PollPolicy::default()),
            updater.clone(),
            Duration::from_millis(300),
        )
    }

    fn done(file_id: &str) -> Step {
        Step::Status(json!({"status": "completed", "file_id": file_id}))
    }

    #[tokio::test(start_paused = true)]
    async fn test_jobs_run_strictly_in_order() {
        let backend = Arc::new(
            ScriptedBackend::new(BASE)
                .task("t1", vec![Step::Status(json!({"status": "pending"})), done("r1")])
                .task("t2", vec![done("r2")])
                .task("t3", vec![done("r3")]),
        );
        let updater = Arc::new(RecordingUpdater::default());
        let start = Instant::now();

        let report = runner(&backend, &updater)
            .run(vec![
                image_job("a.png", "jpg"),
                image_job("b.png", "webp"),
                image_job("c.png", "bmp"),
            ])
            .await;

        assert_eq!(report.completed(), 3);
        let calls: Vec<(u64, Call)> = backend
            .calls()
            .into_iter()
            .map(|(at, call)| ((at - start).as_millis() as u64, call))
            .collect();
        assert_eq!(
            calls,
            vec![
                (0, Call::Submit("jpg".into())),
                (0, Call::Status("t1".into())),
                (500, Call::Status("t1".into())),
                (800, Call::Submit("webp".into())),
                (800, Call::Status("t2".into())),
                (1100, Call::Submit("bmp".into())),
                (1100, Call::Status("t3".into())),
            ]
        );
        assert_eq!(updater.updates().last(), Some(&Update::Finished(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_flow_of_one_job() {
        let backend = Arc::new(ScriptedBackend::new(BASE).task("t1", vec![done("r1")]));
        let updater = Arc::new(RecordingUpdater::default());

        runner(&backend, &updater)
            .run(vec![image_job("a.png", "jpg")])
            .await;

        assert_eq!(
            updater.statuses(0),
            vec!["Starting conversion", "Sending to server", "Completed!"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_submission_errors_do_not_stop_batch() {
        let backend = Arc::new(
            ScriptedBackend::new(BASE)
                .reject_next(Submission::Server(503, "Service Unavailable"))
                .reject_next(Submission::MissingTaskId)
                .task("t3", vec![done("r3")]),
        );
        let updater = Arc::new(RecordingUpdater::default());

        let report = runner(&backend, &updater)
            .run(vec![
                image_job("a.png", "jpg"),
                image_job("b.png", "jpg"),
                image_job("c.png", "jpg"),
            ])
            .await;

        assert_eq!(
            report.outcomes[0],
            JobOutcome::Errored {
                message: "Server error: 503 Service Unavailable".into(),
                retryable: false,
            }
        );
        assert_eq!(
            updater.last_status(0).as_deref(),
            Some("Error: Server error: 503 Service Unavailable")
        );
        assert_eq!(
            updater.last_status(1).as_deref(),
            Some("Error: No task ID returned from server")
        );
        assert!(report.outcomes[2].is_completed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_job_stops_only_that_job() {
        let backend = Arc::new(
            ScriptedBackend::new(BASE)
                .task("t1", vec![Step::Status(json!({"status": "processing"}))])
                .task("t2", vec![done("r2")]),
        );
        let updater = Arc::new(RecordingUpdater::default());
        let runner = Arc::new(runner(&backend, &updater));

        let handle = {
            let runner = runner.clone();
            tokio::spawn(async move {
                runner
                    .run(vec![image_job("a.png", "jpg"), image_job("b.png", "png")])
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(runner.cancel_job(0));
        let report = handle.await.unwrap();

        assert_eq!(report.outcomes[0], JobOutcome::Cancelled);
        assert!(report.outcomes[1].is_completed());
        assert_eq!(updater.last_status(0).as_deref(), Some("Processing..."));
        assert!(!runner.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_skips_remaining_jobs() {
        let backend = Arc::new(
            ScriptedBackend::new(BASE)
                .task("t1", vec![Step::Status(json!({"status": "pending"}))])
                .task("t2", vec![done("r2")]),
        );
        let updater = Arc::new(RecordingUpdater::default());
        let runner = Arc::new(runner(&backend, &updater));

        let handle = {
            let runner = runner.clone();
            tokio::spawn(async move {
                runner
                    .run(vec![image_job("a.png", "jpg"), image_job("b.png", "png")])
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert!(runner.cancel_all());
        let report = handle.await.unwrap();

        assert_eq!(report.outcomes, vec![JobOutcome::Cancelled, JobOutcome::Cancelled]);
        assert!(updater.statuses(1).is_empty());
        assert_eq!(backend.status_calls("t2"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_run_starts_is_kept() {
        let backend = Arc::new(
            ScriptedBackend::new(BASE)
                .task("t1", vec![done("r1")])
                .task("t2", vec![done("r2")]),
        );
        let updater = Arc::new(RecordingUpdater::default());
        let runner = runner(&backend, &updater);

        let prepared = runner.prepare(vec![image_job("a.png", "jpg"), image_job("b.png", "png")]);
        assert!(runner.is_running());
        assert!(runner.cancel_job(0));
        let report = runner.run_prepared(prepared).await;

        assert_eq!(report.outcomes[0], JobOutcome::Cancelled);
        assert!(report.outcomes[1].is_completed());
        assert!(updater.statuses(0).is_empty());
        assert_eq!(backend.calls()[0].1, Call::Submit("png".into()));

        let prepared = runner.prepare(vec![image_job("c.png", "jpg")]);
        assert!(runner.cancel_all());
        let report = runner.run_prepared(prepared).await;
        assert_eq!(report.outcomes, vec![JobOutcome::Cancelled]);
        assert!(!runner.is_running());
    }

    #[tokio::test]
    async fn test_dropped_batch_is_no_longer_running() {
        let backend = Arc::new(ScriptedBackend::new(BASE));
        let updater = Arc::new(RecordingUpdater::default());
        let runner = runner(&backend, &updater);

        let prepared = runner.prepare(vec![image_job("a.png", "jpg")]);
        assert_eq!(prepared.len(), 1);
        assert!(runner.is_running());
        drop(prepared);
        assert!(!runner.is_running());
        assert!(!runner.cancel_all());
    }

    #[tokio::test]
    async fn test_cancel_without_batch() {
        let backend = Arc::new(ScriptedBackend::new(BASE));
        let updater = Arc::new(RecordingUpdater::default());
        let runner = runner(&backend, &updater);
        assert!(!runner.cancel_job(0));
        assert!(!runner.cancel_all());
    }
}
