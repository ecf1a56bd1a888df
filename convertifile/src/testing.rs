//! In-memory backend and updater used by the unit tests

use crate::client::ConversionBackend;
use crate::error::{ConvertError, NetworkErrorKind, Result};
use crate::form::FormPayload;
use crate::poller::JobUpdater;
use crate::types::{ConversionResult, TaskId, TaskStatusPayload};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tokio::time::Instant;

/// One scripted status response
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Status(serde_json::Value),
    /// Transient transport failure
    Fail,
}

/// How the next submission is answered
#[derive(Debug, Clone)]
pub(crate) enum Submission {
    Accept(String),
    MissingTaskId,
    Server(u16, &'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    /// Submission, with the `convert_to` field
    Submit(String),
    Status(String),
    Probe(String),
}

/// Backend answering from per-task scripts; the last step of a script
/// repeats forever.
pub(crate) struct ScriptedBackend {
    base_url: String,
    submissions: Mutex<VecDeque<Submission>>,
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    probe_found: bool,
    calls: Mutex<Vec<(Instant, Call)>>,
}

impl ScriptedBackend {
    pub(crate) fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            submissions: Mutex::new(VecDeque::new()),
            scripts: Mutex::new(HashMap::new()),
            probe_found: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Accept the next submission as `task_id`, answering polls with `steps`
    pub(crate) fn task(self, task_id: &str, steps: Vec<Step>) -> Self {
        self.submissions
            .lock()
            .push_back(Submission::Accept(task_id.to_string()));
        self.scripts
            .lock()
            .insert(task_id.to_string(), steps.into_iter().collect());
        self
    }

    pub(crate) fn reject_next(self, submission: Submission) -> Self {
        self.submissions.lock().push_back(submission);
        self
    }

    pub(crate) fn probe_found(mut self, found: bool) -> Self {
        self.probe_found = found;
        self
    }

    pub(crate) fn calls(&self) -> Vec<(Instant, Call)> {
        self.calls.lock().clone()
    }

    pub(crate) fn status_calls(&self, task_id: &str) -> usize {
        self.count(|c| matches!(c, Call::Status(id) if id == task_id))
    }

    pub(crate) fn probe_calls(&self, task_id: &str) -> usize {
        self.count(|c| matches!(c, Call::Probe(id) if id == task_id))
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|(_, c)| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push((Instant::now(), call));
    }
}

#[async_trait]
impl ConversionBackend for ScriptedBackend {
    async fn submit(&self, form: FormPayload) -> Result<TaskId> {
        self.record(Call::Submit(form.get("convert_to").unwrap_or_default().to_string()));
        match self.submissions.lock().pop_front() {
            Some(Submission::Accept(id)) => Ok(TaskId::new(id)),
            Some(Submission::MissingTaskId) | None => Err(ConvertError::MissingTaskId),
            Some(Submission::Server(status, text)) => Err(ConvertError::Server {
                status,
                status_text: text.to_string(),
            }),
        }
    }

    async fn fetch_status(&self, task_id: &TaskId) -> Result<TaskStatusPayload> {
        self.record(Call::Status(task_id.to_string()));
        let step = {
            let mut scripts = self.scripts.lock();
            let script = scripts.entry(task_id.to_string()).or_default();
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        };
        match step {
            Some(Step::Status(value)) => Ok(serde_json::from_value(value)?),
            Some(Step::Fail) | None => Err(ConvertError::network(
                NetworkErrorKind::Connect,
                "connection refused",
            )),
        }
    }

    async fn probe_result(&self, task_id: &TaskId) -> Result<bool> {
        self.record(Call::Probe(task_id.to_string()));
        Ok(self.probe_found)
    }

    fn result_url(&self, id: &str) -> String {
        format!("{}/result/{}", self.base_url, id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Update {
    Status(usize, String),
    Progress(usize, u8),
    Result(usize, ConversionResult),
    Finished(usize),
}

/// Updater recording every call in order
#[derive(Default)]
pub(crate) struct RecordingUpdater {
    updates: Mutex<Vec<Update>>,
}

impl RecordingUpdater {
    pub(crate) fn updates(&self) -> Vec<Update> {
        self.updates.lock().clone()
    }

    pub(crate) fn statuses(&self, index: usize) -> Vec<String> {
        self.updates
            .lock()
            .iter()
            .filter_map(|u| match u {
                Update::Status(i, s) if *i == index => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn last_status(&self, index: usize) -> Option<String> {
        self.statuses(index).pop()
    }

    pub(crate) fn progress_values(&self, index: usize) -> Vec<u8> {
        self.updates
            .lock()
            .iter()
            .filter_map(|u| match u {
                Update::Progress(i, p) if *i == index => Some(*p),
                _ => None,
            })
            .collect()
    }
}

impl JobUpdater for RecordingUpdater {
    fn set_status(&self, index: usize, status: &str) {
        self.updates
            .lock()
            .push(Update::Status(index, status.to_string()));
    }

    fn set_progress(&self, index: usize, progress: u8) {
        self.updates.lock().push(Update::Progress(index, progress));
    }

    fn set_result(&self, index: usize, result: ConversionResult) {
        self.updates.lock().push(Update::Result(index, result));
    }

    fn batch_finished(&self, total: usize) {
        self.updates.lock().push(Update::Finished(total));
    }
}
