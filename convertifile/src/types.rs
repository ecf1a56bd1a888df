//! Core types for the conversion client
//!
//! Wire entities received from the backend, the task handle, and the
//! per-job records the UI layer renders.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque backend-assigned identifier of one conversion task
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of a successful submission
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    pub celery_id: Option<String>,
}

/// Explicit narration attached to a status payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskMeta {
    #[serde(default, deserialize_with = "lenient_number")]
    pub progress: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub filename: Option<String>,
}

/// One response of the status endpoint
///
/// Every field is optional; fields of an unexpected JSON type are treated
/// as absent rather than failing the whole poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub original_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub file_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub traceback: Option<String>,
    #[serde(default, deserialize_with = "lenient_meta")]
    pub meta: Option<TaskMeta>,
}

impl TaskStatusPayload {
    /// Raw status value: `status` wins over `state`
    pub fn raw_status(&self) -> &str {
        non_empty(&self.status)
            .or_else(|| non_empty(&self.state))
            .unwrap_or("")
    }

    /// Whether the payload carries no `status` field at all
    pub fn lacks_status(&self) -> bool {
        non_empty(&self.status).is_none()
    }

    pub fn meta_message(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|m| non_empty(&m.message))
    }

    pub fn meta_progress(&self) -> Option<u8> {
        self.meta
            .as_ref()
            .and_then(|m| m.progress)
            .map(clamp_progress)
    }

    /// Error text of a failed task, most specific source first
    pub fn error_message(&self) -> &str {
        self.meta_message()
            .or_else(|| non_empty(&self.error))
            .or_else(|| non_empty(&self.traceback))
            .unwrap_or("Unknown error")
    }

    /// File name reported by the backend, if any
    pub fn reported_file_name(&self) -> Option<&str> {
        non_empty(&self.filename).or_else(|| non_empty(&self.original_name))
    }

    pub fn file_id(&self) -> Option<&str> {
        non_empty(&self.file_id)
    }
}

/// Flat classification of a status payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Processing,
    Started,
    Completed,
    Failed,
    /// Anything else; holds the lower-cased raw value (may be empty)
    Unknown(String),
}

impl TaskState {
    pub fn classify(payload: &TaskStatusPayload) -> Self {
        let raw = payload.raw_status().to_lowercase();
        match raw.as_str() {
            "pending" => TaskState::Pending,
            "processing" => TaskState::Processing,
            "started" => TaskState::Started,
            "completed" => TaskState::Completed,
            "failed" => TaskState::Failed,
            _ => TaskState::Unknown(raw),
        }
    }

    /// Status line shown when the backend sent no `meta.message`
    pub fn default_message(&self, payload: &TaskStatusPayload) -> String {
        match self {
            TaskState::Pending => "In queue...".to_string(),
            TaskState::Processing => "Processing...".to_string(),
            TaskState::Started => "Started processing...".to_string(),
            TaskState::Completed => "Completed!".to_string(),
            TaskState::Failed => format!("Failed: {}", payload.error_message()),
            TaskState::Unknown(raw) if raw.is_empty() => "Unknown status".to_string(),
            TaskState::Unknown(raw) => format!("Status: {}", raw),
        }
    }

    /// Progress shown when the backend sent no `meta.progress`
    pub fn default_progress(&self) -> Option<u8> {
        match self {
            TaskState::Pending => Some(10),
            TaskState::Processing => Some(50),
            TaskState::Started => Some(20),
            TaskState::Completed => Some(100),
            TaskState::Failed | TaskState::Unknown(_) => None,
        }
    }
}

/// Download descriptor of a finished conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub file_url: String,
    pub file_name: String,
}

/// A file selected for conversion
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub data: Bytes,
    pub mime: Option<String>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Name up to the first dot, as the backend names its output
    pub fn base_name(&self) -> &str {
        self.name.split('.').next().unwrap_or("")
    }

    /// Lower-cased extension after the last dot
    pub fn extension(&self) -> Option<String> {
        file_extension(&self.name)
    }

    /// Output name used when the backend does not report one
    pub fn derived_output_name(&self, format: &str) -> String {
        format!("{}.{}", self.base_name(), format)
    }
}

/// Observable state of one job of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub index: usize,
    pub file_name: String,
    pub target_format: String,
    pub status: String,
    pub progress: u8,
    pub result: Option<ConversionResult>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn queued(index: usize, file_name: impl Into<String>, target_format: impl Into<String>) -> Self {
        Self {
            index,
            file_name: file_name.into(),
            target_format: target_format.into(),
            status: "In queue...".to_string(),
            progress: 0,
            result: None,
            updated_at: Utc::now(),
        }
    }
}

/// Events emitted by the job board
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum JobEvent {
    Status { index: usize, status: String },
    Progress { index: usize, progress: u8 },
    Result { index: usize, result: ConversionResult },
    BatchFinished { total: usize },
}

impl JobEvent {
    /// Event name used on the engine's event stream
    pub fn name(&self) -> &'static str {
        match self {
            JobEvent::Status { .. } => "job:status",
            JobEvent::Progress { .. } => "job:progress",
            JobEvent::Result { .. } => "job:result",
            JobEvent::BatchFinished { .. } => "batch:finished",
        }
    }
}

/// Lower-cased extension after the last dot of a file name
pub fn file_extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

pub(crate) fn clamp_progress(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    }))
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()))
}

fn lenient_meta<'de, D>(deserializer: D) -> Result<Option<TaskMeta>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .filter(serde_json::Value::is_object)
        .and_then(|v| serde_json::from_value(v).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> TaskStatusPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_status_takes_precedence_over_state() {
        let p = payload(json!({"status": "PENDING", "state": "completed"}));
        assert_eq!(TaskState::classify(&p), TaskState::Pending);

        let p = payload(json!({"state": "Started"}));
        assert_eq!(TaskState::classify(&p), TaskState::Started);
        assert!(p.lacks_status());
    }

    #[test]
    fn test_unknown_status_messages() {
        let p = payload(json!({"status": "RETRY"}));
        let state = TaskState::classify(&p);
        assert_eq!(state, TaskState::Unknown("retry".into()));
        assert_eq!(state.default_message(&p), "Status: retry");
        assert_eq!(state.default_progress(), None);

        let empty = payload(json!({}));
        assert_eq!(TaskState::classify(&empty).default_message(&empty), "Unknown status");
    }

    #[test]
    fn test_error_message_preference() {
        let p = payload(json!({"status": "failed", "error": "bad codec", "traceback": "tb"}));
        assert_eq!(p.error_message(), "bad codec");

        let p = payload(json!({"status": "failed", "traceback": "tb"}));
        assert_eq!(p.error_message(), "tb");

        let p = payload(json!({"status": "failed", "error": "x", "meta": {"message": "Decoder crashed"}}));
        assert_eq!(p.error_message(), "Decoder crashed");

        let p = payload(json!({"status": "failed"}));
        assert_eq!(TaskState::Failed.default_message(&p), "Failed: Unknown error");
    }

    #[test]
    fn test_lenient_fields() {
        let p = payload(json!({"status": 3, "meta": {"progress": "half", "message": null}}));
        assert_eq!(p.status, None);
        assert_eq!(p.meta_progress(), None);
        assert_eq!(p.meta_message(), None);

        let p = payload(json!({"meta": {"progress": 142.7}}));
        assert_eq!(p.meta_progress(), Some(100));
    }

    #[test]
    fn test_non_object_meta_is_absent() {
        for meta in [json!("done"), json!(42), json!([1, 2]), json!(true)] {
            let p = payload(json!({"status": "completed", "filename": "photo.jpg", "meta": meta}));
            assert_eq!(p.meta, None);
            assert_eq!(TaskState::classify(&p), TaskState::Completed);
            assert_eq!(p.reported_file_name(), Some("photo.jpg"));
        }
    }

    #[test]
    fn test_source_file_names() {
        let file = SourceFile::new("photo.final.HEIC", vec![1u8, 2, 3]);
        assert_eq!(file.base_name(), "photo");
        assert_eq!(file.extension().as_deref(), Some("heic"));
        assert_eq!(file.derived_output_name("jpg"), "photo.jpg");
        assert_eq!(file.size(), 3);
        assert_eq!(file_extension(".bashrc"), None);
        assert_eq!(file_extension("README"), None);
    }

    #[test]
    fn test_submit_response_shape() {
        let r: SubmitResponse = serde_json::from_value(json!({"celery_id": "abc"})).unwrap();
        assert_eq!(r.celery_id.as_deref(), Some("abc"));
        let r: SubmitResponse = serde_json::from_value(json!({"task": "abc"})).unwrap();
        assert!(r.celery_id.is_none());
    }
}
