//! Types module - request and response shapes of the RPC surface
//!
//! These types define the API contract between the engine and the front end.

use chrono::{DateTime, Utc};
use convertifile::{ConversionSettings, FileInfo, MediaKind, ServerStatus};
use serde::{Deserialize, Serialize};

/// One file of a `convert_batch` request.
///
/// Either `path` points at a local file, or `name` and `data_base64` carry
/// the file inline.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSpec {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data_base64: Option<String>,
    #[serde(default)]
    pub mime: Option<String>,
    pub format: String,
    /// Per-file settings; the batch kind's defaults when absent
    #[serde(default)]
    pub settings: Option<ConversionSettings>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertBatchParams {
    pub kind: MediaKind,
    pub files: Vec<FileSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateFilesParams {
    pub kind: MediaKind,
    #[serde(default)]
    pub existing: Vec<FileInfo>,
    #[serde(default)]
    pub incoming: Vec<FileInfo>,
}

/// Reply to `convert_batch`; the batch itself keeps running in the background
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAccepted {
    pub jobs: usize,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatusInfo {
    pub status: ServerStatus,
    pub online: bool,
}

impl From<ServerStatus> for ServerStatusInfo {
    fn from(status: ServerStatus) -> Self {
        Self {
            status,
            online: status.is_online(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}
