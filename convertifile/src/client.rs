//! HTTP side of the conversion protocol
//!
//! [`ConversionBackend`] is the seam the poller and batch runner talk
//! through; [`ConvertClient`] implements it against the real backend:
//!
//! - `POST {base}/convert` (multipart) returns `{"celery_id": ...}`
//! - `GET {base}/status/{id}` returns a [`TaskStatusPayload`]
//! - `GET`/`HEAD {base}/result/{id}` serve the converted file
//! - `GET {base}/health` answers while the backend is up

use crate::config::ClientConfig;
use crate::error::{ConvertError, NetworkErrorKind, Result};
use crate::form::FormPayload;
use crate::health::ServerStatus;
use crate::types::{ConversionResult, SubmitResponse, TaskId, TaskStatusPayload};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Operations the polling engine needs from a conversion backend
#[async_trait]
pub trait ConversionBackend: Send + Sync {
    /// Submit an encoded job and return the backend's task id
    async fn submit(&self, form: FormPayload) -> Result<TaskId>;

    /// Fetch the current status payload of a task
    async fn fetch_status(&self, task_id: &TaskId) -> Result<TaskStatusPayload>;

    /// Check whether the result of a task is already downloadable
    async fn probe_result(&self, task_id: &TaskId) -> Result<bool>;

    /// Download URL of a result, addressed by file id or task id
    fn result_url(&self, id: &str) -> String;
}

/// Conversion backend client over HTTP
#[derive(Debug, Clone)]
pub struct ConvertClient {
    http: Client,
    base_url: String,
}

impl ConvertClient {
    /// Build a client from a validated configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(config.http.connect_timeout))
            .read_timeout(Duration::from_secs(config.http.read_timeout))
            .redirect(reqwest::redirect::Policy::limited(config.http.max_redirects))
            .user_agent(config.http.user_agent.as_str())
            .danger_accept_invalid_certs(config.http.accept_invalid_certs)
            .build()
            .map_err(|e| {
                ConvertError::network(
                    NetworkErrorKind::Other,
                    format!("Failed to build HTTP client: {}", e),
                )
            })?;

        Ok(Self {
            http,
            base_url: config.trimmed_base_url().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn task_endpoint(&self, route: &str, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, route, urlencoding::encode(id))
    }

    /// Current reachability of the backend
    pub async fn health(&self) -> ServerStatus {
        match self.http.get(self.endpoint("health")).send().await {
            Ok(response) if response.status().is_success() => ServerStatus::Online,
            Ok(response) => {
                tracing::debug!(status = %response.status(), "health check returned error status");
                ServerStatus::ServerError
            }
            Err(e) => {
                tracing::debug!("health check failed: {}", e);
                ServerStatus::Offline
            }
        }
    }

    /// Save a finished result into `dest_dir`, returning the written path
    ///
    /// The body is streamed into `<name>.part` and renamed once complete, so
    /// an interrupted download never leaves a file under the final name.
    pub async fn download_result(
        &self,
        result: &ConversionResult,
        dest_dir: &Path,
    ) -> Result<PathBuf> {
        let file_name = Path::new(&result.file_name)
            .file_name()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                ConvertError::invalid_input("file_name", format!("Not a file name: {}", result.file_name))
            })?
            .to_os_string();

        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| ConvertError::storage(dest_dir, format!("Failed to create directory: {}", e)))?;

        let final_path = dest_dir.join(&file_name);
        let mut part_name = file_name;
        part_name.push(".part");
        let part_path = dest_dir.join(part_name);

        let response = self.http.get(&result.file_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConvertError::network(
                NetworkErrorKind::HttpStatus(status.as_u16()),
                format!("Result download returned: {}", status),
            ));
        }

        if let Err(e) = stream_to_file(response, &part_path).await {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(e);
        }

        tokio::fs::rename(&part_path, &final_path)
            .await
            .map_err(|e| ConvertError::storage(&final_path, format!("Rename failed: {}", e)))?;

        tracing::info!(path = %final_path.display(), "result saved");
        Ok(final_path)
    }
}

async fn stream_to_file(response: reqwest::Response, path: &Path) -> Result<()> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| ConvertError::storage(path, format!("Failed to create file: {}", e)))?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            ConvertError::network(NetworkErrorKind::Other, format!("Download stream error: {}", e))
        })?;
        file.write_all(&chunk)
            .await
            .map_err(|e| ConvertError::storage(path, format!("Write failed: {}", e)))?;
    }

    file.flush()
        .await
        .map_err(|e| ConvertError::storage(path, format!("Flush failed: {}", e)))?;
    Ok(())
}

#[async_trait]
impl ConversionBackend for ConvertClient {
    async fn submit(&self, form: FormPayload) -> Result<TaskId> {
        form.log_contents();
        let multipart = form.into_multipart()?;

        let response = self
            .http
            .post(self.endpoint("convert"))
            .header(ACCEPT, "application/json")
            .multipart(multipart)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = %status, "conversion request rejected");
            return Err(ConvertError::Server {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body: SubmitResponse = response.json().await?;
        let task_id = body
            .celery_id
            .map(TaskId::new)
            .filter(|id| !id.is_empty())
            .ok_or(ConvertError::MissingTaskId)?;

        tracing::debug!(task_id = %task_id, "conversion submitted");
        Ok(task_id)
    }

    async fn fetch_status(&self, task_id: &TaskId) -> Result<TaskStatusPayload> {
        let response = self
            .http
            .get(self.task_endpoint("status", task_id.as_str()))
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConvertError::network(
                NetworkErrorKind::HttpStatus(status.as_u16()),
                format!("Status request returned: {}", status),
            ));
        }

        Ok(response.json().await?)
    }

    async fn probe_result(&self, task_id: &TaskId) -> Result<bool> {
        let response = self
            .http
            .head(self.task_endpoint("result", task_id.as_str()))
            .send()
            .await?;
        Ok(response.status() == StatusCode::OK)
    }

    fn result_url(&self, id: &str) -> String {
        self.task_endpoint("result", id)
    }
}
