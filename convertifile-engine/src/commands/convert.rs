use super::system::validate_path;
use crate::types::{BatchAccepted, ConvertBatchParams, FileSpec};
use crate::{AppState, Error, Result};
use base64::prelude::*;
use chrono::Utc;
use convertifile::{available_formats, BatchJob, ConversionSettings, JobRecord, MediaKind, SourceFile};
use std::path::PathBuf;
use std::sync::Arc;

/// Read a file from disk or decode it from the request
async fn load_source(input: &FileSpec) -> Result<SourceFile> {
    let file = match (&input.path, &input.data_base64) {
        (Some(path), _) => {
            let path = validate_path(path)?;
            let data = tokio::fs::read(&path).await?;
            let name = match input.name.as_deref().filter(|n| !n.is_empty()) {
                Some(name) => name.to_string(),
                None => path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or_else(|| Error::InvalidInput(format!("Not a file: {}", path.display())))?,
            };
            SourceFile::new(name, data)
        }
        (None, Some(encoded)) => {
            let name = input
                .name
                .as_deref()
                .filter(|n| !n.is_empty())
                .ok_or_else(|| Error::InvalidInput("Inline file needs a name".into()))?;
            let data = BASE64_STANDARD.decode(encoded)?;
            SourceFile::new(name, data)
        }
        (None, None) => {
            return Err(Error::InvalidInput(
                "File needs either a path or dataBase64".into(),
            ))
        }
    };

    Ok(match &input.mime {
        Some(mime) => file.with_mime(mime.clone()),
        None => file,
    })
}

async fn prepare_job(kind: MediaKind, input: FileSpec) -> Result<BatchJob> {
    let file = load_source(&input).await?;

    if !available_formats(kind, &file.name).contains(&input.format.as_str()) {
        return Err(Error::InvalidInput(format!(
            "Cannot convert {} to {}",
            file.name, input.format
        )));
    }

    let settings = input
        .settings
        .unwrap_or_else(|| ConversionSettings::defaults(kind));
    if settings.kind() != kind {
        return Err(Error::InvalidInput(format!(
            "Settings for {} do not match a {:?} batch",
            file.name, kind
        )));
    }

    Ok(BatchJob {
        file,
        format: input.format,
        settings,
    })
}

/// Queue every file and start the batch in the background.
///
/// All files are loaded and checked before anything reaches the board, so a
/// bad file rejects the whole request.
pub async fn convert_batch(state: &AppState, params: ConvertBatchParams) -> Result<BatchAccepted> {
    if params.files.is_empty() {
        return Err(Error::InvalidInput("No files to convert".into()));
    }

    let runner = state.get_runner().await?;
    let slot = state
        .try_claim_batch()
        .ok_or_else(|| Error::Busy("A batch is already running".into()))?;

    let mut jobs = Vec::with_capacity(params.files.len());
    for input in params.files {
        jobs.push(prepare_job(params.kind, input).await?);
    }

    state
        .board()
        .load(jobs.iter().map(|j| (j.file.name.clone(), j.format.clone())));

    let accepted = BatchAccepted {
        jobs: jobs.len(),
        started_at: Utc::now(),
    };

    // Registered before returning so an immediate cancel reaches the batch
    let prepared = runner.prepare(jobs);

    let task_state = state.clone();
    let task_runner = Arc::clone(&runner);
    tokio::spawn(async move {
        let report = task_runner.run_prepared(prepared).await;
        log::info!(
            "Batch {} finished: {} of {} converted",
            report.batch_id,
            report.completed(),
            report.total()
        );
        task_state.set_last_report(report).await;
        drop(slot);
    });

    Ok(accepted)
}

pub fn get_jobs(state: &AppState) -> Vec<JobRecord> {
    state.board().snapshot().as_ref().clone()
}

pub async fn cancel_job(state: &AppState, index: usize) -> Result<()> {
    let runner = state.get_runner().await?;
    if runner.cancel_job(index) {
        Ok(())
    } else {
        Err(Error::NotFound(format!("No running job {}", index)))
    }
}

/// True when a batch was running
pub async fn cancel_batch(state: &AppState) -> Result<bool> {
    let runner = state.get_runner().await?;
    Ok(runner.cancel_all())
}

pub async fn reset(state: &AppState) -> Result<()> {
    let _slot = state
        .try_claim_batch()
        .ok_or_else(|| Error::Busy("Cancel the running batch before resetting".into()))?;
    state.board().reset();
    Ok(())
}

/// Save the result of a completed job into `dir`, or the configured
/// download directory
pub async fn download_result(state: &AppState, index: usize, dir: Option<String>) -> Result<PathBuf> {
    let job = state
        .board()
        .get(index)
        .ok_or_else(|| Error::NotFound(format!("No job {}", index)))?;
    let result = job
        .result
        .ok_or_else(|| Error::NotFound(format!("Job {} has no result yet", index)))?;

    let dest = match dir.filter(|d| !d.is_empty()) {
        Some(dir) => {
            if dir.contains("://") {
                return Err(Error::InvalidInput(
                    "URL schemes are not allowed in file paths".into(),
                ));
            }
            PathBuf::from(dir)
        }
        None => state.get_config().await?.download_dir,
    };

    let client = state.get_client().await?;
    let saved = client.download_result(&result, &dest).await?;
    log::info!("Saved job {} to {}", index, saved.display());
    Ok(saved)
}
