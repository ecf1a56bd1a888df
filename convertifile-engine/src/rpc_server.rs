use crate::commands;
use crate::types::{ConvertBatchParams, ValidateFilesParams};
use crate::{AppState, Error};
use convertifile::MediaKind;
use serde_json::Value;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};

fn param_str<'a>(params: &'a Value, key: &str) -> &'a str {
    params.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

fn param_kind(params: &Value) -> crate::Result<MediaKind> {
    let kind = param_str(params, "kind");
    MediaKind::parse(kind).ok_or_else(|| Error::InvalidInput(format!("Unknown media kind: {}", kind)))
}

fn param_index(params: &Value) -> crate::Result<usize> {
    params
        .get("index")
        .and_then(|v| v.as_u64())
        .map(|i| i as usize)
        .ok_or_else(|| Error::InvalidInput("index must be a non-negative integer".into()))
}

pub async fn run_rpc_server(state: AppState, mut event_rx: broadcast::Receiver<Value>) {
    // Create a unified stdout channel to eliminate contention between writers
    let (stdout_tx, mut stdout_rx) = mpsc::unbounded_channel::<String>();

    // Dedicated stdout writer task
    tokio::spawn(async move {
        while let Some(line) = stdout_rx.recv().await {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            let _ = writeln!(handle, "{}", line);
            let _ = handle.flush();
        }
    });

    // Spawn event forwarder: reads events from broadcast channel and sends to stdout channel
    let event_tx = stdout_tx.clone();
    tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event) => {
                    let line = serde_json::to_string(&event).unwrap_or_default();
                    let _ = event_tx.send(line);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    log::warn!("Event receiver lagged by {} messages", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Main RPC loop: read lines from async stdin
    let stdin = tokio::io::stdin();
    let reader = BufReader::new(stdin);
    let mut lines = reader.lines();

    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }

        let request: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                send_error_response(&stdout_tx, None, -32700, &format!("Parse error: {}", e));
                continue;
            }
        };

        let id = request.get("id").cloned();
        let method = request
            .get("method")
            .and_then(|m| m.as_str())
            .unwrap_or("")
            .to_string();
        let params = request.get("params").cloned().unwrap_or(Value::Null);

        // Spawn each request handler as a separate task for concurrent processing
        let req_state = state.clone();
        let req_tx = stdout_tx.clone();
        tokio::spawn(async move {
            let result = handle_method(&req_state, &method, params).await;
            match result {
                Ok(value) => send_success_response(&req_tx, id, value),
                Err(e) => send_error_response(&req_tx, id, e.code(), &e.to_string()),
            }
        });
    }

    log::info!("stdin closed, shutting down");
    if let Err(e) = state.shutdown().await {
        log::error!("Shutdown failed: {}", e);
    }
}

pub(crate) async fn handle_method(
    state: &AppState,
    method: &str,
    params: Value,
) -> crate::Result<Value> {
    match method {
        // Conversion commands
        "convert_batch" => {
            let params: ConvertBatchParams = serde_json::from_value(params)?;
            let accepted = commands::convert_batch(state, params).await?;
            Ok(serde_json::to_value(accepted)?)
        }
        "get_jobs" => Ok(serde_json::to_value(commands::get_jobs(state))?),
        "cancel_job" => {
            let index = param_index(&params)?;
            commands::cancel_job(state, index).await?;
            Ok(Value::Null)
        }
        "cancel_batch" => {
            let cancelled = commands::cancel_batch(state).await?;
            Ok(Value::Bool(cancelled))
        }
        "reset" => {
            commands::reset(state).await?;
            Ok(Value::Null)
        }
        "download_result" => {
            let index = param_index(&params)?;
            let dir = params.get("dir").and_then(|v| v.as_str()).map(str::to_string);
            let saved = commands::download_result(state, index, dir).await?;
            Ok(Value::String(saved.to_string_lossy().into_owned()))
        }
        "get_last_report" => Ok(serde_json::to_value(state.last_report().await)?),

        // Settings commands
        "default_settings" => {
            let kind = param_kind(&params)?;
            Ok(serde_json::to_value(commands::default_settings(kind))?)
        }
        "available_formats" => {
            let kind = param_kind(&params)?;
            let file_name = params
                .get("fileName")
                .or(params.get("file_name"))
                .and_then(|v| v.as_str())
                .unwrap_or("");
            Ok(serde_json::to_value(commands::available_formats(kind, file_name))?)
        }
        "validate_files" => {
            let params: ValidateFilesParams = serde_json::from_value(params)?;
            Ok(serde_json::to_value(commands::validate_files(params))?)
        }

        // System commands
        "get_config" => Ok(serde_json::to_value(commands::get_config(state).await?)?),
        "server_status" => Ok(serde_json::to_value(commands::server_status(state).await?)?),
        "get_engine_version" => Ok(serde_json::to_value(commands::get_engine_version())?),

        _ => {
            Err(crate::Error::InvalidInput(format!("Unknown method: {}", method)))
        }
    }
}

fn send_success_response(tx: &mpsc::UnboundedSender<String>, id: Option<Value>, result: Value) {
    let response = serde_json::json!({
        "id": id,
        "result": result,
    });
    let line = serde_json::to_string(&response).unwrap_or_default();
    let _ = tx.send(line);
}

fn send_error_response(tx: &mpsc::UnboundedSender<String>, id: Option<Value>, code: i32, message: &str) {
    let response = serde_json::json!({
        "id": id,
        "error": {
            "code": code,
            "message": message,
        },
    });
    let line = serde_json::to_string(&response).unwrap_or_default();
    let _ = tx.send(line);
}
