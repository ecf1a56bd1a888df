//! Backend health monitor

use crate::client::ConvertClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Reachability of the conversion backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    /// `/health` answered with a success status
    Online,
    /// Backend reachable but answered with an error status
    ServerError,
    /// Backend unreachable
    Offline,
}

impl ServerStatus {
    pub fn is_online(self) -> bool {
        self == ServerStatus::Online
    }
}

/// Check the backend now and then every `interval`, sending each status
/// change on `tx` until `cancel` fires or the receiver is dropped.
pub fn spawn_health_monitor(
    client: ConvertClient,
    interval: Duration,
    tx: mpsc::Sender<ServerStatus>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last: Option<ServerStatus> = None;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let status = tokio::select! {
                _ = cancel.cancelled() => break,
                status = client.health() => status,
            };

            if last == Some(status) {
                continue;
            }
            if !status.is_online() {
                tracing::warn!(?status, "conversion backend not healthy");
            }
            last = Some(status);

            if tx.send(status).await.is_err() {
                break;
            }
        }

        tracing::debug!("health monitor stopped");
    })
}
