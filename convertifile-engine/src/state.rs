use crate::{Error, Result};
use convertifile::{
    spawn_health_monitor, BatchReport, BatchRunner, CancellationToken, ClientConfig,
    ConvertClient, JobBoard, Poller, ServerStatus,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex, OwnedMutexGuard, RwLock};
use tokio::task::JoinHandle;

/// Buffered status changes between the health monitor and the forwarder
const HEALTH_CHANNEL_CAPACITY: usize = 8;

#[derive(Clone)]
pub struct AppState {
    config: Arc<RwLock<Option<ClientConfig>>>,
    client: Arc<RwLock<Option<Arc<ConvertClient>>>>,
    runner: Arc<RwLock<Option<Arc<BatchRunner>>>>,
    board: Arc<JobBoard>,
    server_status: Arc<RwLock<Option<ServerStatus>>>,
    last_report: Arc<RwLock<Option<BatchReport>>>,
    batch_slot: Arc<Mutex<()>>,
    handles: Arc<RwLock<Vec<JoinHandle<()>>>>,
    cancel: CancellationToken,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(None)),
            client: Arc::new(RwLock::new(None)),
            runner: Arc::new(RwLock::new(None)),
            board: Arc::new(JobBoard::new()),
            server_status: Arc::new(RwLock::new(None)),
            last_report: Arc::new(RwLock::new(None)),
            batch_slot: Arc::new(Mutex::new(())),
            handles: Arc::new(RwLock::new(Vec::new())),
            cancel: CancellationToken::new(),
        }
    }

    pub async fn initialize(
        &self,
        config: ClientConfig,
        event_tx: broadcast::Sender<Value>,
    ) -> Result<()> {
        let client = Arc::new(ConvertClient::new(&config)?);
        let poller = Poller::new(client.clone(), config.poll.clone());
        let runner = Arc::new(BatchRunner::new(
            client.clone(),
            poller,
            self.board.clone(),
            config.inter_job_delay_duration(),
        ));

        log::info!("Conversion backend at {}", client.base_url());

        *self.client.write().await = Some(client.clone());
        *self.runner.write().await = Some(runner);

        // Board events - writes to broadcast channel
        let mut events = self.board.subscribe();
        let tx = event_tx.clone();
        let board_handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let payload = serde_json::to_value(&event).unwrap_or(Value::Null);
                        let msg = serde_json::json!({
                            "event": event.name(),
                            "data": payload,
                        });
                        let _ = tx.send(msg);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        log::warn!("Job event listener lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        // Server health
        let (status_tx, mut status_rx) = mpsc::channel(HEALTH_CHANNEL_CAPACITY);
        let monitor_handle = spawn_health_monitor(
            ConvertClient::clone(&client),
            config.health_interval(),
            status_tx,
            self.cancel.child_token(),
        );
        let server_status = self.server_status.clone();
        let tx = event_tx;
        let status_handle = tokio::spawn(async move {
            while let Some(status) = status_rx.recv().await {
                *server_status.write().await = Some(status);
                let msg = serde_json::json!({
                    "event": "server:status",
                    "data": crate::types::ServerStatusInfo::from(status),
                });
                let _ = tx.send(msg);
            }
        });

        *self.config.write().await = Some(config);
        self.handles
            .write()
            .await
            .extend([board_handle, monitor_handle, status_handle]);

        Ok(())
    }

    pub async fn get_config(&self) -> Result<ClientConfig> {
        self.config
            .read()
            .await
            .clone()
            .ok_or(Error::EngineNotInitialized)
    }

    pub async fn get_client(&self) -> Result<Arc<ConvertClient>> {
        self.client
            .read()
            .await
            .clone()
            .ok_or(Error::EngineNotInitialized)
    }

    pub async fn get_runner(&self) -> Result<Arc<BatchRunner>> {
        self.runner
            .read()
            .await
            .clone()
            .ok_or(Error::EngineNotInitialized)
    }

    pub fn board(&self) -> &Arc<JobBoard> {
        &self.board
    }

    /// Last status seen by the health monitor, if it has reported yet
    pub async fn server_status(&self) -> Option<ServerStatus> {
        *self.server_status.read().await
    }

    pub async fn set_server_status(&self, status: ServerStatus) {
        *self.server_status.write().await = Some(status);
    }

    pub async fn last_report(&self) -> Option<BatchReport> {
        self.last_report.read().await.clone()
    }

    pub async fn set_last_report(&self, report: BatchReport) {
        *self.last_report.write().await = Some(report);
    }

    /// Held for as long as a batch runs; `None` while one is running
    pub fn try_claim_batch(&self) -> Option<OwnedMutexGuard<()>> {
        self.batch_slot.clone().try_lock_owned().ok()
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.cancel.cancel();

        if let Some(runner) = self.runner.read().await.as_ref() {
            runner.shutdown();
        }

        for handle in self.handles.write().await.drain(..) {
            handle.abort();
        }

        log::info!("Engine shut down");
        Ok(())
    }
}
