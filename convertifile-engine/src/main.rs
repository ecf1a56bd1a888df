use convertifile::ClientConfig;
use convertifile_engine::rpc_server;
use convertifile_engine::AppState;
use tokio::sync::broadcast;

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let (event_tx, event_rx) = broadcast::channel(256);

    let state = AppState::new();
    if let Err(e) = state.initialize(config, event_tx).await {
        log::error!("Failed to initialize engine: {}", e);
        eprintln!("Failed to initialize: {}", e);
        std::process::exit(1);
    }

    log::info!("convertifile-engine started, waiting for RPC commands on stdin");

    rpc_server::run_rpc_server(state, event_rx).await;
}
