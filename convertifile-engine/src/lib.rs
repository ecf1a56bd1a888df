pub mod commands;
pub mod error;
pub mod rpc_server;
pub mod state;
pub mod types;

pub use error::{Error, Result};
pub use state::AppState;
pub use types::*;
