//! Convertifile client library
//!
//! Submits files to the Convertifile conversion backend as multipart jobs,
//! polls the status endpoint until each job resolves, and exposes the
//! per-job state a UI renders.
//!
//! ```no_run
//! use convertifile::{
//!     BatchJob, BatchRunner, ClientConfig, ConversionSettings, ConvertClient, JobBoard,
//!     MediaKind, Poller, SourceFile,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> convertifile::Result<()> {
//! let config = ClientConfig::from_env()?;
//! let client = Arc::new(ConvertClient::new(&config)?);
//! let board = Arc::new(JobBoard::new());
//! let runner = BatchRunner::new(
//!     client.clone(),
//!     Poller::new(client.clone(), config.poll.clone()),
//!     board.clone(),
//!     config.inter_job_delay_duration(),
//! );
//!
//! # let data: Vec<u8> = Vec::new();
//! let file = SourceFile::new("photo.heic", data).with_mime("image/heic");
//! board.load([(file.name.clone(), "jpg")]);
//! let report = runner
//!     .run(vec![BatchJob {
//!         file,
//!         format: "jpg".into(),
//!         settings: ConversionSettings::defaults(MediaKind::Image),
//!     }])
//!     .await;
//! println!("{} of {} converted", report.completed(), report.total());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod board;
pub mod client;
pub mod config;
pub mod error;
pub mod form;
pub mod health;
pub mod intake;
pub mod poller;
pub mod settings;
pub mod types;

#[cfg(test)]
mod testing;

pub use batch::{BatchJob, BatchReport, BatchRunner, JobOutcome, PreparedBatch};
pub use board::JobBoard;
pub use client::{ConversionBackend, ConvertClient};
pub use config::{ClientConfig, Deployment, HttpConfig, PollPolicy};
pub use error::{ConvertError, NetworkErrorKind, Result};
pub use form::{FormPayload, FormValue};
pub use health::{spawn_health_monitor, ServerStatus};
pub use intake::{admit, available_formats, Admission, FileInfo, Notification, NotificationLevel};
pub use poller::{JobContext, JobUpdater, PollOutcome, Poller};
pub use settings::{encode_request, ConversionSettings, EncodeRequest, MediaKind};
pub use types::{
    ConversionResult, JobEvent, JobRecord, SourceFile, TaskId, TaskState, TaskStatusPayload,
};

pub use tokio_util::sync::CancellationToken;
