//! Job board - observable state of the current batch
//!
//! The board owns one [`JobRecord`] per job. Updates never mutate a record
//! in place: each call clones the record list, changes one index and swaps
//! the new list in, so readers holding a snapshot never see a half-applied
//! update. Every applied change is broadcast as a [`JobEvent`].

use crate::poller::JobUpdater;
use crate::types::{ConversionResult, JobEvent, JobRecord};
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Maximum number of events to buffer
const EVENT_CHANNEL_CAPACITY: usize = 1024;

pub struct JobBoard {
    jobs: RwLock<Arc<Vec<JobRecord>>>,
    event_tx: broadcast::Sender<JobEvent>,
}

impl Default for JobBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl JobBoard {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            jobs: RwLock::new(Arc::new(Vec::new())),
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    /// Current records; the returned list never changes
    pub fn snapshot(&self) -> Arc<Vec<JobRecord>> {
        Arc::clone(&self.jobs.read())
    }

    pub fn get(&self, index: usize) -> Option<JobRecord> {
        self.jobs.read().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    /// Replace the board with a fresh batch of queued jobs
    pub fn load<I, N, F>(&self, jobs: I)
    where
        I: IntoIterator<Item = (N, F)>,
        N: Into<String>,
        F: Into<String>,
    {
        let records = jobs
            .into_iter()
            .enumerate()
            .map(|(index, (name, format))| JobRecord::queued(index, name, format))
            .collect();
        *self.jobs.write() = Arc::new(records);
    }

    /// Put every job back to its queued state
    pub fn reset(&self) {
        let mut jobs = self.jobs.write();
        let records = jobs
            .iter()
            .map(|r| JobRecord::queued(r.index, r.file_name.clone(), r.target_format.clone()))
            .collect();
        *jobs = Arc::new(records);
    }

    /// Copy-on-write update of one record; false when `index` is unknown
    fn update(&self, index: usize, apply: impl FnOnce(&mut JobRecord)) -> bool {
        let mut jobs = self.jobs.write();
        if index >= jobs.len() {
            tracing::debug!(index, "update for unknown job ignored");
            return false;
        }
        let mut next = Vec::clone(&jobs);
        apply(&mut next[index]);
        next[index].updated_at = Utc::now();
        *jobs = Arc::new(next);
        true
    }
}

impl JobUpdater for JobBoard {
    fn set_status(&self, index: usize, status: &str) {
        if self.update(index, |r| r.status = status.to_string()) {
            let _ = self.event_tx.send(JobEvent::Status {
                index,
                status: status.to_string(),
            });
        }
    }

    fn set_progress(&self, index: usize, progress: u8) {
        let progress = progress.min(100);
        if self.update(index, |r| r.progress = progress) {
            let _ = self.event_tx.send(JobEvent::Progress { index, progress });
        }
    }

    fn set_result(&self, index: usize, result: ConversionResult) {
        let event = JobEvent::Result {
            index,
            result: result.clone(),
        };
        if self.update(index, |r| r.result = Some(result)) {
            let _ = self.event_tx.send(event);
        }
    }

    fn batch_finished(&self, total: usize) {
        let _ = self.event_tx.send(JobEvent::BatchFinished { total });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> JobBoard {
        let board = JobBoard::new();
        board.load([("a.png", "jpg"), ("b.png", "webp")]);
        board
    }

    #[test]
    fn test_load_queues_jobs() {
        let board = board();
        assert_eq!(board.len(), 2);
        let job = board.get(1).unwrap();
        assert_eq!(job.index, 1);
        assert_eq!(job.file_name, "b.png");
        assert_eq!(job.target_format, "webp");
        assert_eq!(job.status, "In queue...");
        assert_eq!(job.progress, 0);
        assert!(job.result.is_none());
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_updates() {
        let board = board();
        let before = board.snapshot();
        board.set_status(0, "Processing...");
        board.set_progress(0, 50);

        assert_eq!(before[0].status, "In queue...");
        assert_eq!(board.get(0).unwrap().status, "Processing...");
        assert_eq!(board.get(0).unwrap().progress, 50);
        assert_eq!(board.get(1).unwrap().status, "In queue...");
    }

    #[test]
    fn test_unknown_index_is_ignored() {
        let board = board();
        let mut rx = board.subscribe();
        board.set_status(7, "Completed!");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_events_are_broadcast() {
        let board = board();
        let mut rx = board.subscribe();
        let result = ConversionResult {
            file_url: "http://backend/result/x".into(),
            file_name: "a.jpg".into(),
        };

        board.set_status(0, "Completed!");
        board.set_progress(0, 100);
        board.set_result(0, result.clone());
        board.batch_finished(2);

        assert!(matches!(rx.try_recv().unwrap(), JobEvent::Status { index: 0, .. }));
        assert!(matches!(rx.try_recv().unwrap(), JobEvent::Progress { index: 0, progress: 100 }));
        match rx.try_recv().unwrap() {
            JobEvent::Result { index, result: r } => {
                assert_eq!(index, 0);
                assert_eq!(r, result);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(rx.try_recv().unwrap(), JobEvent::BatchFinished { total: 2 }));
    }

    #[test]
    fn test_reset_clears_state() {
        let board = board();
        board.set_status(0, "Completed!");
        board.set_progress(0, 100);
        board.set_result(
            0,
            ConversionResult {
                file_url: "u".into(),
                file_name: "n".into(),
            },
        );

        board.reset();

        let job = board.get(0).unwrap();
        assert_eq!(job.status, "In queue...");
        assert_eq!(job.progress, 0);
        assert!(job.result.is_none());
        assert_eq!(job.file_name, "a.png");
    }
}
