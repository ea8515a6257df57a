//! At most one auto-grade batch per process, run on a spawned task over the
//! pending snapshot captured when it was started.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::Submission;
use crate::services::auto_grade::{AutoGrader, BatchProgress, BatchResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RunningBatch {
    pub(crate) batch_id: Uuid,
    pub(crate) current: usize,
    pub(crate) total: usize,
    pub(crate) current_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) started_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub(crate) enum BatchState {
    #[default]
    Idle,
    Running(RunningBatch),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CompletedBatch {
    pub(crate) batch_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) finished_at: OffsetDateTime,
    pub(crate) result: BatchResult,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BatchSnapshot {
    pub(crate) state: BatchState,
    pub(crate) last_result: Option<CompletedBatch>,
}

#[derive(Debug, Error)]
#[error("batch {batch_id} is already running ({current}/{total})")]
pub(crate) struct BatchAlreadyRunning {
    pub(crate) batch_id: Uuid,
    pub(crate) current: usize,
    pub(crate) total: usize,
}

pub(crate) struct BatchStarted {
    pub(crate) batch_id: Uuid,
    pub(crate) total: usize,
    pub(crate) handle: JoinHandle<BatchResult>,
}

#[derive(Clone, Default)]
pub(crate) struct BatchTracker {
    inner: Arc<Mutex<BatchSnapshot>>,
}

impl BatchTracker {
    pub(crate) fn snapshot(&self) -> BatchSnapshot {
        self.lock().clone()
    }

    pub(crate) fn start(
        &self,
        grader: AutoGrader,
        pending: Vec<Submission>,
    ) -> Result<BatchStarted, BatchAlreadyRunning> {
        let batch_id = Uuid::new_v4();
        let total = pending.len();

        {
            let mut snapshot = self.lock();
            if let BatchState::Running(running) = &snapshot.state {
                return Err(BatchAlreadyRunning {
                    batch_id: running.batch_id,
                    current: running.current,
                    total: running.total,
                });
            }
            snapshot.state = BatchState::Running(RunningBatch {
                batch_id,
                current: 0,
                total,
                current_name: String::new(),
                started_at: OffsetDateTime::now_utc(),
            });
        }

        tracing::info!(%batch_id, total, "Batch queued");

        let tracker = self.clone();
        let handle = tokio::spawn(async move {
            let guard = RunGuard { tracker: tracker.clone(), batch_id, finished: false };
            let progress_tracker = tracker.clone();
            let result = grader
                .score_batch(pending, move |progress| progress_tracker.record_progress(batch_id, progress))
                .await;
            guard.finish(result.clone());
            result
        });

        Ok(BatchStarted { batch_id, total, handle })
    }

    fn record_progress(&self, batch_id: Uuid, progress: BatchProgress) {
        let mut snapshot = self.lock();
        if let BatchState::Running(running) = &mut snapshot.state {
            if running.batch_id == batch_id {
                running.current = progress.current;
                running.total = progress.total;
                running.current_name = progress.current_name;
            }
        }
    }

    fn finish(&self, batch_id: Uuid, result: BatchResult) {
        metrics::counter!("batch_runs_total").increment(1);
        let mut snapshot = self.lock();
        snapshot.state = BatchState::Idle;
        snapshot.last_result =
            Some(CompletedBatch { batch_id, finished_at: OffsetDateTime::now_utc(), result });
    }

    fn abandon(&self, batch_id: Uuid) {
        let mut snapshot = self.lock();
        if matches!(&snapshot.state, BatchState::Running(running) if running.batch_id == batch_id) {
            snapshot.state = BatchState::Idle;
        }
    }

    fn lock(&self) -> MutexGuard<'_, BatchSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns the tracker to idle if the batch task unwinds before finishing.
struct RunGuard {
    tracker: BatchTracker,
    batch_id: Uuid,
    finished: bool,
}

impl RunGuard {
    fn finish(mut self, result: BatchResult) {
        self.finished = true;
        self.tracker.finish(self.batch_id, result);
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.finished {
            tracing::error!(batch_id = %self.batch_id, "Batch task aborted; tracker reset to idle");
            self.tracker.abandon(self.batch_id);
        }
    }
}
