use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::repositories::submissions::SubmissionStore;
use crate::services::results::{find_result, ResultQuery, ResultStatus};

/// Re-polls the store for one result until it resolves.
///
/// The poll task stops on its own once the result is graded or gone. Dropping the
/// watch closes its channels, which also stops the task.
pub(crate) struct ResultWatch {
    updates: watch::Receiver<ResultStatus>,
    _shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ResultWatch {
    pub(crate) fn spawn(
        store: Arc<dyn SubmissionStore>,
        query: ResultQuery,
        initial: ResultStatus,
        every: Duration,
    ) -> Self {
        let (updates_tx, updates) = watch::channel(initial);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(poll_loop(store, query, updates_tx, shutdown_rx, every));

        Self { updates, _shutdown: shutdown, handle }
    }

    pub(crate) fn latest(&self) -> ResultStatus {
        self.updates.borrow().clone()
    }

    /// Waits until the result resolves; if polling stops first, returns the last status seen.
    pub(crate) async fn resolved(&mut self) -> ResultStatus {
        if let Ok(status) = self.updates.wait_for(ResultStatus::is_resolved).await {
            return status.clone();
        }
        self.latest()
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

async fn poll_loop(
    store: Arc<dyn SubmissionStore>,
    query: ResultQuery,
    updates: watch::Sender<ResultStatus>,
    mut shutdown: watch::Receiver<bool>,
    every: Duration,
) {
    let mut tick = interval_at(Instant::now() + every, every);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = updates.closed() => break,
            _ = tick.tick() => {
                match store.list().await {
                    Ok(rows) => {
                        let status = find_result(&rows, &query);
                        let resolved = status.is_resolved();
                        updates.send_replace(status);
                        if resolved {
                            tracing::debug!(student = %query.name, "Result resolved; polling stopped");
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(student = %query.name, error = %err, "Result poll failed");
                    }
                }
            }
        }
    }
}
