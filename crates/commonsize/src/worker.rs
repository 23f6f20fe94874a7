//! Background worker draining the benchmark queue.

use std::time::Duration;

use commonsize_core::{CommonSizeError, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::jobs::BenchmarkQueue;

/// Claims and processes jobs until `stop` turns true or its sender is dropped.
///
/// Sleeps `poll_interval` when the queue is empty; the sleep ends early on a
/// stop signal. A job in flight always completes. Job failures are recorded on
/// the job and never end the loop. Returns the number of jobs processed.
pub async fn run_worker(
    queue: BenchmarkQueue,
    mut stop: watch::Receiver<bool>,
    poll_interval: Duration,
) -> usize {
    let mut processed = 0;
    info!(?poll_interval, "Benchmark worker started");

    while !*stop.borrow_and_update() {
        match queue.claim().await {
            Ok(Some(job)) => {
                match queue.process(&job).await {
                    Ok(status) => debug!(key = %job.key, %status, "Processed benchmark job"),
                    Err(e) => error!(key = %job.key, error = %e, "Failed to record job outcome"),
                }
                processed += 1;
                continue;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to claim benchmark job"),
        }

        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            changed = stop.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    info!(processed, "Benchmark worker stopped");
    processed
}

/// Handle to a worker running on the tokio runtime.
#[derive(Debug)]
pub struct WorkerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<usize>,
}

impl WorkerHandle {
    /// Signals the worker to stop and waits for it to finish its current job.
    ///
    /// Returns the number of jobs the worker processed.
    ///
    /// # Errors
    /// Returns [`CommonSizeError::Other`] if the worker task panicked.
    pub async fn shutdown(self) -> Result<usize> {
        // a worker that already exited has dropped its receiver
        let _ = self.stop.send(true);
        self.task
            .await
            .map_err(|e| CommonSizeError::Other(format!("Benchmark worker panicked: {e}")))
    }
}

/// Spawns [`run_worker`] on the current runtime.
pub fn spawn_worker(queue: BenchmarkQueue, poll_interval: Duration) -> WorkerHandle {
    let (stop, rx) = watch::channel(false);
    let task = tokio::spawn(run_worker(queue, rx, poll_interval));
    WorkerHandle { stop, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeProvider, income_facts};
    use commonsize_cache::InMemoryStore;
    use commonsize_core::{BenchmarkKey, CompanyRef, JobStatus, PeriodKind, StatementKind};
    use std::sync::Arc;

    fn queue() -> BenchmarkQueue {
        let provider = FakeProvider::new()
            .with_company("AAPL", "320193", Some("3571"), income_facts("Apple", 100.0, 25.0))
            .with_company("DELL", "1571996", Some("3571"), income_facts("Dell", 200.0, 80.0))
            .with_company("MSFT", "789019", Some("7372"), income_facts("Microsoft", 100.0, 35.0));
        BenchmarkQueue::new(Arc::new(InMemoryStore::new()), Arc::new(provider))
    }

    #[tokio::test]
    async fn test_worker_processes_jobs_until_stopped() {
        let queue = queue();
        let ok = BenchmarkKey::new("3571", StatementKind::Income, PeriodKind::Annual);
        let lonely = BenchmarkKey::new("7372", StatementKind::Income, PeriodKind::Annual);
        queue
            .enqueue(&ok, &CompanyRef::new("AAPL", "320193", ""), 5, false)
            .await
            .unwrap();
        queue
            .enqueue(&lonely, &CompanyRef::new("MSFT", "789019", ""), 5, false)
            .await
            .unwrap();

        let worker = spawn_worker(queue.clone(), Duration::from_millis(10));
        for _ in 0..100 {
            let done = queue.status(&lonely).await.unwrap().unwrap().status.is_terminal();
            if done {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(worker.shutdown().await.unwrap(), 2);
        assert_eq!(queue.status(&ok).await.unwrap().unwrap().status, JobStatus::Succeeded);
        // a failing job does not stop the worker
        assert_eq!(queue.status(&lonely).await.unwrap().unwrap().status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_worker_stops_while_idle() {
        let (stop, rx) = watch::channel(false);
        let task = tokio::spawn(run_worker(queue(), rx, Duration::from_secs(3600)));

        tokio::time::sleep(Duration::from_millis(20)).await;
        stop.send(true).unwrap();

        let processed = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(processed, 0);
    }

    #[tokio::test]
    async fn test_worker_stops_when_sender_dropped() {
        let (stop, rx) = watch::channel(false);
        drop(stop);
        assert_eq!(run_worker(queue(), rx, Duration::from_secs(3600)).await, 0);
    }
}
