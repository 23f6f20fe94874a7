//! In-memory store implementation.

use async_trait::async_trait;
use chrono::Utc;
use commonsize_core::{
    BenchmarkJob, BenchmarkKey, BenchmarkStore, CommonSizeError, CompanyRef,
    DEFAULT_BENCHMARK_TTL, EnqueueOutcome, IndustryBenchmark, JobStatus, JobStore, Result,
    validate_ratios,
};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument, warn};

/// Job plus its insertion sequence, used to order jobs queued at the same instant.
#[derive(Debug, Clone)]
struct QueuedJob {
    job: BenchmarkJob,
    seq: u64,
}

#[derive(Debug, Default)]
struct JobQueue {
    jobs: HashMap<BenchmarkKey, QueuedJob>,
    next_seq: u64,
}

impl JobQueue {
    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

/// Store for tests and single-process use.
///
/// Data lives in lock-protected maps and is lost when the store is dropped.
/// The job queue is held under one mutex so a claim selects and updates a job
/// atomically.
#[derive(Debug)]
pub struct InMemoryStore {
    ttl: Duration,
    benchmarks: RwLock<HashMap<BenchmarkKey, IndustryBenchmark>>,
    jobs: Mutex<JobQueue>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_BENCHMARK_TTL,
            benchmarks: RwLock::default(),
            jobs: Mutex::default(),
        }
    }
}

impl InMemoryStore {
    /// Creates an empty store with the default TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the benchmark time-to-live used when callers pass no `max_age`.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

#[async_trait]
impl BenchmarkStore for InMemoryStore {
    #[instrument(skip(self, key), fields(key = %key))]
    async fn load_benchmark(
        &self,
        key: &BenchmarkKey,
        expected_line_count: Option<usize>,
        max_age: Option<Duration>,
    ) -> Result<Option<IndustryBenchmark>> {
        let benchmarks = self.benchmarks.read().await;
        let Some(benchmark) = benchmarks.get(key) else {
            debug!("Cache miss for benchmark");
            return Ok(None);
        };

        if let Some(expected) = expected_line_count
            && let Err(e) = benchmark.check_schema(expected)
        {
            warn!(error = %e, "Ignoring cached benchmark");
            return Ok(None);
        }
        if benchmark.is_stale(max_age.unwrap_or(self.ttl)) {
            debug!("Cached benchmark is stale");
            return Ok(None);
        }

        debug!("Cache hit for benchmark");
        Ok(Some(benchmark.clone()))
    }

    #[instrument(skip(self, key, ratios), fields(key = %key))]
    async fn store_benchmark(
        &self,
        key: &BenchmarkKey,
        ratios: &[Option<f64>],
        peer_count: usize,
        line_count: usize,
    ) -> Result<()> {
        if !validate_ratios(ratios, line_count)? {
            return Ok(());
        }
        let benchmark = IndustryBenchmark {
            ratios: ratios.to_vec(),
            peer_count,
            line_count,
            updated_at: Utc::now(),
        };
        self.benchmarks.write().await.insert(key.clone(), benchmark);
        debug!("Cached benchmark");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize> {
        let mut benchmarks = self.benchmarks.write().await;
        let before = benchmarks.len();
        benchmarks.retain(|_, benchmark| !benchmark.is_stale(ttl));
        let removed = before - benchmarks.len();

        if removed > 0 {
            debug!("Invalidated {} stale benchmarks", removed);
        }
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        self.benchmarks.write().await.clear();
        self.jobs.lock().await.jobs.clear();
        debug!("Cleared all benchmarks and jobs");
        Ok(())
    }
}

#[async_trait]
impl JobStore for InMemoryStore {
    #[instrument(skip(self, key, subject), fields(key = %key, subject = %subject))]
    async fn enqueue_job(
        &self,
        key: &BenchmarkKey,
        subject: &CompanyRef,
        max_peers: usize,
        force: bool,
    ) -> Result<EnqueueOutcome> {
        let mut queue = self.jobs.lock().await;
        let existing = queue.jobs.get(key).map(|queued| queued.job.status);

        let outcome = match existing {
            Some(JobStatus::Running) => EnqueueOutcome::Unchanged,
            Some(_) if !force => EnqueueOutcome::Unchanged,
            status => {
                let seq = queue.next_seq();
                let job = BenchmarkJob::pending(key.clone(), subject.clone(), max_peers);
                queue.jobs.insert(key.clone(), QueuedJob { job, seq });
                if status.is_some() {
                    EnqueueOutcome::Requeued
                } else {
                    EnqueueOutcome::Inserted
                }
            }
        };

        debug!(?outcome, "Enqueued benchmark job");
        Ok(outcome)
    }

    async fn job_status(&self, key: &BenchmarkKey) -> Result<Option<BenchmarkJob>> {
        let queue = self.jobs.lock().await;
        Ok(queue.jobs.get(key).map(|queued| queued.job.clone()))
    }

    #[instrument(skip(self))]
    async fn claim_next_job(&self) -> Result<Option<BenchmarkJob>> {
        let mut queue = self.jobs.lock().await;
        let Some(next) = queue
            .jobs
            .values_mut()
            .filter(|queued| queued.job.status == JobStatus::Pending)
            .min_by_key(|queued| (queued.job.queued_at, queued.seq))
        else {
            return Ok(None);
        };

        next.job.status = JobStatus::Running;
        next.job.started_at = Some(Utc::now());
        next.job.attempts += 1;
        debug!(key = %next.job.key, attempts = next.job.attempts, "Claimed benchmark job");
        Ok(Some(next.job.clone()))
    }

    #[instrument(skip(self, key), fields(key = %key, status = %status))]
    async fn complete_job(
        &self,
        key: &BenchmarkKey,
        status: JobStatus,
        error: Option<&str>,
    ) -> Result<()> {
        if !status.is_terminal() {
            return Err(CommonSizeError::InvalidParameter(format!(
                "Cannot complete a job as {status}"
            )));
        }

        let mut queue = self.jobs.lock().await;
        match queue.jobs.get_mut(key) {
            Some(queued) => {
                queued.job.status = status;
                queued.job.finished_at = Some(Utc::now());
                queued.job.error = error.map(str::to_string);
            }
            None => warn!("Completed a job that is not queued"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonsize_core::{PeriodKind, StatementKind};

    fn key(industry: &str) -> BenchmarkKey {
        BenchmarkKey::new(industry, StatementKind::Balance, PeriodKind::Quarterly)
    }

    fn subject() -> CompanyRef {
        CompanyRef::new("AAPL", "320193", "Apple Inc.")
    }

    #[tokio::test]
    async fn test_memory_store_benchmarks() {
        let store = InMemoryStore::new();
        let key = key("3571");

        assert!(store.load_benchmark(&key, Some(2), None).await.unwrap().is_none());
        store
            .store_benchmark(&key, &[Some(0.1), None], 3, 2)
            .await
            .unwrap();

        let benchmark = store.load_benchmark(&key, Some(2), None).await.unwrap().unwrap();
        assert_eq!(benchmark.ratios, vec![Some(0.1), None]);
        assert_eq!(benchmark.peer_count, 3);
        assert!(store.load_benchmark(&key, Some(5), None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_ttl() {
        let store = InMemoryStore::new().with_ttl(Duration::from_millis(20));
        let key = key("3571");
        store.store_benchmark(&key, &[Some(1.0)], 1, 1).await.unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.load_benchmark(&key, Some(1), None).await.unwrap().is_none());
        assert_eq!(
            store
                .invalidate_stale(Duration::from_millis(20))
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_memory_store_jobs() {
        let store = InMemoryStore::new();
        let first = key("1000");
        let second = key("2000");

        assert_eq!(
            store.enqueue_job(&first, &subject(), 5, false).await.unwrap(),
            EnqueueOutcome::Inserted
        );
        store.enqueue_job(&second, &subject(), 5, false).await.unwrap();

        let claimed = store.claim_next_job().await.unwrap().unwrap();
        assert_eq!(claimed.key, first);
        assert_eq!(claimed.attempts, 1);
        let claimed = store.claim_next_job().await.unwrap().unwrap();
        assert_eq!(claimed.key, second);
        assert!(store.claim_next_job().await.unwrap().is_none());

        assert_eq!(
            store.enqueue_job(&first, &subject(), 5, true).await.unwrap(),
            EnqueueOutcome::Unchanged
        );
        store
            .complete_job(&first, JobStatus::Failed, Some("boom"))
            .await
            .unwrap();
        assert_eq!(
            store.enqueue_job(&first, &subject(), 7, false).await.unwrap(),
            EnqueueOutcome::Unchanged
        );
        assert_eq!(
            store.enqueue_job(&first, &subject(), 7, true).await.unwrap(),
            EnqueueOutcome::Requeued
        );

        let job = store.job_status(&first).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.max_peers, 7);
        assert_eq!(job.attempts, 0);
        assert!(job.error.is_none());
    }

    #[tokio::test]
    async fn test_memory_store_clear() {
        let store = InMemoryStore::new();
        let key = key("3571");
        store.store_benchmark(&key, &[Some(1.0)], 1, 1).await.unwrap();
        store.enqueue_job(&key, &subject(), 5, false).await.unwrap();

        store.clear().await.unwrap();
        assert!(store.load_benchmark(&key, None, None).await.unwrap().is_none());
        assert!(store.job_status(&key).await.unwrap().is_none());
    }
}
