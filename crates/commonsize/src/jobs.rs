//! Benchmark job processing on top of a [`Store`].

use std::fmt;
use std::sync::Arc;

use commonsize_core::{
    BenchmarkJob, BenchmarkKey, BenchmarkStore, CommonSizeError, CompanyRef, EnqueueOutcome,
    FactProvider, IndustryBenchmark, IndustryInfo, JobStatus, PeriodKind, Result, StatementKind,
    Store,
};
use commonsize_engine::{build_statement, layout_for};
use tracing::{debug, info, instrument, warn};

/// Result of asking for an industry benchmark.
#[derive(Clone, Debug, PartialEq)]
pub enum BenchmarkReadiness {
    /// A fresh benchmark is cached.
    Ready(IndustryBenchmark),
    /// No fresh benchmark; this job will (or did try to) compute it.
    Queued(BenchmarkJob),
    /// The subject has no industry code, so no key can be formed.
    Unclassified,
}

/// Queue of benchmark computations backed by a shared store.
///
/// Cloning is cheap; clones share the store and provider.
#[derive(Clone)]
pub struct BenchmarkQueue {
    store: Arc<dyn Store>,
    provider: Arc<dyn FactProvider>,
}

impl fmt::Debug for BenchmarkQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BenchmarkQueue")
            .field("provider", &self.provider.name())
            .finish_non_exhaustive()
    }
}

impl BenchmarkQueue {
    /// Creates a queue over `store`, fetching facts from `provider`.
    pub fn new(store: Arc<dyn Store>, provider: Arc<dyn FactProvider>) -> Self {
        Self { store, provider }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Enqueues a benchmark computation for `key`.
    pub async fn enqueue(
        &self,
        key: &BenchmarkKey,
        subject: &CompanyRef,
        max_peers: usize,
        force: bool,
    ) -> Result<EnqueueOutcome> {
        self.store.enqueue_job(key, subject, max_peers, force).await
    }

    /// Returns the job recorded for `key`.
    pub async fn status(&self, key: &BenchmarkKey) -> Result<Option<BenchmarkJob>> {
        self.store.job_status(key).await
    }

    /// Claims the oldest pending job.
    pub async fn claim(&self) -> Result<Option<BenchmarkJob>> {
        self.store.claim_next_job().await
    }

    /// Computes and stores the benchmark for a claimed job, then records the
    /// outcome.
    ///
    /// Failures of the computation mark the job failed and are not returned;
    /// the job is not retried.
    ///
    /// # Errors
    /// Returns an error only if the outcome cannot be written to the store.
    #[instrument(skip(self, job), fields(key = %job.key, subject = %job.subject))]
    pub async fn process(&self, job: &BenchmarkJob) -> Result<JobStatus> {
        match self.compute(job).await {
            Ok(peer_count) => {
                self.store
                    .complete_job(&job.key, JobStatus::Succeeded, None)
                    .await?;
                info!(peer_count, "Benchmark job succeeded");
                Ok(JobStatus::Succeeded)
            }
            Err(e) => {
                let message = e.to_string();
                self.store
                    .complete_job(&job.key, JobStatus::Failed, Some(&message))
                    .await?;
                warn!(error = %e, "Benchmark job failed");
                Ok(JobStatus::Failed)
            }
        }
    }

    async fn compute(&self, job: &BenchmarkJob) -> Result<usize> {
        let key = &job.key;
        let facts = self.provider.fetch_facts(&job.subject.cik).await?;
        let peers = self
            .provider
            .fetch_peer_facts(&job.subject.cik, job.max_peers)
            .await?;
        if peers.fact_sets.is_empty() {
            return Err(CommonSizeError::NoPeerData(format!(
                "No peer filings available for industry {}",
                key.industry
            )));
        }
        debug!(peers = peers.fact_sets.len(), "Fetched peer facts");

        let statement = build_statement(&facts, key.statement, key.period, Some(&peers.fact_sets))?;
        if statement.peer_count == 0 {
            return Err(CommonSizeError::NoPeerData(format!(
                "None of {} peers in industry {} produced a statement",
                peers.fact_sets.len(),
                key.industry
            )));
        }

        self.store
            .store_benchmark(
                key,
                &statement.industry_ratios(),
                statement.peer_count,
                statement.lines.len(),
            )
            .await?;
        Ok(statement.peer_count)
    }

    /// Returns the cached benchmark for the subject's industry, or makes sure a
    /// job exists to compute it.
    ///
    /// A job that succeeded but whose benchmark has since expired is queued
    /// again. A failed job is returned as is.
    #[instrument(skip(self, subject, industry), fields(subject = %subject, industry = ?industry.sic))]
    pub async fn ensure_ready(
        &self,
        subject: &CompanyRef,
        industry: &IndustryInfo,
        kind: StatementKind,
        period: PeriodKind,
        max_peers: usize,
    ) -> Result<BenchmarkReadiness> {
        let Some(key) = industry.benchmark_key(kind, period) else {
            return Ok(BenchmarkReadiness::Unclassified);
        };

        let expected = layout_for(kind).len();
        if let Some(benchmark) = self.store.load_benchmark(&key, Some(expected), None).await? {
            return Ok(BenchmarkReadiness::Ready(benchmark));
        }

        let expired = matches!(
            self.store.job_status(&key).await?,
            Some(job) if job.status == JobStatus::Succeeded
        );
        let outcome = self
            .store
            .enqueue_job(&key, subject, max_peers, expired)
            .await?;
        debug!(?outcome, expired, "Benchmark not cached");

        let job = self.store.job_status(&key).await?.ok_or_else(|| {
            CommonSizeError::Store(format!("Job for {key} missing after enqueue"))
        })?;
        Ok(BenchmarkReadiness::Queued(job))
    }

    /// Processes pending jobs until none remain.
    ///
    /// Returns the number of jobs processed.
    pub async fn drain(&self) -> Result<usize> {
        let mut processed = 0;
        while let Some(job) = self.claim().await? {
            self.process(&job).await?;
            processed += 1;
        }
        Ok(processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeProvider, income_facts};
    use commonsize_cache::InMemoryStore;
    use commonsize_engine::layout::labels::NET_INCOME;
    use std::time::Duration;

    fn provider() -> FakeProvider {
        FakeProvider::new()
            .with_company("AAPL", "320193", Some("3571"), income_facts("Apple", 100.0, 25.0))
            .with_company("DELL", "1571996", Some("3571"), income_facts("Dell", 200.0, 80.0))
            .with_company("HPQ", "47217", Some("3571"), income_facts("HP", 100.0, 50.0))
            .with_company("MSFT", "789019", Some("7372"), income_facts("Microsoft", 100.0, 35.0))
    }

    fn queue_with(provider: FakeProvider, store: InMemoryStore) -> BenchmarkQueue {
        BenchmarkQueue::new(Arc::new(store), Arc::new(provider))
    }

    fn subject() -> CompanyRef {
        CompanyRef::new("AAPL", "320193", "AAPL Inc.")
    }

    fn industry(sic: &str) -> IndustryInfo {
        IndustryInfo::new(Some(sic.to_string()), None)
    }

    fn key() -> BenchmarkKey {
        BenchmarkKey::new("3571", StatementKind::Income, PeriodKind::Annual)
    }

    fn net_income_index() -> usize {
        layout_for(StatementKind::Income)
            .iter()
            .position(|entry| entry.label == NET_INCOME)
            .unwrap()
    }

    #[tokio::test]
    async fn test_job_lifecycle() {
        let queue = queue_with(provider(), InMemoryStore::new());

        assert_eq!(
            queue.enqueue(&key(), &subject(), 5, false).await.unwrap(),
            EnqueueOutcome::Inserted
        );
        let job = queue.claim().await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert!(queue.claim().await.unwrap().is_none());

        assert_eq!(queue.process(&job).await.unwrap(), JobStatus::Succeeded);
        let done = queue.status(&key()).await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Succeeded);
        assert!(done.finished_at.is_some());
        assert!(done.error.is_none());

        let expected = layout_for(StatementKind::Income).len();
        let benchmark = queue
            .store()
            .load_benchmark(&key(), Some(expected), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(benchmark.peer_count, 2);
        assert_eq!(benchmark.ratios[0], Some(1.0));
        let net_income = benchmark.ratios[net_income_index()].unwrap();
        assert!((net_income - 0.45).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_process_without_peers_fails() {
        let provider = FakeProvider::new().with_company(
            "AAPL",
            "320193",
            Some("3571"),
            income_facts("Apple", 100.0, 25.0),
        );
        let queue = queue_with(provider, InMemoryStore::new());
        queue.enqueue(&key(), &subject(), 5, false).await.unwrap();

        let job = queue.claim().await.unwrap().unwrap();
        assert_eq!(queue.process(&job).await.unwrap(), JobStatus::Failed);

        let failed = queue.status(&key()).await.unwrap().unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert!(failed.error.unwrap().contains("No peer filings available"));
        assert!(queue.store().load_benchmark(&key(), None, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_process_when_no_peer_contributes() {
        let provider = FakeProvider::new()
            .with_company("AAPL", "320193", Some("3571"), income_facts("Apple", 100.0, 25.0))
            .with_company("ZERO", "1", Some("3571"), income_facts("Zero", 0.0, 5.0));
        let queue = queue_with(provider, InMemoryStore::new());
        queue.enqueue(&key(), &subject(), 5, false).await.unwrap();

        let job = queue.claim().await.unwrap().unwrap();
        assert_eq!(queue.process(&job).await.unwrap(), JobStatus::Failed);
        let failed = queue.status(&key()).await.unwrap().unwrap();
        assert!(failed.error.unwrap().starts_with("No peer data"));
    }

    #[tokio::test]
    async fn test_process_subject_fetch_failure() {
        let queue = queue_with(provider().with_failing("320193"), InMemoryStore::new());
        queue.enqueue(&key(), &subject(), 5, false).await.unwrap();

        let job = queue.claim().await.unwrap().unwrap();
        assert_eq!(queue.process(&job).await.unwrap(), JobStatus::Failed);
        let failed = queue.status(&key()).await.unwrap().unwrap();
        assert_eq!(failed.error.as_deref(), Some("Network error: HTTP 503 for 0000320193"));
    }

    #[tokio::test]
    async fn test_ensure_ready_queues_then_ready() {
        let queue = queue_with(provider(), InMemoryStore::new());

        let readiness = queue
            .ensure_ready(&subject(), &industry("3571"), StatementKind::Income, PeriodKind::Annual, 5)
            .await
            .unwrap();
        let BenchmarkReadiness::Queued(job) = readiness else {
            panic!("expected a queued job, got {readiness:?}");
        };
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.key, key());

        assert_eq!(queue.drain().await.unwrap(), 1);

        let readiness = queue
            .ensure_ready(&subject(), &industry("3571"), StatementKind::Income, PeriodKind::Annual, 5)
            .await
            .unwrap();
        assert!(matches!(readiness, BenchmarkReadiness::Ready(b) if b.peer_count == 2));
    }

    #[tokio::test]
    async fn test_ensure_ready_unclassified() {
        let queue = queue_with(provider(), InMemoryStore::new());
        let readiness = queue
            .ensure_ready(
                &subject(),
                &IndustryInfo::default(),
                StatementKind::Income,
                PeriodKind::Annual,
                5,
            )
            .await
            .unwrap();
        assert_eq!(readiness, BenchmarkReadiness::Unclassified);
        assert!(queue.claim().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ensure_ready_requeues_expired_benchmark() {
        let store = InMemoryStore::new().with_ttl(Duration::from_millis(20));
        let queue = queue_with(provider(), store);
        let args = (StatementKind::Income, PeriodKind::Annual);

        queue
            .ensure_ready(&subject(), &industry("3571"), args.0, args.1, 5)
            .await
            .unwrap();
        queue.drain().await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        let readiness = queue
            .ensure_ready(&subject(), &industry("3571"), args.0, args.1, 5)
            .await
            .unwrap();
        let BenchmarkReadiness::Queued(job) = readiness else {
            panic!("expected a requeued job, got {readiness:?}");
        };
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempts, 0);
    }

    #[tokio::test]
    async fn test_ensure_ready_leaves_failed_job() {
        let provider = FakeProvider::new().with_company(
            "AAPL",
            "320193",
            Some("3571"),
            income_facts("Apple", 100.0, 25.0),
        );
        let queue = queue_with(provider, InMemoryStore::new());
        let args = (StatementKind::Income, PeriodKind::Annual);

        queue
            .ensure_ready(&subject(), &industry("3571"), args.0, args.1, 5)
            .await
            .unwrap();
        queue.drain().await.unwrap();

        let readiness = queue
            .ensure_ready(&subject(), &industry("3571"), args.0, args.1, 5)
            .await
            .unwrap();
        assert!(matches!(
            readiness,
            BenchmarkReadiness::Queued(job) if job.status == JobStatus::Failed
        ));
        assert!(queue.claim().await.unwrap().is_none());
    }
}
