//! Statement requests with optional industry benchmarks.

use std::fmt;
use std::sync::Arc;

use commonsize_core::{
    BenchmarkJob, CommonSizeError, CompanyRef, FactBag, FactProvider,
    IndustryClassifier, IndustryInfo, PeriodKind, Result, StatementKind, Store,
};
use commonsize_engine::{CommonSizeStatement, build_statement};
use tracing::{debug, info, instrument, warn};

use crate::jobs::{BenchmarkQueue, BenchmarkReadiness};

/// How to obtain the industry column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BenchmarkMode {
    /// No industry column.
    #[default]
    None,
    /// Use a fresh cached benchmark, or compute it from peers in this call.
    Inline {
        /// Maximum number of peers to fetch.
        max_peers: usize,
    },
    /// Use a fresh cached benchmark, or leave it to the worker.
    Queued {
        /// Maximum number of peers the job fetches.
        max_peers: usize,
    },
}

impl BenchmarkMode {
    const fn max_peers(self) -> usize {
        match self {
            Self::None => 0,
            Self::Inline { max_peers } | Self::Queued { max_peers } => max_peers,
        }
    }
}

/// Where the industry column of a report came from.
#[derive(Clone, Debug, PartialEq)]
pub enum BenchmarkSource {
    /// No benchmark was requested.
    None,
    /// Loaded from the store.
    Cached,
    /// Computed from peers during the request.
    Computed,
    /// Pending, running or failed in the job queue.
    Queued(BenchmarkJob),
    /// Requested but not obtainable (unclassified subject or no usable peers).
    Unavailable,
}

/// A built statement with the company and industry it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct StatementReport {
    /// The resolved company.
    pub subject: CompanyRef,
    /// Industry classification; empty when no benchmark was requested.
    pub industry: IndustryInfo,
    /// The common-size statement.
    pub statement: CommonSizeStatement,
    /// Origin of the industry column.
    pub benchmark: BenchmarkSource,
}

/// Resolves companies, builds statements and attaches industry benchmarks.
pub struct StatementService {
    provider: Arc<dyn FactProvider>,
    classifier: Arc<dyn IndustryClassifier>,
    queue: BenchmarkQueue,
}

impl fmt::Debug for StatementService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementService")
            .field("provider", &self.provider.name())
            .field("classifier", &self.classifier.name())
            .field("queue", &self.queue)
            .finish()
    }
}

impl StatementService {
    /// Creates a service over a provider that also classifies industries.
    pub fn new<P>(provider: Arc<P>, store: Arc<dyn Store>) -> Self
    where
        P: FactProvider + IndustryClassifier + 'static,
    {
        let queue = BenchmarkQueue::new(store, provider.clone());
        Self {
            provider: provider.clone(),
            classifier: provider,
            queue,
        }
    }

    /// Creates a service from separate collaborators.
    pub fn from_parts(
        provider: Arc<dyn FactProvider>,
        classifier: Arc<dyn IndustryClassifier>,
        store: Arc<dyn Store>,
    ) -> Self {
        let queue = BenchmarkQueue::new(store, Arc::clone(&provider));
        Self {
            provider,
            classifier,
            queue,
        }
    }

    /// The benchmark queue requests are enqueued on.
    #[must_use]
    pub const fn queue(&self) -> &BenchmarkQueue {
        &self.queue
    }

    /// Builds the common-size statement of `entity` (ticker or CIK).
    ///
    /// A mode with `max_peers = 0` behaves like [`BenchmarkMode::None`].
    ///
    /// # Errors
    /// Fails if the entity cannot be resolved, its facts cannot be fetched, or
    /// its statement is unavailable. In inline mode a benchmark that fails
    /// validation on write is logged and skipped.
    #[instrument(skip(self), fields(statement = %kind, period = %period))]
    pub async fn common_size(
        &self,
        entity: &str,
        kind: StatementKind,
        period: PeriodKind,
        mode: BenchmarkMode,
    ) -> Result<StatementReport> {
        let subject = self.provider.resolve_entity(entity).await?;
        let facts = self.provider.fetch_facts(&subject.cik).await?;
        let mut statement = build_statement(&facts, kind, period, None)?;

        let max_peers = mode.max_peers();
        if max_peers == 0 {
            return Ok(StatementReport {
                subject,
                industry: IndustryInfo::default(),
                statement,
                benchmark: BenchmarkSource::None,
            });
        }

        let industry = self.classifier.industry(&subject.cik).await?;
        let benchmark = match mode {
            BenchmarkMode::Inline { .. } => {
                self.inline_benchmark(&subject, &industry, &facts, &mut statement, max_peers)
                    .await?
            }
            _ => {
                self.queued_benchmark(&subject, &industry, &mut statement, max_peers)
                    .await?
            }
        };
        info!(subject = %subject, industry = ?industry.sic, source = ?benchmark, "Built statement");

        Ok(StatementReport {
            subject,
            industry,
            statement,
            benchmark,
        })
    }

    async fn inline_benchmark(
        &self,
        subject: &CompanyRef,
        industry: &IndustryInfo,
        facts: &FactBag,
        statement: &mut CommonSizeStatement,
        max_peers: usize,
    ) -> Result<BenchmarkSource> {
        let Some(key) = industry.benchmark_key(statement.kind, statement.period) else {
            debug!("Subject has no industry code");
            return Ok(BenchmarkSource::Unavailable);
        };

        let store = self.queue.store();
        if let Some(benchmark) = store
            .load_benchmark(&key, Some(statement.lines.len()), None)
            .await?
        {
            statement.apply_benchmark(&benchmark)?;
            return Ok(BenchmarkSource::Cached);
        }

        let peers = self
            .provider
            .fetch_peer_facts(&subject.cik, max_peers)
            .await?;
        if peers.fact_sets.is_empty() {
            debug!(key = %key, "No peer filings available");
            return Ok(BenchmarkSource::Unavailable);
        }

        let with_peers = build_statement(
            facts,
            statement.kind,
            statement.period,
            Some(&peers.fact_sets),
        )?;
        if with_peers.peer_count == 0 {
            debug!(key = %key, peers = peers.fact_sets.len(), "No peer produced a statement");
            return Ok(BenchmarkSource::Unavailable);
        }
        *statement = with_peers;

        match store
            .store_benchmark(
                &key,
                &statement.industry_ratios(),
                statement.peer_count,
                statement.lines.len(),
            )
            .await
        {
            Ok(()) => {}
            Err(CommonSizeError::Validation(message)) => {
                warn!(key = %key, error = %message, "Benchmark not cached");
            }
            Err(e) => return Err(e),
        }
        Ok(BenchmarkSource::Computed)
    }

    async fn queued_benchmark(
        &self,
        subject: &CompanyRef,
        industry: &IndustryInfo,
        statement: &mut CommonSizeStatement,
        max_peers: usize,
    ) -> Result<BenchmarkSource> {
        let readiness = self
            .queue
            .ensure_ready(subject, industry, statement.kind, statement.period, max_peers)
            .await?;

        Ok(match readiness {
            BenchmarkReadiness::Ready(benchmark) => {
                statement.apply_benchmark(&benchmark)?;
                BenchmarkSource::Cached
            }
            BenchmarkReadiness::Queued(job) => BenchmarkSource::Queued(job),
            BenchmarkReadiness::Unclassified => BenchmarkSource::Unavailable,
        })
    }
}
