//! Store traits for cached benchmarks and benchmark jobs.
//!
//! This module defines the [`BenchmarkStore`] and [`JobStore`] traits that
//! provide a unified interface over persistent and in-memory backends.

use async_trait::async_trait;
use std::time::Duration;

use crate::{
    error::{CommonSizeError, Result},
    types::{BenchmarkJob, BenchmarkKey, CompanyRef, IndustryBenchmark, JobStatus},
};

/// Default benchmark time-to-live: seven days.
pub const DEFAULT_BENCHMARK_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7);

/// Outcome of an enqueue request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// A new pending job was created.
    Inserted,
    /// An existing job was reset to pending.
    Requeued,
    /// An existing job was left untouched.
    Unchanged,
}

/// Checks a ratio vector before it is persisted.
///
/// Returns `Ok(false)` when the vector is empty and nothing should be stored.
///
/// # Errors
/// Returns [`CommonSizeError::Validation`] if the vector length differs from
/// `line_count`.
pub fn validate_ratios(ratios: &[Option<f64>], line_count: usize) -> Result<bool> {
    if ratios.is_empty() {
        return Ok(false);
    }
    if ratios.len() != line_count {
        return Err(CommonSizeError::Validation(format!(
            "Line count mismatch when storing industry benchmark: {} ratios for {} lines",
            ratios.len(),
            line_count
        )));
    }
    Ok(true)
}

/// TTL-bounded cache of industry benchmarks.
#[async_trait]
pub trait BenchmarkStore: Send + Sync {
    /// Loads a benchmark if it is present, matches the expected layout and is
    /// younger than `max_age`.
    ///
    /// `max_age = None` uses the store's configured TTL.
    /// Returns `Ok(None)` on a miss, a schema mismatch, or a stale record.
    async fn load_benchmark(
        &self,
        key: &BenchmarkKey,
        expected_line_count: Option<usize>,
        max_age: Option<Duration>,
    ) -> Result<Option<IndustryBenchmark>>;

    /// Inserts or overwrites the benchmark for `key`, refreshing its timestamp.
    ///
    /// An empty ratio vector is a no-op.
    async fn store_benchmark(
        &self,
        key: &BenchmarkKey,
        ratios: &[Option<f64>],
        peer_count: usize,
        line_count: usize,
    ) -> Result<()>;

    /// Removes benchmarks older than the specified TTL.
    ///
    /// Returns the number of entries invalidated.
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize>;

    /// Clears all benchmarks and jobs.
    async fn clear(&self) -> Result<()>;
}

/// Durable queue of benchmark jobs, at most one per key.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Creates a pending job for `key` if none exists.
    ///
    /// With `force`, a job that is not running is reset to pending with
    /// cleared timestamps, attempts and error, and the new parameters.
    async fn enqueue_job(
        &self,
        key: &BenchmarkKey,
        subject: &CompanyRef,
        max_peers: usize,
        force: bool,
    ) -> Result<EnqueueOutcome>;

    /// Returns the job recorded for `key`.
    async fn job_status(&self, key: &BenchmarkKey) -> Result<Option<BenchmarkJob>>;

    /// Atomically claims the oldest pending job, marking it running and
    /// incrementing its attempt counter.
    async fn claim_next_job(&self) -> Result<Option<BenchmarkJob>>;

    /// Records a terminal status for the job identified by `key`.
    async fn complete_job(
        &self,
        key: &BenchmarkKey,
        status: JobStatus,
        error: Option<&str>,
    ) -> Result<()>;
}

/// A backend that stores both benchmarks and their jobs.
pub trait Store: BenchmarkStore + JobStore {}

impl<T: BenchmarkStore + JobStore> Store for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ratios() {
        assert!(!validate_ratios(&[], 3).unwrap());
        assert!(validate_ratios(&[Some(0.1), None], 2).unwrap());
        assert!(matches!(
            validate_ratios(&[Some(0.1)], 2),
            Err(CommonSizeError::Validation(_))
        ));
    }
}
