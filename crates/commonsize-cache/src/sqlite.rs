//! SQLite-backed benchmark store and job queue.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use commonsize_core::{
    BenchmarkJob, BenchmarkKey, BenchmarkStore, CommonSizeError, CompanyRef,
    DEFAULT_BENCHMARK_TTL, EnqueueOutcome, IndustryBenchmark, JobStatus, JobStore, Result,
    validate_ratios,
};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// How long a connection waits on another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const JOB_COLUMNS: &str = "sic, statement, period, max_peers, subject_cik, subject_ticker,
     subject_title, status, queued_at, started_at, finished_at, attempts, error";

/// Persistent store for industry benchmarks and their jobs.
///
/// Several processes may open the same database file; job claims are
/// serialized by an immediate transaction so each pending job is handed out
/// exactly once.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    ttl: Duration,
}

impl SqliteStore {
    /// Opens (or creates) a store at the given path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| CommonSizeError::Store(e.to_string()))?;
        Self::from_connection(conn)
    }

    /// Creates a store backed by a private in-memory database.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| CommonSizeError::Store(e.to_string()))?;
        Self::from_connection(conn)
    }

    /// Sets the benchmark time-to-live used when callers pass no `max_age`.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns the configured benchmark time-to-live.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| CommonSizeError::Store(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
            ttl: DEFAULT_BENCHMARK_TTL,
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CommonSizeError::Store(e.to_string()))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS industry_benchmarks (
                sic TEXT NOT NULL,
                statement TEXT NOT NULL,
                period TEXT NOT NULL,
                ratios TEXT NOT NULL,
                peer_count INTEGER NOT NULL,
                line_count INTEGER NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (sic, statement, period)
            );
            CREATE TABLE IF NOT EXISTS benchmark_jobs (
                sic TEXT NOT NULL,
                statement TEXT NOT NULL,
                period TEXT NOT NULL,
                max_peers INTEGER NOT NULL,
                subject_cik TEXT NOT NULL,
                subject_ticker TEXT NOT NULL,
                subject_title TEXT NOT NULL,
                status TEXT NOT NULL,
                queued_at TEXT NOT NULL,
                started_at TEXT,
                finished_at TEXT,
                attempts INTEGER NOT NULL DEFAULT 0,
                error TEXT,
                PRIMARY KEY (sic, statement, period)
            );
            CREATE INDEX IF NOT EXISTS idx_benchmark_jobs_status_queued
                ON benchmark_jobs(status, queued_at);",
        )
        .map_err(|e| CommonSizeError::Store(e.to_string()))?;

        debug!("SQLite store schema initialized");
        Ok(())
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    // fixed width so text order matches time order
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| CommonSizeError::Store(format!("Invalid timestamp {value}: {e}")))
}

/// Raw `benchmark_jobs` row.
struct JobRow {
    sic: String,
    statement: String,
    period: String,
    max_peers: usize,
    subject_cik: String,
    subject_ticker: String,
    subject_title: String,
    status: String,
    queued_at: String,
    started_at: Option<String>,
    finished_at: Option<String>,
    attempts: u32,
    error: Option<String>,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            sic: row.get(0)?,
            statement: row.get(1)?,
            period: row.get(2)?,
            max_peers: row.get(3)?,
            subject_cik: row.get(4)?,
            subject_ticker: row.get(5)?,
            subject_title: row.get(6)?,
            status: row.get(7)?,
            queued_at: row.get(8)?,
            started_at: row.get(9)?,
            finished_at: row.get(10)?,
            attempts: row.get(11)?,
            error: row.get(12)?,
        })
    }

    fn into_job(self) -> Result<BenchmarkJob> {
        Ok(BenchmarkJob {
            key: BenchmarkKey::new(self.sic, self.statement.parse()?, self.period.parse()?),
            subject: CompanyRef {
                ticker: self.subject_ticker,
                cik: self.subject_cik,
                title: self.subject_title,
            },
            max_peers: self.max_peers,
            status: self.status.parse()?,
            queued_at: parse_timestamp(&self.queued_at)?,
            started_at: self.started_at.as_deref().map(parse_timestamp).transpose()?,
            finished_at: self.finished_at.as_deref().map(parse_timestamp).transpose()?,
            attempts: self.attempts,
            error: self.error,
        })
    }
}

#[async_trait]
impl BenchmarkStore for SqliteStore {
    #[instrument(skip(self, key), fields(key = %key))]
    async fn load_benchmark(
        &self,
        key: &BenchmarkKey,
        expected_line_count: Option<usize>,
        max_age: Option<Duration>,
    ) -> Result<Option<IndustryBenchmark>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CommonSizeError::Store(e.to_string()))?;

        let row = conn
            .query_row(
                "SELECT ratios, peer_count, line_count, updated_at FROM industry_benchmarks
                 WHERE sic = ?1 AND statement = ?2 AND period = ?3",
                params![key.industry, key.statement.as_str(), key.period.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, usize>(1)?,
                        row.get::<_, usize>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| CommonSizeError::Store(e.to_string()))?;

        let Some((ratios, peer_count, line_count, updated_at)) = row else {
            debug!("No cached benchmark found");
            return Ok(None);
        };

        let benchmark = IndustryBenchmark {
            ratios: serde_json::from_str(&ratios)
                .map_err(|e| CommonSizeError::Store(e.to_string()))?,
            peer_count,
            line_count,
            updated_at: parse_timestamp(&updated_at)?,
        };

        if let Some(expected) = expected_line_count
            && let Err(e) = benchmark.check_schema(expected)
        {
            warn!(error = %e, "Ignoring cached benchmark");
            return Ok(None);
        }

        if benchmark.is_stale(max_age.unwrap_or(self.ttl)) {
            debug!(updated_at = %benchmark.updated_at, "Cached benchmark is stale");
            return Ok(None);
        }

        debug!(peer_count, "Found cached benchmark");
        Ok(Some(benchmark))
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
            debug!("Skipping empty benchmark");
            return Ok(());
        }
        let ratios_json =
            serde_json::to_string(ratios).map_err(|e| CommonSizeError::Store(e.to_string()))?;
        let updated_at = timestamp(Utc::now());

        let conn = self
            .conn
            .lock()
            .map_err(|e| CommonSizeError::Store(e.to_string()))?;

        conn.execute(
            "INSERT INTO industry_benchmarks
             (sic, statement, period, ratios, peer_count, line_count, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(sic, statement, period) DO UPDATE SET
                ratios = excluded.ratios,
                peer_count = excluded.peer_count,
                line_count = excluded.line_count,
                updated_at = excluded.updated_at",
            params![
                key.industry,
                key.statement.as_str(),
                key.period.as_str(),
                ratios_json,
                peer_count,
                line_count,
                updated_at
            ],
        )
        .map_err(|e| CommonSizeError::Store(e.to_string()))?;

        debug!("Cached benchmark");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize> {
        if ttl.is_zero() {
            return Ok(0);
        }
        let cutoff = Utc::now()
            - chrono::Duration::from_std(ttl)
                .map_err(|e| CommonSizeError::InvalidParameter(format!("Invalid TTL: {e}")))?;

        let conn = self
            .conn
            .lock()
            .map_err(|e| CommonSizeError::Store(e.to_string()))?;

        let deleted = conn
            .execute(
                "DELETE FROM industry_benchmarks WHERE updated_at < ?1",
                params![timestamp(cutoff)],
            )
            .map_err(|e| CommonSizeError::Store(e.to_string()))?;

        if deleted > 0 {
            debug!("Invalidated {} stale benchmarks", deleted);
        }
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CommonSizeError::Store(e.to_string()))?;

        conn.execute_batch("DELETE FROM industry_benchmarks; DELETE FROM benchmark_jobs;")
            .map_err(|e| CommonSizeError::Store(e.to_string()))?;

        debug!("Cleared all benchmarks and jobs");
        Ok(())
    }
}

#[async_trait]
impl JobStore for SqliteStore {
    #[instrument(skip(self, key, subject), fields(key = %key, subject = %subject))]
    async fn enqueue_job(
        &self,
        key: &BenchmarkKey,
        subject: &CompanyRef,
        max_peers: usize,
        force: bool,
    ) -> Result<EnqueueOutcome> {
        let queued_at = timestamp(Utc::now());

        let mut conn = self
            .conn
            .lock()
            .map_err(|e| CommonSizeError::Store(e.to_string()))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| CommonSizeError::Store(e.to_string()))?;

        let status: Option<String> = tx
            .query_row(
                "SELECT status FROM benchmark_jobs
                 WHERE sic = ?1 AND statement = ?2 AND period = ?3",
                params![key.industry, key.statement.as_str(), key.period.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| CommonSizeError::Store(e.to_string()))?;

        let outcome = match status.as_deref().map(str::parse::<JobStatus>).transpose()? {
            None => {
                tx.execute(
                    "INSERT INTO benchmark_jobs
                     (sic, statement, period, max_peers, subject_cik, subject_ticker,
                      subject_title, status, queued_at, attempts)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0)",
                    params![
                        key.industry,
                        key.statement.as_str(),
                        key.period.as_str(),
                        max_peers,
                        subject.cik,
                        subject.ticker,
                        subject.title,
                        JobStatus::Pending.as_str(),
                        queued_at
                    ],
                )
                .map_err(|e| CommonSizeError::Store(e.to_string()))?;
                EnqueueOutcome::Inserted
            }
            Some(JobStatus::Running) => EnqueueOutcome::Unchanged,
            Some(_) if force => {
                tx.execute(
                    "UPDATE benchmark_jobs SET
                        max_peers = ?4, subject_cik = ?5, subject_ticker = ?6,
                        subject_title = ?7, status = ?8, queued_at = ?9,
                        started_at = NULL, finished_at = NULL, attempts = 0, error = NULL
                     WHERE sic = ?1 AND statement = ?2 AND period = ?3",
                    params![
                        key.industry,
                        key.statement.as_str(),
                        key.period.as_str(),
                        max_peers,
                        subject.cik,
                        subject.ticker,
                        subject.title,
                        JobStatus::Pending.as_str(),
                        queued_at
                    ],
                )
                .map_err(|e| CommonSizeError::Store(e.to_string()))?;
                EnqueueOutcome::Requeued
            }
            Some(_) => EnqueueOutcome::Unchanged,
        };

        tx.commit()
            .map_err(|e| CommonSizeError::Store(e.to_string()))?;
        debug!(?outcome, "Enqueued benchmark job");
        Ok(outcome)
    }

    #[instrument(skip(self, key), fields(key = %key))]
    async fn job_status(&self, key: &BenchmarkKey) -> Result<Option<BenchmarkJob>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CommonSizeError::Store(e.to_string()))?;

        let row = conn
            .query_row(
                &format!(
                    "SELECT {JOB_COLUMNS} FROM benchmark_jobs
                     WHERE sic = ?1 AND statement = ?2 AND period = ?3"
                ),
                params![key.industry, key.statement.as_str(), key.period.as_str()],
                JobRow::from_row,
            )
            .optional()
            .map_err(|e| CommonSizeError::Store(e.to_string()))?;

        row.map(JobRow::into_job).transpose()
    }

    #[instrument(skip(self))]
    async fn claim_next_job(&self) -> Result<Option<BenchmarkJob>> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| CommonSizeError::Store(e.to_string()))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| CommonSizeError::Store(e.to_string()))?;

        let row = tx
            .query_row(
                &format!(
                    "SELECT {JOB_COLUMNS} FROM benchmark_jobs
                     WHERE status = ?1
                     ORDER BY queued_at ASC, rowid ASC
                     LIMIT 1"
                ),
                params![JobStatus::Pending.as_str()],
                JobRow::from_row,
            )
            .optional()
            .map_err(|e| CommonSizeError::Store(e.to_string()))?;

        let Some(row) = row else {
            tx.commit()
                .map_err(|e| CommonSizeError::Store(e.to_string()))?;
            return Ok(None);
        };

        let mut job = row.into_job()?;
        let started_at = Utc::now();
        tx.execute(
            "UPDATE benchmark_jobs SET status = ?4, started_at = ?5, attempts = attempts + 1
             WHERE sic = ?1 AND statement = ?2 AND period = ?3",
            params![
                job.key.industry,
                job.key.statement.as_str(),
                job.key.period.as_str(),
                JobStatus::Running.as_str(),
                timestamp(started_at)
            ],
        )
        .map_err(|e| CommonSizeError::Store(e.to_string()))?;
        tx.commit()
            .map_err(|e| CommonSizeError::Store(e.to_string()))?;

        job.status = JobStatus::Running;
        job.started_at = Some(started_at);
        job.attempts += 1;
        debug!(key = %job.key, attempts = job.attempts, "Claimed benchmark job");
        Ok(Some(job))
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

        let conn = self
            .conn
            .lock()
            .map_err(|e| CommonSizeError::Store(e.to_string()))?;

        let updated = conn
            .execute(
                "UPDATE benchmark_jobs SET status = ?4, finished_at = ?5, error = ?6
                 WHERE sic = ?1 AND statement = ?2 AND period = ?3",
                params![
                    key.industry,
                    key.statement.as_str(),
                    key.period.as_str(),
                    status.as_str(),
                    timestamp(Utc::now()),
                    error
                ],
            )
            .map_err(|e| CommonSizeError::Store(e.to_string()))?;

        if updated == 0 {
            warn!("Completed a job that is not queued");
        }
        Ok(())
    }
}
