//! Core data types for common-size statements.
//!
//! This module defines the fundamental data structures:
//!
//! - [`Fact`] - One reported XBRL data point
//! - [`FactBag`] - All facts of one entity, grouped by tag
//! - [`LayoutEntry`] - Static description of one statement line
//! - [`StatementLine`] - A resolved, common-sized statement line
//! - [`CompanyRef`] / [`IndustryInfo`] - Entity identity and classification
//! - [`BenchmarkKey`] / [`IndustryBenchmark`] - Cached industry averages
//! - [`BenchmarkJob`] / [`JobStatus`] - Deferred benchmark computations

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CommonSizeError, Result};
use crate::period::{PeriodKind, StatementKind};

/// A single reported data point.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    /// Accounting concept the value was reported under (e.g. "Revenues").
    pub tag: String,
    /// Reported value; `None` when the provider value was not numeric.
    pub value: Option<f64>,
    /// Unit of measure (e.g. "USD", "USD thousands").
    pub unit: Option<String>,
    /// Period end date as reported (`YYYY-MM-DD`).
    pub end: String,
    /// Filing form type (e.g. "10-K").
    pub form: Option<String>,
    /// Fiscal-period marker (e.g. "FY", "Q2").
    pub fiscal_period: Option<String>,
    /// Fiscal year the filing belongs to.
    pub fiscal_year: Option<i32>,
    /// Accession number of the filing that reported this fact.
    pub accession: Option<String>,
    /// Date the filing was made.
    pub filed: Option<String>,
}

impl Fact {
    /// Creates a new fact with the required fields.
    #[must_use]
    pub fn new(tag: impl Into<String>, value: f64, end: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            value: Some(value),
            end: end.into(),
            ..Default::default()
        }
    }

    /// Creates a full-year fact from an annual report, denominated in USD.
    #[must_use]
    pub fn annual(tag: impl Into<String>, value: f64, end: impl Into<String>) -> Self {
        Self::new(tag, value, end)
            .with_unit("USD")
            .with_form("10-K")
            .with_fiscal_period("FY")
    }

    /// Sets the unit of measure.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Sets the filing form type.
    #[must_use]
    pub fn with_form(mut self, form: impl Into<String>) -> Self {
        self.form = Some(form.into());
        self
    }

    /// Sets the fiscal-period marker.
    #[must_use]
    pub fn with_fiscal_period(mut self, fp: impl Into<String>) -> Self {
        self.fiscal_period = Some(fp.into());
        self
    }

    /// Sets the accession number.
    #[must_use]
    pub fn with_accession(mut self, accession: impl Into<String>) -> Self {
        self.accession = Some(accession.into());
        self
    }

    /// Parses the period end date, returning `None` if it is malformed.
    #[must_use]
    pub fn end_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.end, "%Y-%m-%d").ok()
    }
}

/// All facts reported by one entity, grouped by tag.
///
/// Facts under a tag keep the order in which they were inserted, which is the
/// order the resolver uses to break ties.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FactBag {
    /// Entity name as reported by the provider.
    pub entity_name: Option<String>,
    /// Zero-padded CIK of the entity.
    pub cik: Option<String>,
    facts: HashMap<String, Vec<Fact>>,
}

impl FactBag {
    /// Creates an empty fact bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the entity name.
    #[must_use]
    pub fn with_entity_name(mut self, name: impl Into<String>) -> Self {
        self.entity_name = Some(name.into());
        self
    }

    /// Adds a fact and returns the bag.
    #[must_use]
    pub fn with_fact(mut self, fact: Fact) -> Self {
        self.push(fact);
        self
    }

    /// Adds a fact under its tag.
    pub fn push(&mut self, fact: Fact) {
        self.facts.entry(fact.tag.clone()).or_default().push(fact);
    }

    /// Returns the facts reported under `tag`, in insertion order.
    #[must_use]
    pub fn facts_for(&self, tag: &str) -> &[Fact] {
        self.facts.get(tag).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns the number of distinct tags.
    #[must_use]
    pub fn tag_count(&self) -> usize {
        self.facts.len()
    }

    /// Returns the total number of facts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.values().map(Vec::len).sum()
    }

    /// Returns true if the bag holds no facts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.values().all(Vec::is_empty)
    }
}

impl FromIterator<Fact> for FactBag {
    fn from_iter<I: IntoIterator<Item = Fact>>(iter: I) -> Self {
        let mut bag = Self::new();
        for fact in iter {
            bag.push(fact);
        }
        bag
    }
}

/// Static description of one statement line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutEntry {
    /// Display label.
    pub label: &'static str,
    /// Candidate tags, tried in order.
    pub tags: &'static [&'static str],
    /// Indentation depth.
    pub indent: u8,
    /// Header lines carry no value.
    pub is_header: bool,
}

impl LayoutEntry {
    /// A value line resolved from `tags`.
    #[must_use]
    pub const fn line(label: &'static str, tags: &'static [&'static str], indent: u8) -> Self {
        Self {
            label,
            tags,
            indent,
            is_header: false,
        }
    }

    /// A header line without a value.
    #[must_use]
    pub const fn header(label: &'static str) -> Self {
        Self {
            label,
            tags: &[],
            indent: 0,
            is_header: true,
        }
    }
}

/// One line of a common-size statement.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    /// Display label.
    pub label: String,
    /// Value in canonical currency units.
    pub value: Option<f64>,
    /// Value divided by the denominator line.
    pub common_size: Option<f64>,
    /// Industry-average common-size ratio.
    pub industry_common_size: Option<f64>,
    /// Indentation depth.
    pub indent: u8,
    /// Whether this is a header line.
    pub is_header: bool,
}

impl StatementLine {
    /// Creates an unresolved line from its layout entry.
    #[must_use]
    pub fn from_layout(entry: &LayoutEntry) -> Self {
        Self {
            label: entry.label.to_string(),
            indent: entry.indent,
            is_header: entry.is_header,
            ..Default::default()
        }
    }

    /// Returns the value scaled to millions.
    #[must_use]
    pub fn value_in_millions(&self) -> Option<f64> {
        self.value.map(|v| v / 1_000_000.0)
    }
}

/// A company identity as resolved by the provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompanyRef {
    /// Ticker symbol, uppercased.
    pub ticker: String,
    /// Zero-padded 10-digit CIK.
    pub cik: String,
    /// Company name.
    pub title: String,
}

impl CompanyRef {
    /// Creates a company reference, zero-padding the CIK.
    #[must_use]
    pub fn new(
        ticker: impl Into<String>,
        cik: impl AsRef<str>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            ticker: ticker.into().to_uppercase(),
            cik: format!("{:0>10}", cik.as_ref().trim()),
            title: title.into(),
        }
    }
}

impl fmt::Display for CompanyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (CIK {})", self.ticker, self.cik)
    }
}

/// Industry classification of an entity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndustryInfo {
    /// SIC code.
    pub sic: Option<String>,
    /// SIC description.
    pub description: Option<String>,
}

impl IndustryInfo {
    /// Creates industry info from an SIC code and description.
    #[must_use]
    pub fn new(sic: Option<String>, description: Option<String>) -> Self {
        Self { sic, description }
    }

    /// Returns the benchmark key for this industry, or `None` if unclassified.
    #[must_use]
    pub fn benchmark_key(
        &self,
        statement: StatementKind,
        period: PeriodKind,
    ) -> Option<BenchmarkKey> {
        let sic = self.sic.as_deref()?.trim();
        if sic.is_empty() {
            return None;
        }
        Some(BenchmarkKey::new(sic, statement, period))
    }
}

/// Key identifying a cached benchmark and its job.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BenchmarkKey {
    /// Industry (SIC) code.
    pub industry: String,
    /// Statement kind.
    pub statement: StatementKind,
    /// Period kind.
    pub period: PeriodKind,
}

impl BenchmarkKey {
    /// Creates a new benchmark key.
    #[must_use]
    pub fn new(industry: impl Into<String>, statement: StatementKind, period: PeriodKind) -> Self {
        Self {
            industry: industry.into(),
            statement,
            period,
        }
    }
}

impl fmt::Display for BenchmarkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.industry, self.statement, self.period)
    }
}

/// Cached industry-average ratios.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndustryBenchmark {
    /// One ratio per statement line.
    pub ratios: Vec<Option<f64>>,
    /// Number of peers that contributed.
    pub peer_count: usize,
    /// Line count of the layout the ratios were computed for.
    pub line_count: usize,
    /// When the benchmark was written.
    pub updated_at: DateTime<Utc>,
}

impl IndustryBenchmark {
    /// Returns true if the benchmark is older than `ttl`.
    ///
    /// A zero TTL disables expiry.
    #[must_use]
    pub fn is_stale(&self, ttl: Duration) -> bool {
        if ttl.is_zero() {
            return false;
        }
        let age = Utc::now().signed_duration_since(self.updated_at);
        age > chrono::TimeDelta::from_std(ttl).unwrap_or(chrono::TimeDelta::MAX)
    }

    /// Checks the stored shape against the caller's layout.
    ///
    /// # Errors
    /// Returns [`CommonSizeError::SchemaMismatch`] if either the recorded line
    /// count or the ratio vector length differs from `expected`.
    pub fn check_schema(&self, expected: usize) -> Result<()> {
        if self.line_count != expected || self.ratios.len() != expected {
            return Err(CommonSizeError::SchemaMismatch {
                expected,
                stored: self.line_count,
            });
        }
        Ok(())
    }
}

/// Lifecycle status of a benchmark job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting to be claimed.
    Pending,
    /// Claimed by a worker.
    Running,
    /// Benchmark computed and stored.
    Succeeded,
    /// Processing failed; see the job error.
    Failed,
}

impl JobStatus {
    /// Returns the storage name of this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Returns true for `Succeeded` and `Failed`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = CommonSizeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            other => Err(CommonSizeError::Parse(format!("Invalid job status: {other}"))),
        }
    }
}

/// A queued benchmark computation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkJob {
    /// Benchmark the job computes.
    pub key: BenchmarkKey,
    /// Company whose statement anchors the computation.
    pub subject: CompanyRef,
    /// Maximum number of peers to fetch.
    pub max_peers: usize,
    /// Current status.
    pub status: JobStatus,
    /// When the job was (re)queued.
    pub queued_at: DateTime<Utc>,
    /// When a worker claimed the job.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
    /// Number of times the job was claimed.
    pub attempts: u32,
    /// Last failure message.
    pub error: Option<String>,
}

impl BenchmarkJob {
    /// Creates a pending job queued now.
    #[must_use]
    pub fn pending(key: BenchmarkKey, subject: CompanyRef, max_peers: usize) -> Self {
        Self {
            key,
            subject,
            max_peers,
            status: JobStatus::Pending,
            queued_at: Utc::now(),
            started_at: None,
            finished_at: None,
            attempts: 0,
            error: None,
        }
    }
}
