#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/commonsize/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for common-size statements.
//!
//! This crate provides the foundational abstractions:
//!
//! - [`FactProvider`](provider::FactProvider) - Reported facts for companies and peers
//! - [`IndustryClassifier`](provider::IndustryClassifier) - Industry code lookup
//! - [`BenchmarkStore`](store::BenchmarkStore) - TTL cache of industry benchmarks
//! - [`JobStore`](store::JobStore) - Durable benchmark job queue

/// Error types for statement and benchmark operations.
pub mod error;
/// Period and statement kind definitions.
pub mod period;
/// Provider traits for fetching reported facts.
pub mod provider;
/// Store traits for benchmarks and jobs.
pub mod store;
/// Core data types (facts, lines, benchmarks, jobs).
pub mod types;

// Re-export commonly used items at crate root
pub use error::{CommonSizeError, Result};
pub use period::{PeriodKind, StatementKind};
pub use provider::{DataProvider, FactProvider, IndustryClassifier, PeerFacts};
pub use store::{
    BenchmarkStore, DEFAULT_BENCHMARK_TTL, EnqueueOutcome, JobStore, Store, validate_ratios,
};
pub use types::{
    BenchmarkJob, BenchmarkKey, CompanyRef, Fact, FactBag, IndustryBenchmark, IndustryInfo,
    JobStatus, LayoutEntry, StatementLine,
};
