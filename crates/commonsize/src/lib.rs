#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/commonsize/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Common-size statements with cached industry benchmarks.
//!
//! This crate ties the pieces together: it re-exports the core types, the
//! statement engine and the stores, and adds
//!
//! - [`StatementService`] - resolve, build and attach a benchmark in one call
//! - [`BenchmarkQueue`] - enqueue, claim and process benchmark jobs
//! - [`run_worker`] / [`spawn_worker`] - background job processing
//! - [`CommonSizeConfig`] - `COMMONSIZE_*` environment configuration
//! - [`observability`] - tracing subscriber setup

// Core types and traits
pub use commonsize_core::*;

// Statement engine
pub use commonsize_engine::{
    CommonSizeStatement, apply_industry_average, build_statement, layout, layout_for,
};

// Stores
pub use commonsize_cache::InMemoryStore;
#[cfg(feature = "cache-sqlite")]
pub use commonsize_cache::SqliteStore;

// Providers
#[cfg(feature = "edgar")]
pub use commonsize_edgar::{EdgarProvider, parse_company_facts};

mod config;
mod jobs;
pub mod observability;
mod service;
mod worker;

pub use config::CommonSizeConfig;
pub use jobs::{BenchmarkQueue, BenchmarkReadiness};
pub use service::{BenchmarkMode, BenchmarkSource, StatementReport, StatementService};
pub use worker::{WorkerHandle, run_worker, spawn_worker};

#[cfg(test)]
mod testing;
