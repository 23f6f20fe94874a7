//! Provider traits for fetching reported facts.
//!
//! This module defines the external collaborators the engine consumes:
//!
//! - [`DataProvider`] - Base trait for all providers
//! - [`FactProvider`] - Entity resolution, company facts and peer facts
//! - [`IndustryClassifier`] - Industry code lookup

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::Result,
    types::{CompanyRef, FactBag, IndustryInfo},
};

/// Base trait for all data providers.
pub trait DataProvider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g., "SEC EDGAR").
    fn name(&self) -> &str;

    /// Returns a description of this provider.
    fn description(&self) -> &str;
}

/// Facts fetched for the peers of a subject company.
#[derive(Clone, Debug, Default)]
pub struct PeerFacts {
    /// Industry the peers were selected from.
    pub industry: IndustryInfo,
    /// Peers whose facts were fetched successfully.
    pub peers: Vec<CompanyRef>,
    /// Fact bags, aligned with `peers`.
    pub fact_sets: Vec<FactBag>,
}

/// Provider for reported company facts.
///
/// Any failure is treated as non-retryable for that call.
#[async_trait]
pub trait FactProvider: DataProvider {
    /// Resolves a ticker symbol or CIK to a company reference.
    ///
    /// Returns [`CommonSizeError::UnknownEntity`](crate::CommonSizeError::UnknownEntity)
    /// if the identifier cannot be resolved.
    async fn resolve_entity(&self, ticker_or_cik: &str) -> Result<CompanyRef>;

    /// Fetches all reported facts for a company.
    async fn fetch_facts(&self, cik: &str) -> Result<FactBag>;

    /// Fetches facts for up to `max_peers` companies in the subject's industry.
    ///
    /// Peers whose facts cannot be fetched are left out of the result.
    async fn fetch_peer_facts(&self, cik: &str, max_peers: usize) -> Result<PeerFacts>;
}

/// Looks up the industry classification of a company.
#[async_trait]
pub trait IndustryClassifier: DataProvider {
    /// Returns the industry of the company identified by `cik`.
    async fn industry(&self, cik: &str) -> Result<IndustryInfo>;
}
