#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/commonsize/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! SEC EDGAR fact provider.
//!
//! This crate provides access to SEC EDGAR data including:
//!
//! - CIK (Central Index Key) lookup from ticker symbols
//! - Company facts from the XBRL API
//! - SIC industry classification from company submissions
//! - Peer discovery by SIC code
//!
//! # Example
//!
//! ```no_run
//! use commonsize_core::{FactProvider, IndustryClassifier};
//! use commonsize_edgar::EdgarProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = EdgarProvider::new("MyApp/1.0 (contact@example.com)")?;
//!
//!     let company = provider.resolve_entity("AAPL").await?;
//!     let industry = provider.industry(&company.cik).await?;
//!     println!("{company}: SIC {:?}", industry.sic);
//!
//!     let facts = provider.fetch_facts(&company.cik).await?;
//!     println!("{} facts", facts.len());
//!
//!     Ok(())
//! }
//! ```

mod payload;

use async_trait::async_trait;
use commonsize_core::{
    CommonSizeError, CompanyRef, DataProvider, FactBag, FactProvider, IndustryClassifier,
    IndustryInfo, PeerFacts, Result,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tokio::time::{Instant, sleep};
use tracing::{debug, instrument, warn};

pub use payload::parse_company_facts;
use payload::{CompanyFactsResponse, CompanySubmissions, CompanyTickerInfo, TickerMap};

/// SEC EDGAR API base URL
const EDGAR_BASE_URL: &str = "https://data.sec.gov";

/// SEC company tickers URL
const COMPANY_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";

/// Default rate limit: 10 requests per second (SEC requirement)
const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(100);

const PROVIDER_NAME: &str = "SEC EDGAR";

/// Rate limiter to ensure we don't exceed SEC's rate limits
#[derive(Debug)]
struct RateLimiter {
    last_request: Instant,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Instant::now() - min_interval,
            min_interval,
        }
    }

    async fn wait(&mut self) {
        let elapsed = self.last_request.elapsed();
        if elapsed < self.min_interval {
            sleep(self.min_interval - elapsed).await;
        }
        self.last_request = Instant::now();
    }
}

/// SEC EDGAR fact provider and industry classifier.
///
/// Requests are rate limited per SEC requirements (max 10 requests/second).
/// The ticker file and SIC lookups are cached on the provider instance for its
/// lifetime.
#[derive(Debug)]
pub struct EdgarProvider {
    client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    tickers: OnceCell<TickerMap>,
    industries: RwLock<HashMap<String, IndustryInfo>>,
}

impl EdgarProvider {
    /// Create a new EDGAR provider with the specified user agent.
    ///
    /// The SEC requires identifying user agent headers. Format should be:
    /// "AppName/Version (contact@email.com)"
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CommonSizeError::Other(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client))
    }

    /// Create a new EDGAR provider with a custom HTTP client.
    ///
    /// The client must send an identifying user agent.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self::with_rate_limit(client, DEFAULT_RATE_LIMIT)
    }

    /// Create a provider with a custom minimum interval between requests.
    pub fn with_rate_limit(client: reqwest::Client, min_interval: Duration) -> Self {
        Self {
            client,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(min_interval))),
            tickers: OnceCell::new(),
            industries: RwLock::new(HashMap::new()),
        }
    }

    /// Fetches a JSON document, honoring the rate limit.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.rate_limiter.lock().await.wait().await;

        debug!("Fetching {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CommonSizeError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(CommonSizeError::RateLimited {
                provider: PROVIDER_NAME.to_string(),
                retry_after,
            });
        }
        if status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED {
            return Err(CommonSizeError::AuthenticationFailed(format!(
                "{PROVIDER_NAME} (HTTP {status} for {url})"
            )));
        }
        if !status.is_success() {
            return Err(CommonSizeError::Network(format!(
                "SEC request failed with status {status}: {url}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| CommonSizeError::Parse(format!("Failed to parse {url}: {e}")))
    }

    /// Returns the ticker file, downloading it on first use.
    async fn ticker_map(&self) -> Result<&TickerMap> {
        self.tickers
            .get_or_try_init(|| async {
                debug!("Fetching company tickers from SEC");
                let rows: HashMap<String, CompanyTickerInfo> =
                    self.get_json(COMPANY_TICKERS_URL).await?;
                let map = TickerMap::from_response(rows);
                debug!("Loaded {} tickers", map.len());
                Ok::<_, CommonSizeError>(map)
            })
            .await
    }

    /// Look up a company by ticker symbol.
    ///
    /// # Errors
    /// Returns [`CommonSizeError::UnknownEntity`] if the ticker is not listed.
    pub async fn lookup_ticker(&self, ticker: &str) -> Result<CompanyRef> {
        if ticker.trim().is_empty() {
            return Err(CommonSizeError::InvalidParameter("Empty ticker".to_string()));
        }
        self.ticker_map()
            .await?
            .get(ticker.trim())
            .cloned()
            .ok_or_else(|| {
                CommonSizeError::UnknownEntity(format!(
                    "Unknown ticker symbol '{}'.",
                    ticker.trim().to_uppercase()
                ))
            })
    }

    async fn fetch_company_facts(&self, cik: &str) -> Result<CompanyFactsResponse> {
        let url = format!(
            "{}/api/xbrl/companyfacts/CIK{:0>10}.json",
            EDGAR_BASE_URL,
            cik.trim()
        );
        self.get_json(&url).await
    }

    async fn fetch_company_submissions(&self, cik: &str) -> Result<CompanySubmissions> {
        let url = format!("{}/submissions/CIK{:0>10}.json", EDGAR_BASE_URL, cik.trim());
        self.get_json(&url).await
    }

    /// Returns the industry for a zero-padded CIK, consulting the cache first.
    async fn cached_industry(&self, cik: &str) -> Result<IndustryInfo> {
        if let Some(industry) = self.industries.read().await.get(cik) {
            return Ok(industry.clone());
        }
        let industry = IndustryInfo::from(self.fetch_company_submissions(cik).await?);
        self.industries
            .write()
            .await
            .insert(cik.to_string(), industry.clone());
        Ok(industry)
    }

    /// Finds up to `max_peers` listed companies sharing the subject's SIC code.
    ///
    /// Candidates are scanned in ticker-file order; candidates whose
    /// classification cannot be fetched are skipped.
    ///
    /// # Errors
    /// Returns an error if the subject's classification or the ticker file
    /// cannot be fetched.
    #[instrument(skip(self))]
    pub async fn find_industry_peers(
        &self,
        cik: &str,
        max_peers: usize,
    ) -> Result<(IndustryInfo, Vec<CompanyRef>)> {
        let subject = resolve_cik(cik)?;
        let industry = self.cached_industry(&subject).await?;
        let Some(sic) = industry.sic.clone() else {
            debug!("Subject has no SIC code");
            return Ok((industry, Vec::new()));
        };
        if max_peers == 0 {
            return Ok((industry, Vec::new()));
        }

        let mut peers = Vec::new();
        let mut seen = HashSet::from([subject.clone()]);
        for candidate in self.ticker_map().await?.companies() {
            if !seen.insert(candidate.cik.clone()) {
                continue;
            }
            match self.cached_industry(&candidate.cik).await {
                Ok(info) if info.sic.as_deref() == Some(sic.as_str()) => {
                    peers.push(candidate.clone());
                    if peers.len() >= max_peers {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) if e.is_provider_error() => {
                    debug!(peer = %candidate, error = %e, "Skipping peer candidate");
                }
                Err(e) => return Err(e),
            }
        }

        debug!(sic = %sic, found = peers.len(), "Found industry peers");
        Ok((industry, peers))
    }
}

/// Zero-pads a numeric CIK.
fn resolve_cik(cik: &str) -> Result<String> {
    let cik = cik.trim();
    if cik.is_empty() || cik.len() > 10 || !cik.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CommonSizeError::InvalidParameter(format!(
            "Invalid CIK '{cik}'"
        )));
    }
    Ok(format!("{cik:0>10}"))
}

impl DataProvider for EdgarProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn description(&self) -> &str {
        "SEC EDGAR company facts and SIC classification from 10-K and 10-Q filings"
    }
}

#[async_trait]
impl FactProvider for EdgarProvider {
    async fn resolve_entity(&self, ticker_or_cik: &str) -> Result<CompanyRef> {
        let candidate = ticker_or_cik.trim().to_uppercase();
        if !candidate.is_empty()
            && candidate.len() <= 10
            && candidate.bytes().all(|b| b.is_ascii_digit())
        {
            return Ok(CompanyRef::new(candidate.clone(), candidate, ""));
        }
        self.lookup_ticker(&candidate).await
    }

    #[instrument(skip(self))]
    async fn fetch_facts(&self, cik: &str) -> Result<FactBag> {
        let cik = resolve_cik(cik)?;
        let facts: FactBag = self.fetch_company_facts(&cik).await?.into();
        debug!(tags = facts.tag_count(), facts = facts.len(), "Fetched company facts");
        Ok(facts)
    }

    #[instrument(skip(self))]
    async fn fetch_peer_facts(&self, cik: &str, max_peers: usize) -> Result<PeerFacts> {
        let (industry, candidates) = self.find_industry_peers(cik, max_peers).await?;

        let mut result = PeerFacts {
            industry,
            ..Default::default()
        };
        for peer in candidates {
            match self.fetch_facts(&peer.cik).await {
                Ok(facts) => {
                    result.peers.push(peer);
                    result.fact_sets.push(facts);
                }
                Err(e) => {
                    warn!(peer = %peer, error = %e, "Failed to fetch peer facts");
                }
            }
        }
        Ok(result)
    }
}

#[async_trait]
impl IndustryClassifier for EdgarProvider {
    #[instrument(skip(self))]
    async fn industry(&self, cik: &str) -> Result<IndustryInfo> {
        let cik = resolve_cik(cik)?;
        self.cached_industry(&cik).await
    }
}
