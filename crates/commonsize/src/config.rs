//! Environment-driven configuration.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use commonsize_core::{CommonSizeError, DEFAULT_BENCHMARK_TTL, Result};

/// Default cache directory.
pub const DEFAULT_CACHE_DIR: &str = "./.commonsize-cache";
/// Default user agent sent to SEC.
pub const DEFAULT_USER_AGENT: &str = "Commonsize/0.1 (your_email@example.com)";
/// Default worker poll interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
/// Default number of peers behind an industry benchmark.
pub const DEFAULT_MAX_PEERS: usize = 5;

const DATABASE_FILE: &str = "industry_benchmarks.sqlite3";

/// Runtime configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommonSizeConfig {
    /// Directory holding the benchmark database.
    pub cache_dir: PathBuf,
    /// Benchmark time-to-live; zero disables expiry.
    pub benchmark_ttl: Duration,
    /// User agent sent with every SEC request.
    pub user_agent: String,
    /// Idle sleep between worker claim attempts.
    pub poll_interval: Duration,
    /// Peer ceiling for benchmark computations.
    pub max_peers: usize,
}

impl Default for CommonSizeConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            benchmark_ttl: DEFAULT_BENCHMARK_TTL,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_peers: DEFAULT_MAX_PEERS,
        }
    }
}

impl CommonSizeConfig {
    /// Reads configuration from `COMMONSIZE_*` environment variables.
    ///
    /// # Errors
    /// Returns [`CommonSizeError::InvalidParameter`] if a numeric variable does
    /// not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns [`CommonSizeError::InvalidParameter`] if a numeric variable does
    /// not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let cache_dir = lookup("COMMONSIZE_CACHE")
            .filter(|v| !v.trim().is_empty())
            .map_or(defaults.cache_dir, PathBuf::from);
        let user_agent = lookup("COMMONSIZE_USER_AGENT")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.user_agent);
        let benchmark_ttl = parse_var::<u64>(&lookup, "COMMONSIZE_INDUSTRY_CACHE_TTL")?
            .map_or(defaults.benchmark_ttl, Duration::from_secs);
        let poll_interval = parse_var::<u64>(&lookup, "COMMONSIZE_WORKER_POLL_MS")?
            .map_or(defaults.poll_interval, Duration::from_millis);
        let max_peers =
            parse_var::<usize>(&lookup, "COMMONSIZE_MAX_PEERS")?.unwrap_or(defaults.max_peers);

        Ok(Self {
            cache_dir,
            benchmark_ttl,
            user_agent,
            poll_interval,
            max_peers,
        })
    }

    /// Path of the benchmark database inside the cache directory.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.cache_dir.join(DATABASE_FILE)
    }

    /// Creates the cache directory and opens the benchmark store.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or the database
    /// cannot be opened.
    #[cfg(feature = "cache-sqlite")]
    pub fn open_store(&self) -> Result<commonsize_cache::SqliteStore> {
        create_dir(&self.cache_dir)?;
        Ok(commonsize_cache::SqliteStore::new(self.database_path())?.with_ttl(self.benchmark_ttl))
    }

    /// Builds an EDGAR provider with the configured user agent.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    #[cfg(feature = "edgar")]
    pub fn edgar_provider(&self) -> Result<commonsize_edgar::EdgarProvider> {
        commonsize_edgar::EdgarProvider::new(&self.user_agent)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>> {
    let Some(raw) = lookup(name).filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    raw.trim().parse().map(Some).map_err(|_| {
        CommonSizeError::InvalidParameter(format!("{name} must be a non-negative integer, got '{raw}'"))
    })
}

#[cfg(feature = "cache-sqlite")]
fn create_dir(dir: &std::path::Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        CommonSizeError::Store(format!("Failed to create {}: {e}", dir.display()))
    })
}
