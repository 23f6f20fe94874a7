//! Tracing subscriber setup.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, for workers running unattended.
    Json,
    /// Human-readable multi-line output.
    #[default]
    Pretty,
}

/// Installs the global tracing subscriber.
///
/// Levels come from `RUST_LOG` (e.g. `commonsize_cache=debug`), defaulting to
/// `info`. Only the first call has an effect.
///
/// ```rust
/// use commonsize::observability::{LogFormat, init_tracing};
///
/// init_tracing(LogFormat::Pretty);
/// ```
pub fn init_tracing(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(env_filter);

        // try_init: a host application may already own the global subscriber
        let installed = match format {
            LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
            LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        };
        if installed.is_ok() {
            tracing::debug!(?format, "Tracing initialised");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice() {
        init_tracing(LogFormat::Json);
        init_tracing(LogFormat::Pretty);
        tracing::info!(industry = "3571", "event after init");
    }
}
