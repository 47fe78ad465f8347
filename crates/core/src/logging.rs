//! Logging initialization.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Filter used when neither `RUST_LOG` nor the config provides one.
pub const DEFAULT_LOG_FILTER: &str = "info,viewer=debug";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `default_filter`; an unparsable default falls back
/// to [`DEFAULT_LOG_FILTER`].
///
/// # Example
/// ```no_run
/// viewer_core::init_logging("info");
/// tracing::info!("Viewer starting");
/// ```
pub fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .try_init();
}
