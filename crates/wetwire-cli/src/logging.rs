//! Log setup
//!
//! Logs go to stderr so reports on stdout stay machine-readable.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Env var read before `RUST_LOG`
pub(crate) const LOG_ENV: &str = "WETWIRE_LOG";

fn filter(verbose: u8) -> EnvFilter {
    match verbose {
        0 => EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    }
}

/// Install the global subscriber
pub(crate) fn init(verbose: u8, json: bool) {
    let registry = tracing_subscriber::registry().with(filter(verbose));
    let installed = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
    if let Err(err) = installed {
        eprintln!("warning: logging already initialized: {err}");
    }
}
