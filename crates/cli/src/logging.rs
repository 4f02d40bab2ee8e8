//! Logging setup
//!
//! Logs go to stderr so stdout carries only the spawn report.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log format environment variable (`pretty` or `json`)
pub const ENV_LOG_FORMAT: &str = "FASTSPAWN_LOG_FORMAT";

const DEFAULT_FILTER: &str = "warn,fastspawn_core=info,fastspawn_infra_system=info,fastspawn=info";

/// Initialize the global tracing subscriber
///
/// # Environment Variables
///
/// - `RUST_LOG`: filter directives (default: info for fastspawn crates)
/// - `FASTSPAWN_LOG_FORMAT`: `json` for structured output, anything else for pretty
pub fn init(verbose: bool) {
    let log_format = std::env::var(ENV_LOG_FORMAT).unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new(DEFAULT_FILTER.replace("=info", "=debug"))
            } else {
                EnvFilter::try_new(DEFAULT_FILTER)
            }
        })
        .expect("Failed to create env filter");

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
