//! Tracing/logging initialization.
//!
//! JSON lines on stdout. Filtering follows `RUST_LOG`, falling back to
//! [`DEFAULT_FILTER`].

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info";

/// Filter from `RUST_LOG`, or `fallback` when unset or unparsable.
pub fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with_default(DEFAULT_FILTER);
}

/// Like [`init`], with a caller-chosen fallback filter
/// (e.g. `"forgehr_ai=debug,info"`).
pub fn init_with_default(fallback: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(fallback))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .with_current_span(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_a_no_op() {
        init();
        init_with_default("debug");
        ::tracing::info!(component = "observability", "still logging");
    }
}
