//! Shared tracing/logging initialization.
//!
//! The gateway sets up `tracing_subscriber` with an env-filter and optional
//! JSON output so session logs can be shipped to a structured aggregator.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Build the filter: `RUST_LOG` when set, otherwise `default_filter`.
fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Initialise the global tracing subscriber.
///
/// * `default_filter` -- default `RUST_LOG` value when the env-var is not set
///   (e.g. `"sanskara_gateway=info,sanskara_core=info"`).
/// * `log_json` -- when `true`, emit structured JSON log lines instead of the
///   human-readable format.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(default_filter: &str, log_json: bool) -> bool {
    let registry = tracing_subscriber::registry().with(env_filter(default_filter));
    if log_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()
            .is_ok()
    }
}

/// Filter string for a component at the given level, e.g. `"sanskara_gateway=debug"`.
pub fn component_filter(components: &[&str], level: &str) -> String {
    components
        .iter()
        .map(|c| format!("{c}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_filter_joins_targets() {
        assert_eq!(
            component_filter(&["sanskara_gateway", "sanskara_core"], "debug"),
            "sanskara_gateway=debug,sanskara_core=debug"
        );
    }

    #[test]
    fn second_init_is_reported() {
        let _ = init_tracing("warn", false);
        assert!(!init_tracing("warn", true));
    }
}
