//! Shared tracing/logging initialization.
//!
//! The server binary and any future tooling set up `tracing_subscriber` the
//! same way: an env-filter plus optional JSON output.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Build the filter directive used when `RUST_LOG` is not set.
///
/// `log_level` comes from configuration (e.g. `"debug"`); it is scoped to the
/// given crate targets so dependency noise stays at `warn`.
pub fn default_filter(targets: &[&str], log_level: &str) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(targets.iter().map(|t| format!("{t}={log_level}")));
    directives.join(",")
}

/// Initialise the global tracing subscriber.
///
/// * `default_filter` -- default `RUST_LOG` value when the env-var is not set
///   (e.g. `"repairdesk_server=info"`).
/// * `log_json` -- when `true`, emit structured JSON log lines instead of the
///   human-readable format.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
    );
    if log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_scopes_level_to_targets() {
        let filter = default_filter(&["repairdesk_server", "repairdesk_core"], "debug");
        assert_eq!(filter, "warn,repairdesk_server=debug,repairdesk_core=debug");
    }
}
