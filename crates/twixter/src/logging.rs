//! Tracing subscriber setup for binaries and jobs embedding twixter.
//!
//! The library itself only emits `tracing` events. Hosts that have their own
//! subscriber should skip this module entirely.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparseable.
pub const DEFAULT_FILTER: &str = "twixter=info";

/// Build the filter from `RUST_LOG`, falling back to `default`.
pub fn env_filter(default: &str) -> EnvFilter {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(default),
    }
}

/// Install a global fmt subscriber.
///
/// Returns `false` if a global subscriber was already set, which leaves the
/// existing one in place.
pub fn init_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(DEFAULT_FILTER))
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        let filter = EnvFilter::new(DEFAULT_FILTER);
        assert_eq!(filter.to_string(), DEFAULT_FILTER);
    }

    #[test]
    fn test_env_filter_builds_with_custom_default() {
        let filter = env_filter("twixter=debug");
        assert!(!filter.to_string().is_empty());
    }
}
