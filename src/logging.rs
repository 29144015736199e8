//! Logger setup shared by the binaries

use env_logger::{Builder, Env};

/// Filter used when `RUST_LOG` is not set; stream warnings stay visible.
pub const DEFAULT_FILTER: &str = "warn";

/// Logger builder reading its filter from `env`, falling back to
/// [`DEFAULT_FILTER`].
pub fn log_builder(env: Env<'_>) -> Builder {
    Builder::from_env(env.default_filter_or(DEFAULT_FILTER))
}

/// Install the logger for a binary.
pub fn init() {
    log_builder(Env::default()).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_shows_warnings() {
        let logger = log_builder(Env::new().filter("SCOPE_TAPS_TEST_UNSET_FILTER")).build();
        assert_eq!(logger.filter(), log::LevelFilter::Warn);
    }

    #[test]
    fn test_env_filter_overrides_default() {
        std::env::set_var("SCOPE_TAPS_TEST_DEBUG_FILTER", "debug");
        let logger = log_builder(Env::new().filter("SCOPE_TAPS_TEST_DEBUG_FILTER")).build();
        assert_eq!(logger.filter(), log::LevelFilter::Debug);
    }
}
