use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log level for a given number of `-v` and `-q` flags, starting from `info`
pub fn level_for(verbose: u8, quiet: u8) -> &'static str {
    const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
    let index = (2 + i16::from(verbose) - i16::from(quiet)).clamp(0, 4);
    LEVELS[index as usize]
}

/// Install the global subscriber. `RUST_LOG` wins over the flag-derived level.
///
/// Logs go to stderr so the status lines on stdout stay readable when piped.
pub fn init_logging(verbose: u8, quiet: u8) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(verbose, quiet)));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_info() {
        assert_eq!(level_for(0, 0), "info");
    }

    #[test]
    fn test_flags_shift_level() {
        assert_eq!(level_for(1, 0), "debug");
        assert_eq!(level_for(2, 0), "trace");
        assert_eq!(level_for(0, 1), "warn");
        assert_eq!(level_for(1, 1), "info");
    }

    #[test]
    fn test_level_is_clamped() {
        assert_eq!(level_for(9, 0), "trace");
        assert_eq!(level_for(0, 9), "error");
    }
}
