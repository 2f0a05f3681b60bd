use tracing_subscriber::EnvFilter;

/// Environment variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "AIRLOG_LOG";

const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Default filter for a verbosity offset from `info`.
pub fn default_level(verbosity: i8) -> &'static str {
    let index = (2 + i16::from(verbosity)).clamp(0, LEVELS.len() as i16 - 1);
    LEVELS[index as usize]
}

fn filter(verbosity: i8) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbosity)))
}

/// Install the global subscriber. Logs go to stderr so that command output
/// on stdout stays machine readable.
pub fn init(verbosity: i8) {
    tracing_subscriber::fmt()
        .with_env_filter(filter(verbosity))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
