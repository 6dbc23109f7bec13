use crate::config::LogLevel;

/// Installs `env_logger` at `level`. `RUST_LOG` still takes precedence.
///
/// Returns `false` when a logger was already installed, which is harmless:
/// hosts embedding the view often bring their own.
pub fn init(level: LogLevel) -> bool {
    let filter: log::LevelFilter = level.into();
    env_logger::Builder::new()
        .filter_level(filter)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}
