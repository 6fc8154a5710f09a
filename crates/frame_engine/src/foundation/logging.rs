//! Logging setup

pub use log::{debug, error, info, trace, warn};

/// Initialize `env_logger`
///
/// `RUST_LOG` wins when set; otherwise `level` applies to every module.
/// Calling this twice keeps the first logger.
pub fn init(level: log::LevelFilter) {
    let env = env_logger::Env::default().default_filter_or(level.to_string());
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}
