//! Process logging bootstrap.
//!
//! Logs go to stderr; stdout is reserved for the JSON-lines protocol.
//! Initialization is idempotent and never panics.

use flexi_logger::{Logger, LoggerHandle, WriteMode};
use log::info;
use once_cell::sync::OnceCell;

pub const LOG_LEVEL_ENV: &str = "PLANBOOKD_LOG";

static LOGGER: OnceCell<LoggerHandle> = OnceCell::new();

/// Starts the stderr logger at the level named by `PLANBOOKD_LOG`, falling
/// back to `info` when the variable is unset or unrecognized.
pub fn init_from_env() -> Result<(), String> {
    let raw = std::env::var(LOG_LEVEL_ENV).unwrap_or_default();
    let level = normalize_level(&raw).unwrap_or("info");
    init_logging(level)
}

pub fn init_logging(level: &str) -> Result<(), String> {
    let level = normalize_level(level)?;
    if LOGGER.get().is_some() {
        return Ok(());
    }
    LOGGER.get_or_try_init(|| -> Result<LoggerHandle, String> {
        let handle = Logger::try_with_str(level)
            .map_err(|err| format!("invalid log level `{level}`: {err}"))?
            .log_to_stderr()
            .write_mode(WriteMode::Direct)
            .format(flexi_logger::detailed_format)
            .start()
            .map_err(|err| format!("failed to start logger: {err}"))?;
        info!(
            "event=app_start status=ok version={} level={}",
            env!("CARGO_PKG_VERSION"),
            level
        );
        Ok(handle)
    })?;
    Ok(())
}

fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        "off" => Ok("off"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error|off"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_normalize() {
        assert_eq!(normalize_level(" WARNING "), Ok("warn"));
        assert_eq!(normalize_level("debug"), Ok("debug"));
        assert!(normalize_level("loud").is_err());
        assert!(normalize_level("").is_err());
    }
}
