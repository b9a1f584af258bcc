//! Logging bootstrap.
//!
//! Log lines go to stderr in `event=... key=value` form and carry metadata
//! only: IDs, counts, statuses. Expense names and amounts are never logged.

use flexi_logger::{Logger, LoggerHandle};
use log::debug;
use std::sync::OnceLock;

/// Default level when neither `--verbose` nor a spec is given.
pub const DEFAULT_LEVEL: &str = "warn";
/// Level used by `--verbose`.
pub const VERBOSE_LEVEL: &str = "debug";

static LOGGER: OnceLock<LoggerHandle> = OnceLock::new();

/// Pick the log spec: an explicit spec wins, then `--verbose`, then the default.
pub fn resolve_level(spec: Option<&str>, verbose: bool) -> &str {
    match spec.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ if verbose => VERBOSE_LEVEL,
        _ => DEFAULT_LEVEL,
    }
}

/// Start the stderr logger. Repeated calls are no-ops.
///
/// # Errors
/// Returns a message when the spec cannot be parsed or the backend fails
/// to start. Never panics.
pub fn init_logging(spec: &str) -> Result<(), String> {
    if LOGGER.get().is_some() {
        return Ok(());
    }

    let handle = Logger::try_with_str(spec)
        .map_err(|err| format!("invalid log spec `{spec}`: {err}"))?
        .log_to_stderr()
        .format(flexi_logger::default_format)
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))?;

    // Lost race: another caller already installed a logger.
    let _ = LOGGER.set(handle);

    debug!(
        "event=app_start module=logging status=ok level={} version={}",
        spec,
        env!("CARGO_PKG_VERSION")
    );
    Ok(())
}
