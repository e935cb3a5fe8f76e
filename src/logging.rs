//! Logging bootstrap and the diagnostics channel.

use crate::config::OrganizerConfig;

/// Install the rolling file logger when a log directory is configured
pub fn init_logging(config: &OrganizerConfig) -> Result<(), String> {
    match &config.log_dir {
        Some(dir) => rolling_logger::init_logger(dir.clone(), &config.app_name),
        None => Ok(()),
    }
}

/// Record a broken internal invariant. Never shown to the user.
pub fn report_invariant(message: &str) {
    let line = format!("Invariant violation: {}", message);
    // Without the rolling logger the log facade is the only sink
    if rolling_logger::error(&line).is_err() {
        log::error!("{}", line);
    }
}
