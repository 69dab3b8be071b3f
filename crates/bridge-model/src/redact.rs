//! Process-wide switch for logging record content.
//!
//! Every stage that logs something derived from a record (rule diagnostics,
//! mapper panics, outcome details) passes it through [`redact_value`]. The
//! switch is off until the host enables it, usually through the engine's
//! logging setup.

use std::sync::atomic::{AtomicBool, Ordering};

static LOG_DATA_ENABLED: AtomicBool = AtomicBool::new(false);

/// Placeholder used when record-level logging is disabled.
pub const REDACTED_VALUE: &str = "[REDACTED]";

/// Allows or forbids record content in log output.
pub fn set_log_data_enabled(enabled: bool) {
    LOG_DATA_ENABLED.store(enabled, Ordering::Release);
}

/// Returns true if record-level logging is explicitly enabled.
pub fn log_data_enabled() -> bool {
    LOG_DATA_ENABLED.load(Ordering::Acquire)
}

/// Returns the input value when record logging is enabled, otherwise a redacted token.
pub fn redact_value(value: &str) -> &str {
    if log_data_enabled() {
        value
    } else {
        REDACTED_VALUE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redaction_follows_switch() {
        assert_eq!(redact_value("123-45-6789"), REDACTED_VALUE);
        set_log_data_enabled(true);
        assert_eq!(redact_value("123-45-6789"), "123-45-6789");
        set_log_data_enabled(false);
        assert_eq!(redact_value("123-45-6789"), REDACTED_VALUE);
    }
}
