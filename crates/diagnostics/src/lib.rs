//! Simple diagnostics library for the ilastik viewer client
//!
//! Provides lightweight, configurable logging across all crates in the
//! project.
//!
//! Usage:
//! - Set ILASTIK_LOG=off (default) - no logs
//! - Set ILASTIK_LOG=info - basic operation logs
//! - Set ILASTIK_LOG=debug - detailed diagnostic logs

use std::sync::Once;

// Re-export emit so macros can use it
pub use emit;

/// Environment variable controlling the log level.
pub const LOG_ENV_VAR: &str = "ILASTIK_LOG";

/// Level used when the variable is unset. The viewer runs embedded in a
/// browser host, so logging is opt-in.
pub const DEFAULT_LEVEL: &str = "off";

static INIT: Once = Once::new();

fn parse_level(value: &str) -> Option<emit::Level> {
    match value {
        "debug" => Some(emit::Level::Debug),
        "info" => Some(emit::Level::Info),
        "warn" => Some(emit::Level::Warn),
        "error" => Some(emit::Level::Error),
        _ => None,
    }
}

/// Initialize diagnostics based on the ILASTIK_LOG environment variable
///
/// This should be called once at application startup. It's safe to call
/// multiple times - subsequent calls will be ignored.
pub fn init_diagnostics() {
    INIT.call_once(|| {
        let requested = std::env::var(LOG_ENV_VAR).unwrap_or_else(|_| DEFAULT_LEVEL.to_string());
        if requested == "off" {
            return;
        }

        let level = match parse_level(&requested) {
            Some(level) => level,
            None => {
                // Bootstrap warning - shows even for an unknown level
                eprintln!("Warning: Unknown {LOG_ENV_VAR} value '{requested}', using 'info'");
                emit::Level::Info
            }
        };

        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(level))
            .init();

        // The emit runtime must stay alive for the whole process
        std::mem::forget(rt);
    });
}

/// Log basic operations (session creation, metadata fetches, view changes)
///
/// Use this for operations that users might want to see in normal usage.
/// Examples: "Session ready", "Fetched dataset info", "Resolved view"
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        use $crate::emit;
        emit::info!($($arg)*)
    }};
}

/// Log detailed diagnostics (probe outcomes, stale discards, url parses)
///
/// Use this for detailed information useful for debugging.
/// Examples: "Predictions probe missed", "Discarding stale resolution"
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        use $crate::emit;
        emit::debug!($($arg)*)
    }};
}

/// Log warning conditions (config issues, fallbacks, recoverable errors)
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        use $crate::emit;
        emit::warn!($($arg)*)
    }};
}

/// Log critical error conditions (failed fetches, contract violations)
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{
        use $crate::emit;
        emit::error!($($arg)*)
    }};
}
