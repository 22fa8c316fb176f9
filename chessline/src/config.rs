//! Runtime configuration for chessline.
//!
//! Every tunable has a compile-time default and can be overridden through a
//! dedicated environment variable. Command-line flags take precedence over
//! both (see `main.rs`).

use std::path::PathBuf;
use std::time::Duration;

use engine::session::store::{DEFAULT_LINE_COUNT, DEFAULT_SEARCH_DEPTH};

/// Default time the engine has to complete the handshake (in seconds).
const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 10;

/// Get an explicitly configured engine executable.
///
/// Priority:
/// 1. `CHESSLINE_ENGINE_PATH` env variable if set
/// 2. `None`, meaning the engine is searched for in common locations
pub fn get_engine_path() -> Option<PathBuf> {
    std::env::var_os("CHESSLINE_ENGINE_PATH").map(PathBuf::from)
}

/// Get the search depth for `go depth`.
///
/// Priority:
/// 1. `CHESSLINE_DEPTH` env variable if set (falls back to the default if it
///    cannot be parsed)
/// 2. `22`
pub fn get_search_depth() -> u32 {
    parse_or(std::env::var("CHESSLINE_DEPTH").ok(), DEFAULT_SEARCH_DEPTH)
}

/// Get the number of ranked lines (`MultiPV`).
///
/// Priority:
/// 1. `CHESSLINE_LINES` env variable if set (falls back to the default if it
///    cannot be parsed)
/// 2. `3`
pub fn get_line_count() -> u32 {
    parse_or(std::env::var("CHESSLINE_LINES").ok(), DEFAULT_LINE_COUNT)
}

/// Get the handshake timeout.
///
/// Priority:
/// 1. `CHESSLINE_HANDSHAKE_TIMEOUT_SECS` env variable if set
/// 2. `10` seconds
pub fn get_handshake_timeout() -> Duration {
    Duration::from_secs(parse_or(
        std::env::var("CHESSLINE_HANDSHAKE_TIMEOUT_SECS").ok(),
        DEFAULT_HANDSHAKE_TIMEOUT_SECS,
    ))
}

/// Get the directory for rolling log files.
///
/// When unset, logs go to stderr.
pub fn get_log_dir() -> Option<PathBuf> {
    std::env::var_os("CHESSLINE_LOG_DIR").map(PathBuf::from)
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
