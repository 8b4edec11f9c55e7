//! Environment variable utilities
//!
//! Every knob in the workspace is read through these helpers so that a
//! missing or malformed variable silently falls back to the built-in default.
//!
//! ```ignore
//! use bytestack_core::env::{env_get, env_get_bool};
//!
//! let iterations: usize = env_get("BSTACK_BENCH_ITERATIONS", 256);
//! let stop: bool = env_get_bool("BSTACK_BENCH_STOP_ON_ERROR", false);
//! ```

use std::str::FromStr;

/// Parse `key` as `T`, or return `default` if unset or unparsable
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Parse `key` as `T`; `None` if unset or unparsable
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Read `key` as a boolean
///
/// `1|true|yes|on` and `0|false|no|off` (any case) are recognized; anything
/// else, including unset, gives `default`.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(default)
}

/// Read `key` as a string, or `default` if unset
#[inline]
pub fn env_get_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[inline]
pub fn env_is_set(key: &str) -> bool {
    std::env::var_os(key).is_some()
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
