//! Shared utility functions for common operations.

use std::fmt::Display;

/// Filter an iterator of Results, logging errors at debug level before discarding.
///
/// Use this instead of `.filter_map(|r| r.ok())` when you want visibility into
/// what errors are being discarded.
///
/// # Example
/// ```ignore
/// let entries: Vec<_> = walker
///     .filter_map(|r| log_filter_error(r, "walking project tree"))
///     .collect();
/// ```
pub fn log_filter_error<T, E: Display>(result: Result<T, E>, context: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::debug!("{}: {}", context, e);
            None
        }
    }
}

/// Like log_filter_error but logs at warn level for more important operations.
pub fn log_filter_warn<T, E: Display>(result: Result<T, E>, context: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("{}: {}", context, e);
            None
        }
    }
}
