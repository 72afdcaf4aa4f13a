//! Centralized error types for faultline using thiserror.
//!
//! Each concern gets its own small enum; the capture entry points fold
//! collaborator failures into [`CaptureError`]. Transport failures against
//! the remote collector are deliberately absent here: they are recovered
//! per-endpoint inside the transport and never surface to callers.

use thiserror::Error;

/// Errors related to configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load config file: {0}")]
    LoadError(String),
    #[error("invalid configuration: {0}")]
    ValidationError(String),
    #[error("invalid remote endpoint '{url}': {message}")]
    InvalidEndpoint { url: String, message: String },
}

/// Errors raised by a filter in the configured chain.
///
/// The pipeline never masks these: a failing filter aborts the capture
/// and the error reaches the caller.
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("filter failed: {0}")]
    Failed(String),
}

/// Errors from the shared counter store backing the thrashing limiter.
///
/// An increment can legitimately fail when the key expired between the
/// `add` and the `incr` (concurrent expiry). The limiter treats that as
/// count zero rather than failing the pipeline.
#[derive(Error, Debug)]
pub enum CounterError {
    #[error("counter key missing or expired: {0}")]
    Missing(String),
    #[error("counter store backend error: {0}")]
    Backend(String),
}

/// Errors from the local persistent grouped-message store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store operation failed: {0}")]
    Failed(String),
}

/// Errors surfaced by the capture entry points.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// `capture_exception` was called without an exception and no
    /// last-exception source is configured (or it has nothing to offer).
    #[error("no active exception to capture")]
    NoActiveException,
    #[error("filter error: {0}")]
    Filter(#[from] FilterError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::LoadError("file not found".to_string());
        assert_eq!(
            err.to_string(),
            "failed to load config file: file not found"
        );

        let err = ConfigError::InvalidEndpoint {
            url: "ht!tp://bad".to_string(),
            message: "relative URL without a base".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid remote endpoint 'ht!tp://bad': relative URL without a base"
        );
    }

    #[test]
    fn filter_error_display() {
        let err = FilterError::Failed("boom".to_string());
        assert_eq!(err.to_string(), "filter failed: boom");
    }

    #[test]
    fn counter_error_display() {
        let err = CounterError::Missing("faultline:TypeError:abc".to_string());
        assert_eq!(
            err.to_string(),
            "counter key missing or expired: faultline:TypeError:abc"
        );
    }

    #[test]
    fn capture_error_wraps_collaborator_errors() {
        let err = CaptureError::from(FilterError::Failed("bad event".to_string()));
        assert_eq!(err.to_string(), "filter error: filter failed: bad event");

        let err = CaptureError::from(StoreError::Failed("disk full".to_string()));
        assert_eq!(
            err.to_string(),
            "store error: store operation failed: disk full"
        );

        let err = CaptureError::NoActiveException;
        assert_eq!(err.to_string(), "no active exception to capture");
    }
}
