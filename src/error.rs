//! Error types for anime-resolve.
//!
//! Only [`ResolveError`] ever reaches a caller of `resolve`. Source and
//! configuration errors are absorbed where they occur and degrade the
//! affected feature to "absent".

use std::path::PathBuf;

/// Errors returned to callers of the resolver entry point.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The request was rejected before any I/O took place.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The HTTP client for this call could not be built.
    #[error("http client error: {0}")]
    Client(String),

    /// The blocking entry point could not start its runtime.
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Failure of a single source call. Never propagated out of `resolve`.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SourceError {
    /// The call did not finish within its deadline.
    #[error("request timed out")]
    Timeout,

    /// Transport-level failure (connect, TLS, body read).
    #[error("network error: {0}")]
    Network(String),

    /// The source answered with a non-success status.
    #[error("HTTP error: {0}")]
    HttpStatus(u16),

    /// The response body could not be understood.
    #[error("parse error: {0}")]
    Parse(String),

    /// The source implementation panicked.
    #[error("source panicked")]
    Panicked,
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else if let Some(status) = err.status() {
            SourceError::HttpStatus(status.as_u16())
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(err.to_string())
    }
}

/// Errors raised while loading settings or data files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to parse JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid setting: {0}")]
    Invalid(String),
}
