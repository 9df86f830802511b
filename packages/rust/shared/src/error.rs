//! Error types for Firmscope.
//!
//! Library crates use [`FirmscopeError`] via `thiserror`.
//! App crates (cli/server) wrap this with `color-eyre` or map it to HTTP statuses.

use std::path::PathBuf;

/// Top-level error type for all Firmscope operations.
#[derive(Debug, thiserror::Error)]
pub enum FirmscopeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network failure on an outbound call (connect, reset, body read).
    #[error("transport error: {0}")]
    Transport(String),

    /// An outbound call or a whole run exceeded its deadline.
    #[error("timed out: {0}")]
    Timeout(String),

    /// A provider answered with a non-2xx status.
    #[error("{service} returned HTTP {status}: {body}")]
    UpstreamStatus {
        service: String,
        status: u16,
        body: String,
    },

    /// Model output that could not be parsed or failed schema validation.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Every attempt of a retry budget failed without a successful response.
    #[error("structured extraction failed after {attempts} attempts: {last_error}")]
    ExtractionFailed { attempts: u32, last_error: String },

    /// WebDriver / headless browser failure.
    #[error("render error: {0}")]
    Render(String),

    /// Input validation error (blank company name, bad URL, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FirmscopeError>;

impl FirmscopeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an upstream status error.
    pub fn upstream(service: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::UpstreamStatus {
            service: service.into(),
            status,
            body: body.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether repeating the same call might succeed.
    ///
    /// Network failures, timeouts and non-2xx statuses are transient;
    /// malformed model output and configuration problems are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout(_) | Self::UpstreamStatus { .. }
        )
    }
}
