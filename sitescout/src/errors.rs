/// Error types for sitescout.
///
/// Failures fall into two families:
///
/// 1. **Fatal** (`ScoutError`): returned from the dispatcher or the engine and surfaced to
///    whoever started the run. Unreadable input, unwritable output, and locators that
///    cannot be turned into a URL all end the run.
///
/// 2. **Per-item** (`FetchError`): raised while fetching or reading a single resource.
///    Workers log these and move on to the next item; they never cross the worker loop.
///
/// ```rust,ignore
/// match run_with_config(&config, &shutdown) {
///     Ok(summary) => // Report summary,
///     Err(ScoutError::InvalidUrl { url, .. }) => // Bad locator in the input,
///     Err(e) => // Anything else is fatal too
/// }
/// ```
use std::io;
use thiserror::Error;

/// Result type for scout operations
pub type ScoutResult<T> = Result<T, ScoutError>;

/// Errors that abort a run
#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("Error reading from input: {0}")]
    InputRead(#[source] io::Error),
    #[error("Failed to write to output: {0}")]
    OutputWrite(#[source] io::Error),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Failed to spawn thread '{name}': {source}")]
    ThreadSpawn { name: String, source: io::Error },
    #[error("Thread '{0}' panicked")]
    ThreadPanicked(String),
}

impl ScoutError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            source,
        }
    }

    pub fn invalid_pattern(pattern: impl Into<String>) -> Self {
        Self::InvalidPattern(pattern.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn thread_spawn(name: impl Into<String>, source: io::Error) -> Self {
        Self::ThreadSpawn {
            name: name.into(),
            source,
        }
    }
}

impl From<config::ConfigError> for ScoutError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

/// Failures fetching or reading a single resource
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server returned {status}")]
    Status { status: reqwest::StatusCode },
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
