//! Error types for specindex.
//!
//! Library crates use [`SpecIndexError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::fmt;
use std::path::PathBuf;

/// Why a locator could not be turned into a shortname.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameErrorKind {
    /// No locator pattern matched and the input is not a bare name.
    Unparseable,
    /// A name was extracted but contains characters outside the allowed set.
    InvalidCharacters,
}

impl fmt::Display for NameErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unparseable => f.write_str("unparseable"),
            Self::InvalidCharacters => f.write_str("invalid-characters"),
        }
    }
}

/// Classification of a failed network fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Connection, TLS or body transfer failure.
    Transport,
    /// The server answered with a non-success status.
    Status(u16),
    /// The server rejected the request with HTTP 429.
    RateLimited,
    /// The bounded wait expired before the response arrived.
    Timeout,
    /// The body could not be decoded into the expected shape.
    Decode,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => f.write_str("transport"),
            Self::Status(code) => write!(f, "HTTP {code}"),
            Self::RateLimited => f.write_str("rate-limited"),
            Self::Timeout => f.write_str("timeout"),
            Self::Decode => f.write_str("decode"),
        }
    }
}

/// Top-level error type for all specindex operations.
#[derive(Debug, thiserror::Error)]
pub enum SpecIndexError {
    /// A locator could not be resolved to a valid shortname.
    #[error("cannot derive a name from {locator:?}: {kind}")]
    NameResolution {
        locator: String,
        kind: NameErrorKind,
    },

    /// The series graph violates one of its invariants.
    #[error("series {series}: {message}")]
    GraphConsistency { series: String, message: String },

    /// A remote fetch failed (transient, rate limit, timeout, ...).
    #[error("fetch failed for {url} ({kind}): {message}")]
    Fetch {
        url: String,
        kind: FetchErrorKind,
        message: String,
    },

    /// An upstream source reports a different canonical identity.
    #[error("{item} is reported as {reported} by {source_name}; the input list needs updating")]
    IdentityRedirect {
        item: String,
        reported: String,
        source_name: String,
    },

    /// A build stage aborted. Wraps the root cause.
    #[error("stage {stage} failed{}: {source}", item_suffix(.item))]
    Stage {
        stage: String,
        item: Option<String>,
        source: Box<SpecIndexError>,
    },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (malformed input, missing field, ...).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// JSON/TOML parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },
}

fn item_suffix(item: &Option<String>) -> String {
    match item {
        Some(item) => format!(" on {item}"),
        None => String::new(),
    }
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SpecIndexError>;

impl SpecIndexError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a fetch error for `url`.
    pub fn fetch(url: impl Into<String>, kind: FetchErrorKind, msg: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            kind,
            message: msg.into(),
        }
    }

    /// Create a graph consistency error for `series`.
    pub fn graph(series: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::GraphConsistency {
            series: series.into(),
            message: msg.into(),
        }
    }

    /// Tag this error with the stage (and optionally the item) it came from.
    ///
    /// Errors that are already stage-tagged are returned unchanged.
    pub fn in_stage(self, stage: &str, item: Option<&str>) -> Self {
        match self {
            Self::Stage { .. } => self,
            other => Self::Stage {
                stage: stage.to_string(),
                item: item.map(str::to_string),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, looking through stage wrappers.
    pub fn root_cause(&self) -> &SpecIndexError {
        match self {
            Self::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Whether the root cause is a recoverable fetch failure.
    pub fn is_fetch(&self) -> bool {
        matches!(self.root_cause(), Self::Fetch { .. })
    }
}
