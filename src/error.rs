use std::sync::Arc;

/// Represents a result type for flagpole operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the flag registry, its snapshot and the service built on them.
///
/// A missing flag is never an error: lookups return `Option` and mutations of existing flags
/// return `bool`.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Flag names are the registry key and must not be empty.
    #[error("flag name must not be empty")]
    InvalidFlagName,

    /// The snapshot exists but could not be parsed. Loading is aborted and the registry is left
    /// untouched.
    #[error("malformed flag snapshot")]
    // serde_json::Error is not clonable, so we're wrapping it in an Arc.
    MalformedSnapshot(#[source] Arc<serde_json::Error>),

    /// Reading or writing the snapshot failed.
    #[error(transparent)]
    // std::io::Error is not clonable, so we're wrapping it in an Arc.
    Io(Arc<std::io::Error>),
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::MalformedSnapshot(Arc::new(value))
    }
}
