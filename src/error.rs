//! Error types shared by every component of the search.

use std::fmt;

/// Errors raised while loading an instance, configuring or running the search.
#[derive(Debug)]
pub enum Error {
    /// A route is not a permutation of the active stops.
    MalformedSolution(String),
    /// A travel time used by a route is not present in the matrix.
    MissingArc { from: usize, to: usize },
    /// A configuration value is out of range.
    InvalidConfig(String),
    /// The instance data is inconsistent (matrix shape, stop ids, capacity).
    InvalidInstance(String),
    /// No capacity-feasible starting route could be built.
    NoFeasibleStart { attempts: usize },
    /// Reading or writing a file failed.
    Io(std::io::Error),
    /// An instance, config or report could not be (de)serialized.
    Json(serde_json::Error),
}

/// A result type with the crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedSolution(msg) => write!(f, "malformed solution: {}", msg),
            Error::MissingArc { from, to } => {
                write!(f, "missing arc {} -> {} in travel-time matrix", from, to)
            }
            Error::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            Error::InvalidInstance(msg) => write!(f, "invalid instance: {}", msg),
            Error::NoFeasibleStart { attempts } => write!(
                f,
                "could not build a feasible initial route after {} attempts",
                attempts
            ),
            Error::Io(err) => write!(f, "io error: {}", err),
            Error::Json(err) => write!(f, "json error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
