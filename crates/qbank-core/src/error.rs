use thiserror::Error;

use crate::filter::Signature;
use crate::types::Identifier;

/// Failures reported by a page source. All of them are recoverable by retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("request timed out")]
    Timeout,
}

impl FetchError {
    /// Short machine-friendly reason tag.
    pub fn reason(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network",
            FetchError::Server(_) => "server",
            FetchError::Malformed(_) => "malformed",
            FetchError::Timeout => "timeout",
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("filter level {index} out of range (chain has {len} levels)")]
    InvalidLevel { index: usize, len: usize },

    #[error("filter level {index} cannot be set while an ancestor level is empty")]
    UnresolvedAncestor { index: usize },

    #[error("filter chain is not resolved")]
    Unresolved,

    #[error("invalid page number: {0}")]
    InvalidPage(u32),

    #[error("{0} is not selected")]
    UnknownSelection(Identifier),

    #[error("stale page for signature {actual} (current {expected:?})")]
    StaleFetch { expected: Option<Signature>, actual: Signature },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
