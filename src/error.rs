//! Typed error taxonomy for the three boundaries that can fail: parsing,
//! route registration, and server bootstrap. Handler-level errors are not
//! part of this taxonomy — see [`crate::router::HandlerResult`].

use thiserror::Error;

/// Failure to decode a request head from a byte window.
///
/// Only [`ParseError::Incomplete`] is recoverable: the caller should retain
/// the buffer and retry once more bytes arrive. Every other variant means
/// the connection must be closed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("incomplete http request")]
    Incomplete,
    #[error("invalid http request")]
    BadData,
    #[error("http method not supported")]
    UnsupportedMethod,
    #[error("protocol not supported")]
    UnsupportedProtocol,
}

impl ParseError {
    /// Whether the caller should keep the connection open and wait for more
    /// bytes, as opposed to closing it.
    pub fn is_recoverable(self) -> bool {
        matches!(self, ParseError::Incomplete)
    }
}

/// Failure to register or freeze a route.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RouterError {
    /// `register` was called after the router had already been handed to
    /// `serve()` (and frozen into a read-only, cross-worker-shared tree).
    #[error("cannot register a route after the router has started serving")]
    AlreadyServing,
}

/// Failure to bring a worker's event loop up.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("socket setup failed: {0}")]
    Socket(#[from] std::io::Error),
    #[error("io_uring setup failed: {0}")]
    Ring(#[source] std::io::Error),
}
