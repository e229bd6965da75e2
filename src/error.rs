//! Error types shared by the timeline engine

use thiserror::Error;

/// A page fetch failed
///
/// Fetch errors never invalidate data that is already loaded. They are kept in
/// the pagination state so that the owner can decide whether to retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The transport failed before a response arrived
    #[error("transport error: {0}")]
    Transport(String),
    /// The backend answered but refused the request
    #[error("rejected by backend: {0}")]
    Rejected(String),
    /// The fetcher gave up waiting
    #[error("fetch timed out")]
    Timeout,
    /// The fetch task died before reporting a result
    #[error("fetch aborted")]
    Aborted,
}

/// A cursor token could not be decoded
///
/// Callers are expected to fail closed on this error and restart pagination
/// from the first page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("cursor token has no version prefix")]
    MissingPrefix,
    #[error("cursor token version {0:?} is not supported")]
    UnsupportedVersion(String),
    #[error("cursor token is not valid UTF-8")]
    Encoding,
    #[error("cursor token payload is malformed: {0}")]
    Payload(String),
}
