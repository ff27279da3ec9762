//! Error types for the Nydus crypto core.

use thiserror::Error;

/// Result type alias for crypto core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while deriving keys or encrypting notes.
///
/// Every operation in this crate is pure computation, so none of these are
/// transient: a failing call must be fixed at the input, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Coordinates do not satisfy the curve equation, or the point is not
    /// usable as a key-agreement peer (identity, small order).
    #[error("invalid curve point: {0}")]
    InvalidPoint(String),

    /// A scalar or field input is negative or not in the canonical range
    /// `[0, M)`, or a private scalar is a multiple of the subgroup order
    /// (zero included).
    #[error("value out of range: {0}")]
    OutOfRange(String),

    /// The hash primitive was driven in a way it does not support.
    #[error("hash failure: {0}")]
    HashFailure(String),

    /// Text or byte input could not be decoded at all.
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl From<hex::FromHexError> for Error {
    fn from(err: hex::FromHexError) -> Self {
        Error::Encoding(err.to_string())
    }
}
