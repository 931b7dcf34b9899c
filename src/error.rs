//! The error type shared by the encoder and decoder.

use std::io;

use thiserror::Error;

/// The error type for all encoding and decoding operations.
///
/// Nothing is caught or retried internally; every error propagates
/// synchronously to the caller. A write that fails partway through may leave
/// the sink holding a truncated GIF; it is not rolled back.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error happened when reading from the source or writing to the
    /// sink.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not structurally valid GIF data.
    #[error("malformed GIF: {0}")]
    MalformedGif(String),

    /// The input ended before a required byte count was satisfied.
    #[error("input ended unexpectedly")]
    TruncatedInput,

    /// An API call was made in the wrong lifecycle state.
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    /// A caller-supplied value is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

/// Result type alias for encoding and decoding operations.
pub type Result<T> = std::result::Result<T, Error>;
