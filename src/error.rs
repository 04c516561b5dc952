//! Errors produced while decoding O datablock files.
//!
//! End of a datablock sequence is not an error: the readers signal it by
//! returning `Ok(None)` from `next_datablock`. Likewise, a disagreement
//! between a record's declared and actual element counts is only a
//! diagnostic, logged with `log::warn!` while decoding continues.
use thiserror::Error;

/// Type alias for a `Result` with [`OdbError`] as the error type.
pub type Result<T> = std::result::Result<T, OdbError>;

/// An error encountered while decoding an O datablock file.
#[derive(Debug, Error)]
pub enum OdbError {
    /// An error from the underlying stream. Fatal to the stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The two length markers bracketing a binary record disagree. The
    /// stream is desynchronized and no further records can be located.
    #[error("record length markers disagree (leading {leading}, trailing {trailing})")]
    RecordFraming { leading: i32, trailing: i32 },

    /// A read was attempted on a stream that already failed with a framing
    /// or I/O error.
    #[error("stream abandoned after an earlier framing or I/O error")]
    StreamFailed,

    /// A datablock header carried a type tag other than `I`, `R`, `C` or `T`.
    #[error("unknown datablock type tag '{0}'")]
    UnknownType(char),

    /// A formatted header line ended before its type tag.
    #[error("datablock header is missing its type tag")]
    MissingTypeTag,

    /// A formatted header line ended before its element count.
    #[error("datablock header is missing its element count")]
    MissingCount,

    /// The element count on a formatted header line was not a decimal number.
    #[error("non-digits in datablock size: '{0}'")]
    BadCount(String),

    /// A formatted header line ended before its format descriptor.
    #[error("datablock header is missing its format descriptor")]
    MissingFormat,

    /// A FORMAT descriptor could not be compiled into a column template.
    #[error("cannot compile format descriptor '{descriptor}': {reason}")]
    MalformedFormat { descriptor: String, reason: String },

    /// A whitespace-delimited token in a formatted numeric datablock did
    /// not parse as a value of the declared type.
    #[error("non-numeric characters in datablock value '{0}'")]
    MalformedNumber(String),
}

/// Shorthand for the error returned when a stream ends inside a structure
/// that should have been complete.
pub(crate) fn unexpected_eof(what: &str) -> OdbError {
    OdbError::Io(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        format!("stream ended inside {what}"),
    ))
}
