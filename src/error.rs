//! General error types
//!
//! Every fallible operation in this crate reports failure through [`Error`],
//! whether it originates in a descriptor capability, one of the codecs, or the
//! hasher. Lower-level error types with a narrower provenance, namely
//! [`WireError`] for the binary reader and [`HexError`] for hex parsing,
//! are defined alongside the code that produces them and are folded into
//! [`Error`] through `From` conversions.
//!
//! None of the conditions below are retried or recovered from internally. A
//! call that returns `Err` has produced no usable output, and a decode target
//! is left in whatever state the traversal had reached when it failed.

use crate::descriptor::Kind;
use crate::hex::HexError;
use crate::parse::error::WireError;

/// Enumerated error type for all failures reported by this crate
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The shape of a document or wire value does not match the kind (or, for
    /// fixed-shape containers, the length) that the target descriptor expects.
    #[error("schema mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: String, found: String },
    /// A value does not fit the declared integer format, or raw float bits do
    /// not fit the declared float width.
    #[error("value {value} is out of range for {format}")]
    ValueOutOfRange { value: i128, format: String },
    /// The requested operation has no representation in the target encoding,
    /// or is not offered by the descriptor at hand.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    /// A dict decode referenced a key that is absent from the target's
    /// existing key set.
    #[error("key `{0}` does not exist in the target dict")]
    UnknownKey(String),
    /// A container could not grow to the requested number of elements.
    #[error("cannot resize container to {requested} elements")]
    ResourceExhausted { requested: usize },
    /// A value location does not hold the Rust type its descriptor expects.
    #[error("value location does not hold a `{expected}`")]
    LocationMismatch { expected: &'static str },
    /// A list was indexed past its end.
    #[error("index {index} out of range for list of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    /// String content is not valid UTF-8 where UTF-8 is required.
    #[error("string content is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    /// Low-level failure while reading binary input.
    #[error(transparent)]
    Wire(#[from] WireError),
    /// Hex input could not be converted to bytes.
    #[error(transparent)]
    Hex(#[from] HexError),
    /// JSON text could not be parsed into a document.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Constructs a [`Error::SchemaMismatch`] for a value of some description that
    /// was found where a value of kind `expected` was required.
    pub(crate) fn mismatch(expected: Kind, found: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            expected: expected.to_string(),
            found: found.into(),
        }
    }

    /// Constructs a [`Error::SchemaMismatch`] for a fixed-shape container whose
    /// length cannot change.
    pub(crate) fn fixed_length(exact: usize, actual: usize) -> Self {
        Self::SchemaMismatch {
            expected: format!("exactly {exact} elements"),
            found: format!("{actual} elements"),
        }
    }

    pub(crate) fn out_of_range(value: impl Into<i128>, format: impl std::fmt::Display) -> Self {
        Self::ValueOutOfRange {
            value: value.into(),
            format: format.to_string(),
        }
    }

    pub(crate) fn location<T: ?Sized>() -> Self {
        Self::LocationMismatch {
            expected: std::any::type_name::<T>(),
        }
    }
}

/// Type alias for Result with an error type of [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy<T: Send + Sync>() {}

    #[test]
    fn error_threadsafe() {
        dummy::<Error>()
    }

    #[test]
    fn messages() {
        assert_eq!(
            Error::mismatch(Kind::Array, "json string").to_string(),
            "schema mismatch: expected array, found json string"
        );
        assert_eq!(
            Error::out_of_range(300, "u8").to_string(),
            "value 300 is out of range for u8"
        );
        assert_eq!(
            Error::UnknownKey("c".into()).to_string(),
            "key `c` does not exist in the target dict"
        );
        assert_eq!(
            Error::location::<i32>().to_string(),
            "value location does not hold a `i32`"
        );
    }
}
