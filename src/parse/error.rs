//! Error type for low-level reads from a binary buffer
//!
//! [`WireError`] covers the failures that a [`WireReader`](super::WireReader)
//! can detect on its own, without any knowledge of the value being decoded:
//! running out of input, and leaving input unconsumed. Failures that depend on
//! the target descriptor (unexpected tags, values out of range) are reported
//! by the codec directly as [`Error`](crate::Error) variants.

use std::error::Error;
use std::fmt::{Display, Formatter, Result};

/// Enumeration over the buffer-level failures of a [`WireReader`](super::WireReader)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    /// Error case when a read of `requested` bytes at `offset` would run past
    /// the final byte of a buffer of length `buflen`.
    UnexpectedEof {
        offset: usize,
        requested: usize,
        buflen: usize,
    },
    /// Error case when a top-level decode finished with `residual` bytes left
    /// unread in the buffer.
    TrailingBytes { residual: usize },
}

impl Display for WireError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match *self {
            WireError::UnexpectedEof {
                offset,
                requested,
                buflen,
            } => write!(
                f,
                "cannot read {requested} bytes at offset {offset}: buffer ends after {buflen} bytes"
            ),
            WireError::TrailingBytes { residual } => {
                write!(f, "decode finished with {residual} unconsumed trailing bytes")
            }
        }
    }
}

impl Error for WireError {}
