//! Hexadecimal rendering and parsing of byte blobs
//!
//! Used for displaying content digests and binary encodings, and for writing
//! binary fixtures compactly in tests.

const DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Reasons a string is not a hex blob
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HexError {
    #[error("hex blob has odd length {0}")]
    OddLength(usize),
    #[error("invalid hex digit {found:?} at index {index}")]
    InvalidDigit { index: usize, found: char },
}

/// Formats a sequence of bytes as a `String` containing a lowercase hexadecimal blob
#[must_use]
pub fn hex_of_bytes<T>(val: T) -> String
where
    T: AsRef<[u8]>,
{
    let bytes = val.as_ref();
    let mut hex = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        hex.push(char::from(DIGITS[usize::from(byte >> 4)]));
        hex.push(char::from(DIGITS[usize::from(byte & 0xf)]));
    }
    hex
}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Attempt to parse a string-like type as a hexadecimal blob, returning
/// the sequence of bytes encoded if it is a valid hex-string.
pub fn bytes_of_hex<T>(src: &T) -> Result<Vec<u8>, HexError>
where
    T: AsRef<str> + ?Sized,
{
    let src = src.as_ref().as_bytes();
    if src.len() % 2 != 0 {
        return Err(HexError::OddLength(src.len()));
    }
    let digit = |index: usize| {
        nibble(src[index]).ok_or(HexError::InvalidDigit {
            index,
            found: char::from(src[index]),
        })
    };
    (0..src.len())
        .step_by(2)
        .map(|i| -> Result<u8, HexError> { Ok((digit(i)? << 4) | digit(i + 1)?) })
        .collect()
}

/// Parses a hex literal into a `Vec<u8>`, panicking if it is malformed.
///
/// Intended for fixtures in tests and benches only.
#[macro_export]
macro_rules! hex {
    ( $s:expr ) => {
        match $crate::hex::bytes_of_hex($s) {
            Ok(bytes) => bytes,
            Err(err) => panic!("hex!: invalid literal: {:?}", err),
        }
    };
}
