//! MessagePack tag bytes
//!
//! Only the subset of the MessagePack format that the binary codec emits or
//! accepts is named here. Multi-byte payloads following a tag are big-endian.

use crate::descriptor::{IntFormat, IntWidth};

pub const FALSE: u8 = 0xc2;
pub const TRUE: u8 = 0xc3;

pub const FLOAT32: u8 = 0xca;
pub const FLOAT64: u8 = 0xcb;

pub const UINT8: u8 = 0xcc;
pub const UINT16: u8 = 0xcd;
pub const UINT32: u8 = 0xce;
pub const UINT64: u8 = 0xcf;
pub const INT8: u8 = 0xd0;
pub const INT16: u8 = 0xd1;
pub const INT32: u8 = 0xd2;
pub const INT64: u8 = 0xd3;

pub const FIXSTR: u8 = 0xa0;
pub const STR8: u8 = 0xd9;
pub const STR16: u8 = 0xda;
pub const STR32: u8 = 0xdb;

pub const FIXARRAY: u8 = 0x90;
pub const ARRAY16: u8 = 0xdc;
pub const ARRAY32: u8 = 0xdd;

pub const FIXMAP: u8 = 0x80;
pub const MAP16: u8 = 0xde;
pub const MAP32: u8 = 0xdf;

/// Exclusive upper bound on the length carried by a `fixstr` tag
pub const FIXSTR_LIMIT: usize = 32;
/// Exclusive upper bound on the count carried by a `fixarray` or `fixmap` tag
pub const FIXCOUNT_LIMIT: usize = 16;

/// Returns the fixed-width tag the encoder uses for integers of `format`
///
/// Unsigned 64-bit integers have no tag in this codec.
#[must_use]
pub const fn int_tag(format: IntFormat) -> Option<u8> {
    match (format.width, format.signed) {
        (IntWidth::W8, true) => Some(INT8),
        (IntWidth::W16, true) => Some(INT16),
        (IntWidth::W32, true) => Some(INT32),
        (IntWidth::W64, true) => Some(INT64),
        (IntWidth::W8, false) => Some(UINT8),
        (IntWidth::W16, false) => Some(UINT16),
        (IntWidth::W32, false) => Some(UINT32),
        (IntWidth::W64, false) => None,
    }
}

/// Human-readable name of the MessagePack type family of `tag`
#[must_use]
pub const fn family(tag: u8) -> &'static str {
    match tag {
        0x00..=0x7f => "positive fixint",
        0x80..=0x8f => "fixmap",
        0x90..=0x9f => "fixarray",
        0xa0..=0xbf => "fixstr",
        0xc0 => "nil",
        0xc1 => "reserved tag",
        FALSE | TRUE => "bool",
        0xc4..=0xc6 => "bin",
        0xc7..=0xc9 | 0xd4..=0xd8 => "ext",
        FLOAT32 | FLOAT64 => "float",
        UINT8..=UINT64 => "uint",
        INT8..=INT64 => "int",
        STR8..=STR32 => "str",
        ARRAY16 | ARRAY32 => "array",
        MAP16 | MAP32 => "map",
        0xe0..=0xff => "negative fixint",
    }
}
