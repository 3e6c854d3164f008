//! Binary codec
//!
//! A MessagePack-compatible encoding of values described by a [`Descriptor`].
//! The recursion mirrors the JSON codec; what differs is the wire shape:
//!
//! | Kind | Wire |
//! |---|---|
//! | bool | `false`/`true` tag |
//! | integer | fixed-width `int`/`uint` tag of the declared format, then the value |
//! | float | `float64`, whatever the declared width |
//! | string | `str` header with byte length, then the raw bytes |
//! | array, list | `array` header with element count, then each element |
//! | dict | `map` header with entry count, then key (`str`) and value per entry |
//!
//! Integers always use the tag of their declared format, never the compact
//! `fixint` forms, so that the wire identifies the declared width. Unsigned
//! 64-bit integers are not representable and fail with
//! [`Error::Unsupported`] in both directions, as do lengths and counts beyond
//! `u32::MAX`.
//!
//! Decoding checks the tag of every slot against the target descriptor. How
//! strictly integer and float tags are matched is controlled by
//! [`BinaryConfig`]; see [`IntTagPolicy`].

pub mod tag;

use std::any::Any;

use crate::config::{BinaryConfig, IntTagPolicy};
use crate::conv::target::{ByteCounter, Target};
use crate::descriptor::{
    ArrayInfo, BoolInfo, Descriptor, DictInfo, FloatInfo, IntFormat, IntValue, IntWidth,
    IntegerInfo, Kind, ListInfo, StringInfo, TypedRef,
};
use crate::dispatch::{dispatch, KindVisitor};
use crate::error::{Error, Result};
use crate::parse::error::WireError;
use crate::parse::WireReader;
use crate::reflect::Reflect;

fn unsupported_u64() -> Error {
    Error::Unsupported("unsigned 64-bit integers have no binary encoding".into())
}

fn reject(expected: Kind, tag: u8) -> Error {
    tracing::debug!(%expected, tag, "binary tag mismatch");
    Error::mismatch(expected, format!("{} (tag {tag:#04x})", tag::family(tag)))
}

/// Encodes the value at `value`, described by `descriptor`, into `dest`,
/// returning the number of bytes written
///
/// On failure `dest` may hold a partial encoding.
pub fn encode_binary<T: Target>(value: &dyn Any, descriptor: Descriptor, dest: &mut T) -> Result<usize> {
    tracing::trace!(?descriptor, "encoding binary value");
    encode_value(TypedRef::new(value, descriptor), dest)
}

/// Computes the exact length of the binary encoding without producing it
pub fn binary_len(value: &dyn Any, descriptor: Descriptor) -> Result<usize> {
    let mut counter = ByteCounter::create();
    encode_value(TypedRef::new(value, descriptor), &mut counter)?;
    Ok(counter.count())
}

/// Encodes a reflected value into a fresh buffer
pub fn to_binary<T: Reflect>(value: &T) -> Result<Vec<u8>> {
    let descriptor = T::descriptor();
    let mut buf = Vec::create();
    buf.anticipate(binary_len(value, descriptor)?);
    encode_binary(value, descriptor, &mut buf)?;
    Ok(buf)
}

/// Decodes the entirety of `buf` into the existing value at `value`
///
/// Fails with [`WireError::TrailingBytes`] if the encoded value does not
/// span the whole buffer.
pub fn decode_binary(
    buf: &[u8],
    value: &mut dyn Any,
    descriptor: Descriptor,
    config: BinaryConfig,
) -> Result<()> {
    tracing::trace!(?descriptor, len = buf.len(), "decoding binary value");
    let mut reader = WireReader::new(buf);
    decode_value(&mut reader, value, descriptor, config)?;
    reader.finish()?;
    Ok(())
}

/// Decodes one value from the front of `reader`, leaving any following bytes
/// unconsumed
pub fn decode_binary_prefix(
    reader: &mut WireReader<'_>,
    value: &mut dyn Any,
    descriptor: Descriptor,
    config: BinaryConfig,
) -> Result<()> {
    decode_value(reader, value, descriptor, config)
}

/// Decodes `buf` into `T::default()` with the default [`BinaryConfig`]
pub fn from_binary<T: Reflect + Default>(buf: &[u8]) -> Result<T> {
    let mut value = T::default();
    from_binary_into(buf, &mut value)?;
    Ok(value)
}

/// Decodes `buf` into an existing reflected value with the default
/// [`BinaryConfig`]
pub fn from_binary_into<T: Reflect>(buf: &[u8], value: &mut T) -> Result<()> {
    decode_binary(buf, value, T::descriptor(), BinaryConfig::default())
}

fn encode_value<T: Target>(item: TypedRef<'_>, dest: &mut T) -> Result<usize> {
    dispatch(
        item.descriptor,
        Encoder {
            value: item.value,
            dest,
        },
    )
}

fn decode_value(
    reader: &mut WireReader<'_>,
    value: &mut dyn Any,
    descriptor: Descriptor,
    config: BinaryConfig,
) -> Result<()> {
    dispatch(
        descriptor,
        Decoder {
            value,
            reader,
            config,
        },
    )
}

fn put_str_header<T: Target>(dest: &mut T, len: usize) -> Result<usize> {
    if len < tag::FIXSTR_LIMIT {
        // fits in the low five bits
        return Ok(dest.push_one(tag::FIXSTR | len as u8));
    }
    if let Ok(n) = u8::try_from(len) {
        Ok(dest.push_one(tag::STR8) + dest.push_one(n))
    } else if let Ok(n) = u16::try_from(len) {
        Ok(dest.push_one(tag::STR16) + dest.push_many(n.to_be_bytes()))
    } else if let Ok(n) = u32::try_from(len) {
        Ok(dest.push_one(tag::STR32) + dest.push_many(n.to_be_bytes()))
    } else {
        Err(Error::Unsupported(format!("string of {len} bytes is too long to encode")))
    }
}

fn put_count_header<T: Target>(dest: &mut T, count: usize, fix: u8, tags: [u8; 2]) -> Result<usize> {
    if count < tag::FIXCOUNT_LIMIT {
        return Ok(dest.push_one(fix | count as u8));
    }
    if let Ok(n) = u16::try_from(count) {
        Ok(dest.push_one(tags[0]) + dest.push_many(n.to_be_bytes()))
    } else if let Ok(n) = u32::try_from(count) {
        Ok(dest.push_one(tags[1]) + dest.push_many(n.to_be_bytes()))
    } else {
        Err(Error::Unsupported(format!("container of {count} elements is too long to encode")))
    }
}

fn put_array_header<T: Target>(dest: &mut T, count: usize) -> Result<usize> {
    put_count_header(dest, count, tag::FIXARRAY, [tag::ARRAY16, tag::ARRAY32])
}

fn put_map_header<T: Target>(dest: &mut T, count: usize) -> Result<usize> {
    put_count_header(dest, count, tag::FIXMAP, [tag::MAP16, tag::MAP32])
}

fn put_str<T: Target>(dest: &mut T, bytes: &[u8]) -> Result<usize> {
    Ok(put_str_header(dest, bytes.len())? + dest.push_all(bytes))
}

macro_rules! put_int {
    ( $dest:expr, $tag:expr, $t:ty, $val:expr, $fmt:expr ) => {{
        let narrow = <$t>::try_from($val).map_err(|_| Error::out_of_range($val, $fmt))?;
        $dest.push_one($tag) + $dest.push_many(narrow.to_be_bytes())
    }};
}

fn put_int<T: Target>(dest: &mut T, format: IntFormat, val: IntValue) -> Result<usize> {
    let wide = val.as_i128();
    Ok(match (format.width, format.signed) {
        (IntWidth::W8, true) => put_int!(dest, tag::INT8, i8, wide, format),
        (IntWidth::W16, true) => put_int!(dest, tag::INT16, i16, wide, format),
        (IntWidth::W32, true) => put_int!(dest, tag::INT32, i32, wide, format),
        (IntWidth::W64, true) => put_int!(dest, tag::INT64, i64, wide, format),
        (IntWidth::W8, false) => put_int!(dest, tag::UINT8, u8, wide, format),
        (IntWidth::W16, false) => put_int!(dest, tag::UINT16, u16, wide, format),
        (IntWidth::W32, false) => put_int!(dest, tag::UINT32, u32, wide, format),
        (IntWidth::W64, false) => return Err(unsupported_u64()),
    })
}

struct Encoder<'a, 'b, T: Target> {
    value: &'a dyn Any,
    dest: &'b mut T,
}

impl<T: Target> KindVisitor for Encoder<'_, '_, T> {
    type Output = Result<usize>;

    fn visit_bool(self, info: &'static BoolInfo) -> Self::Output {
        let tag = if info.get(self.value)? {
            tag::TRUE
        } else {
            tag::FALSE
        };
        Ok(self.dest.push_one(tag))
    }

    fn visit_integer(self, info: &'static IntegerInfo) -> Self::Output {
        if tag::int_tag(info.format()).is_none() {
            return Err(unsupported_u64());
        }
        put_int(self.dest, info.format(), info.load(self.value)?)
    }

    fn visit_float(self, info: &'static FloatInfo) -> Self::Output {
        let x = info.get(self.value)?;
        Ok(self.dest.push_one(tag::FLOAT64) + self.dest.push_many(x.to_be_bytes()))
    }

    fn visit_string(self, info: &'static dyn StringInfo) -> Self::Output {
        put_str(self.dest, info.get(self.value)?)
    }

    fn visit_array(self, info: &'static dyn ArrayInfo) -> Self::Output {
        let element = info.element();
        let elements = info.elements(self.value)?;
        let mut written = put_array_header(self.dest, elements.len())?;
        for x in elements {
            written += encode_value(TypedRef::new(x, element), self.dest)?;
        }
        Ok(written)
    }

    fn visit_list(self, info: &'static dyn ListInfo) -> Self::Output {
        let len = info.len(self.value)?;
        let mut written = put_array_header(self.dest, len)?;
        for ix in 0..len {
            written += encode_value(info.child(self.value, ix)?, self.dest)?;
        }
        Ok(written)
    }

    fn visit_dict(self, info: &'static dyn DictInfo) -> Self::Output {
        let entries = info.entries(self.value)?;
        let mut written = put_map_header(self.dest, entries.len())?;
        for (key, item) in entries {
            written += put_str(self.dest, key.as_bytes())?;
            written += encode_value(item, self.dest)?;
        }
        Ok(written)
    }
}

struct Decoder<'a, 'r, 'b> {
    value: &'a mut dyn Any,
    reader: &'r mut WireReader<'b>,
    config: BinaryConfig,
}

/// Reads the payload of any MessagePack integer tag
fn take_any_int(reader: &mut WireReader<'_>, tag: u8) -> Result<Option<IntValue>> {
    Ok(Some(match tag {
        0x00..=0x7f => IntValue::Unsigned(u64::from(tag)),
        0xe0..=0xff => IntValue::Signed(i64::from(tag as i8)),
        tag::UINT8 => IntValue::Unsigned(reader.take_u8()?.into()),
        tag::UINT16 => IntValue::Unsigned(reader.take_u16()?.into()),
        tag::UINT32 => IntValue::Unsigned(reader.take_u32()?.into()),
        tag::UINT64 => IntValue::Unsigned(reader.take_u64()?),
        tag::INT8 => IntValue::Signed(reader.take_i8()?.into()),
        tag::INT16 => IntValue::Signed(reader.take_i16()?.into()),
        tag::INT32 => IntValue::Signed(reader.take_i32()?.into()),
        tag::INT64 => IntValue::Signed(reader.take_i64()?),
        _ => return Ok(None),
    }))
}

/// Guards a wire-declared count against the bytes actually left, before any
/// allocation is made on its behalf
fn check_count(reader: &WireReader<'_>, count: usize, min_item_len: usize) -> Result<()> {
    let needed = count.saturating_mul(min_item_len);
    if needed > reader.remaining() {
        return Err(WireError::UnexpectedEof {
            offset: reader.offset(),
            requested: needed,
            buflen: reader.offset() + reader.remaining(),
        }
        .into());
    }
    Ok(())
}

fn take_str_len(reader: &mut WireReader<'_>, tag: u8) -> Result<Option<usize>> {
    Ok(Some(match tag {
        0xa0..=0xbf => usize::from(tag & 0x1f),
        tag::STR8 => usize::from(reader.take_u8()?),
        tag::STR16 => usize::from(reader.take_u16()?),
        tag::STR32 => reader.take_u32()? as usize,
        _ => return Ok(None),
    }))
}

fn take_str<'b>(reader: &mut WireReader<'b>) -> Result<&'b [u8]> {
    let tag = reader.take_u8()?;
    let len = take_str_len(reader, tag)?.ok_or_else(|| reject(Kind::String, tag))?;
    Ok(reader.consume(len)?)
}

fn take_count(reader: &mut WireReader<'_>, tag: u8, fix: u8, tags: [u8; 2]) -> Result<Option<usize>> {
    Ok(Some(match tag {
        _ if tag & 0xf0 == fix => usize::from(tag & 0x0f),
        _ if tag == tags[0] => usize::from(reader.take_u16()?),
        _ if tag == tags[1] => reader.take_u32()? as usize,
        _ => return Ok(None),
    }))
}

fn take_array_header(reader: &mut WireReader<'_>, expected: Kind) -> Result<usize> {
    let tag = reader.take_u8()?;
    let count = take_count(reader, tag, tag::FIXARRAY, [tag::ARRAY16, tag::ARRAY32])?
        .ok_or_else(|| reject(expected, tag))?;
    check_count(reader, count, 1)?;
    Ok(count)
}

impl KindVisitor for Decoder<'_, '_, '_> {
    type Output = Result<()>;

    fn visit_bool(self, info: &'static BoolInfo) -> Self::Output {
        match self.reader.take_u8()? {
            tag::FALSE => info.set(self.value, false),
            tag::TRUE => info.set(self.value, true),
            other => Err(reject(Kind::Bool, other)),
        }
    }

    fn visit_integer(self, info: &'static IntegerInfo) -> Self::Output {
        let expected = tag::int_tag(info.format()).ok_or_else(unsupported_u64)?;
        let tag = self.reader.take_u8()?;
        if self.config.int_tags == IntTagPolicy::Exact && tag != expected {
            return Err(reject(Kind::Integer, tag));
        }
        let val = take_any_int(self.reader, tag)?.ok_or_else(|| reject(Kind::Integer, tag))?;
        info.store(self.value, val)
    }

    fn visit_float(self, info: &'static FloatInfo) -> Self::Output {
        let x = match (self.reader.take_u8()?, self.config.int_tags) {
            (tag::FLOAT64, _) => self.reader.take_f64()?,
            (tag::FLOAT32, IntTagPolicy::Lenient) => f64::from(self.reader.take_f32()?),
            (other, _) => return Err(reject(Kind::Float, other)),
        };
        info.set(self.value, x)
    }

    fn visit_string(self, info: &'static dyn StringInfo) -> Self::Output {
        let bytes = take_str(self.reader)?;
        info.set(self.value, bytes)
    }

    fn visit_array(self, info: &'static dyn ArrayInfo) -> Self::Output {
        let count = take_array_header(self.reader, Kind::Array)?;
        info.resize(self.value, count)?;
        let element = info.element();
        for slot in info.elements_mut(self.value)? {
            decode_value(self.reader, slot, element, self.config)?;
        }
        Ok(())
    }

    fn visit_list(self, info: &'static dyn ListInfo) -> Self::Output {
        let count = take_array_header(self.reader, Kind::List)?;
        info.resize(self.value, count)?;
        for ix in 0..count {
            let child = info.child_mut(self.value, ix)?;
            decode_value(self.reader, child.value, child.descriptor, self.config)?;
        }
        Ok(())
    }

    fn visit_dict(self, info: &'static dyn DictInfo) -> Self::Output {
        let tag = self.reader.take_u8()?;
        let count = take_count(self.reader, tag, tag::FIXMAP, [tag::MAP16, tag::MAP32])?
            .ok_or_else(|| reject(Kind::Dict, tag))?;
        check_count(self.reader, count, 2)?;
        for _ in 0..count {
            let key = std::str::from_utf8(take_str(self.reader)?)?;
            let Some(slot) = info.get_mut(self.value, key)? else {
                tracing::debug!(%key, dict = info.type_name(), "binary map key has no slot in target");
                return Err(Error::UnknownKey(key.to_owned()));
            };
            decode_value(self.reader, slot.value, slot.descriptor, self.config)?;
        }
        Ok(())
    }
}
