//! Cursor over a binary input buffer
//!
//! [`WireReader`] hands out big-endian scalars and borrowed byte runs from a
//! slice, advancing an internal offset. Reads never panic: any request that
//! would run past the end of the buffer fails with
//! [`WireError::UnexpectedEof`] and leaves the offset untouched.

pub mod error;

use self::error::WireError;

pub type WireResult<T> = std::result::Result<T, WireError>;

/// Forward-only reader over a borrowed byte buffer
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> WireReader<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    /// Number of bytes consumed so far
    #[inline]
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of bytes left to consume
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    /// Consumes `nbytes` bytes and returns them as a borrowed slice
    pub fn consume(&mut self, nbytes: usize) -> WireResult<&'a [u8]> {
        let buf: &'a [u8] = self.buf;
        let end = self
            .offset
            .checked_add(nbytes)
            .filter(|&end| end <= buf.len())
            .ok_or(WireError::UnexpectedEof {
                offset: self.offset,
                requested: nbytes,
                buflen: buf.len(),
            })?;
        let ret = &buf[self.offset..end];
        self.offset = end;
        Ok(ret)
    }

    /// Consumes exactly `N` bytes into an array
    pub fn consume_arr<const N: usize>(&mut self) -> WireResult<[u8; N]> {
        let mut ret = [0u8; N];
        ret.copy_from_slice(self.consume(N)?);
        Ok(ret)
    }

    pub fn take_u8(&mut self) -> WireResult<u8> {
        let [byte] = self.consume_arr::<1>()?;
        Ok(byte)
    }

    pub fn take_u16(&mut self) -> WireResult<u16> {
        self.consume_arr().map(u16::from_be_bytes)
    }

    pub fn take_u32(&mut self) -> WireResult<u32> {
        self.consume_arr().map(u32::from_be_bytes)
    }

    pub fn take_u64(&mut self) -> WireResult<u64> {
        self.consume_arr().map(u64::from_be_bytes)
    }

    pub fn take_i8(&mut self) -> WireResult<i8> {
        self.consume_arr().map(i8::from_be_bytes)
    }

    pub fn take_i16(&mut self) -> WireResult<i16> {
        self.consume_arr().map(i16::from_be_bytes)
    }

    pub fn take_i32(&mut self) -> WireResult<i32> {
        self.consume_arr().map(i32::from_be_bytes)
    }

    pub fn take_i64(&mut self) -> WireResult<i64> {
        self.consume_arr().map(i64::from_be_bytes)
    }

    pub fn take_f32(&mut self) -> WireResult<f32> {
        self.consume_arr().map(f32::from_be_bytes)
    }

    pub fn take_f64(&mut self) -> WireResult<f64> {
        self.consume_arr().map(f64::from_be_bytes)
    }

    /// Succeeds only if every byte of the buffer has been consumed
    pub fn finish(self) -> WireResult<()> {
        match self.remaining() {
            0 => Ok(()),
            residual => Err(WireError::TrailingBytes { residual }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_are_big_endian() {
        let buf = crate::hex!("01ff020304fffffff9");
        let mut p = WireReader::new(&buf);
        assert_eq!(p.take_u8().unwrap(), 0x01);
        assert_eq!(p.take_i8().unwrap(), -1);
        assert_eq!(p.take_u16().unwrap(), 0x0203);
        assert_eq!(p.take_u8().unwrap(), 0x04);
        assert_eq!(p.take_i32().unwrap(), -7);
        assert!(p.finish().is_ok());
    }

    #[test]
    fn overrun_leaves_offset() {
        let buf = [0xca, 0x00, 0x00];
        let mut p = WireReader::new(&buf);
        p.take_u8().unwrap();
        assert_eq!(
            p.take_u32(),
            Err(WireError::UnexpectedEof {
                offset: 1,
                requested: 4,
                buflen: 3
            })
        );
        assert_eq!(p.offset(), 1);
        assert_eq!(p.consume(2).unwrap(), &[0x00, 0x00]);
        assert!(p.take_u8().is_err());
        assert!(p.finish().is_ok());
    }

    #[test]
    fn huge_requests_do_not_overflow() {
        let mut p = WireReader::new(&[0u8; 2]);
        p.take_u8().unwrap();
        assert!(p.consume(usize::MAX).is_err());
    }

    #[test]
    fn residue_is_reported() {
        let mut p = WireReader::new(&[1, 2, 3]);
        p.take_u8().unwrap();
        assert_eq!(p.finish(), Err(WireError::TrailingBytes { residual: 2 }));
    }
}
