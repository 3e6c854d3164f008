//! Scalar descriptors: booleans, fixed-width integers and floats
//!
//! Each scalar descriptor has a small, closed set of canonical instances held
//! in `static` tables, so the same format always resolves to the same
//! descriptor identity without any runtime initialization.

use std::any::Any;
use std::fmt::Display;

use super::{downcast, downcast_mut};
use crate::error::{Error, Result};
use crate::float::{f32_round_to_even, Bf16};

/// Descriptor of a single `bool`
#[derive(Debug)]
pub struct BoolInfo {
    byte_size: usize,
}

static BOOL: BoolInfo = BoolInfo {
    byte_size: std::mem::size_of::<bool>(),
};

impl BoolInfo {
    /// Returns the canonical boolean descriptor
    #[inline]
    #[must_use]
    pub fn get_singleton() -> &'static Self {
        &BOOL
    }

    #[inline]
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    pub fn get(&self, value: &dyn Any) -> Result<bool> {
        downcast::<bool>(value).copied()
    }

    pub fn set(&self, value: &mut dyn Any, val: bool) -> Result<()> {
        *downcast_mut::<bool>(value)? = val;
        Ok(())
    }
}

/// Bit-width of a fixed-width integer
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize))]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    /// Returns the `IntWidth` of the given number of bits, if supported
    #[must_use]
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(Self::W8),
            16 => Some(Self::W16),
            32 => Some(Self::W32),
            64 => Some(Self::W64),
            _ => None,
        }
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::W8 => 8,
            Self::W16 => 16,
            Self::W32 => 32,
            Self::W64 => 64,
        }
    }

    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::W8 => 1,
            Self::W16 => 2,
            Self::W32 => 4,
            Self::W64 => 8,
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::W8 => 0,
            Self::W16 => 1,
            Self::W32 => 2,
            Self::W64 => 3,
        }
    }
}

/// Width and signedness of a fixed-width integer, the lookup key of the
/// canonical integer descriptors
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize))]
pub struct IntFormat {
    pub width: IntWidth,
    pub signed: bool,
}

impl IntFormat {
    #[must_use]
    pub const fn signed(width: IntWidth) -> Self {
        Self { width, signed: true }
    }

    #[must_use]
    pub const fn unsigned(width: IntWidth) -> Self {
        Self {
            width,
            signed: false,
        }
    }

    /// Smallest value representable in this format
    #[must_use]
    pub const fn min(self) -> i128 {
        if self.signed {
            -(1i128 << (self.width.bits() - 1))
        } else {
            0
        }
    }

    /// Largest value representable in this format
    #[must_use]
    pub const fn max(self) -> i128 {
        if self.signed {
            (1i128 << (self.width.bits() - 1)) - 1
        } else {
            (1i128 << self.width.bits()) - 1
        }
    }

    /// Returns `true` if `val` is representable in this format
    #[must_use]
    pub const fn contains(self, val: i128) -> bool {
        val >= self.min() && val <= self.max()
    }

    const fn index(self) -> usize {
        self.width.index() + if self.signed { 0 } else { 4 }
    }
}

impl Display for IntFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.signed { 'i' } else { 'u' };
        write!(f, "{}{}", sign, self.width.bits())
    }
}

/// Lossless integer value read out of (or written into) an integer location
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntValue {
    Signed(i64),
    Unsigned(u64),
}

impl IntValue {
    #[must_use]
    pub fn as_i128(self) -> i128 {
        match self {
            IntValue::Signed(v) => i128::from(v),
            IntValue::Unsigned(v) => i128::from(v),
        }
    }
}

/// Descriptor of a fixed-width integer
#[derive(Debug)]
pub struct IntegerInfo {
    format: IntFormat,
}

static INTEGERS: [IntegerInfo; 8] = [
    IntegerInfo::new(IntFormat::signed(IntWidth::W8)),
    IntegerInfo::new(IntFormat::signed(IntWidth::W16)),
    IntegerInfo::new(IntFormat::signed(IntWidth::W32)),
    IntegerInfo::new(IntFormat::signed(IntWidth::W64)),
    IntegerInfo::new(IntFormat::unsigned(IntWidth::W8)),
    IntegerInfo::new(IntFormat::unsigned(IntWidth::W16)),
    IntegerInfo::new(IntFormat::unsigned(IntWidth::W32)),
    IntegerInfo::new(IntFormat::unsigned(IntWidth::W64)),
];

macro_rules! load_as {
    ( $value:expr, $t:ty, $ctor:ident ) => {
        IntValue::$ctor((*downcast::<$t>($value)?).into())
    };
}

macro_rules! store_as {
    ( $value:expr, $t:ty, $wide:expr, $fmt:expr ) => {
        *downcast_mut::<$t>($value)? =
            <$t>::try_from($wide).map_err(|_| Error::out_of_range($wide, $fmt))?
    };
}

impl IntegerInfo {
    const fn new(format: IntFormat) -> Self {
        Self { format }
    }

    /// Returns the canonical descriptor for `format`
    #[inline]
    #[must_use]
    pub fn of(format: IntFormat) -> &'static Self {
        &INTEGERS[format.index()]
    }

    /// Returns the canonical signed descriptor of the given bit-width, if supported
    #[must_use]
    pub fn signed(bits: u32) -> Option<&'static Self> {
        IntWidth::from_bits(bits).map(|w| Self::of(IntFormat::signed(w)))
    }

    /// Returns the canonical unsigned descriptor of the given bit-width, if supported
    #[must_use]
    pub fn unsigned(bits: u32) -> Option<&'static Self> {
        IntWidth::from_bits(bits).map(|w| Self::of(IntFormat::unsigned(w)))
    }

    #[inline]
    #[must_use]
    pub fn format(&self) -> IntFormat {
        self.format
    }

    #[inline]
    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.format.signed
    }

    #[inline]
    #[must_use]
    pub fn bit_width(&self) -> u32 {
        self.format.width.bits()
    }

    #[inline]
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.format.width.bytes()
    }

    /// Reads the integer at `value` without loss
    pub fn load(&self, value: &dyn Any) -> Result<IntValue> {
        Ok(match (self.format.width, self.format.signed) {
            (IntWidth::W8, true) => load_as!(value, i8, Signed),
            (IntWidth::W16, true) => load_as!(value, i16, Signed),
            (IntWidth::W32, true) => load_as!(value, i32, Signed),
            (IntWidth::W64, true) => load_as!(value, i64, Signed),
            (IntWidth::W8, false) => load_as!(value, u8, Unsigned),
            (IntWidth::W16, false) => load_as!(value, u16, Unsigned),
            (IntWidth::W32, false) => load_as!(value, u32, Unsigned),
            (IntWidth::W64, false) => load_as!(value, u64, Unsigned),
        })
    }

    /// Writes `val` into the integer at `value`, failing with
    /// [`Error::ValueOutOfRange`] if it does not fit the declared format
    pub fn store(&self, value: &mut dyn Any, val: IntValue) -> Result<()> {
        let wide = val.as_i128();
        let fmt = self.format;
        match (fmt.width, fmt.signed) {
            (IntWidth::W8, true) => store_as!(value, i8, wide, fmt),
            (IntWidth::W16, true) => store_as!(value, i16, wide, fmt),
            (IntWidth::W32, true) => store_as!(value, i32, wide, fmt),
            (IntWidth::W64, true) => store_as!(value, i64, wide, fmt),
            (IntWidth::W8, false) => store_as!(value, u8, wide, fmt),
            (IntWidth::W16, false) => store_as!(value, u16, wide, fmt),
            (IntWidth::W32, false) => store_as!(value, u32, wide, fmt),
            (IntWidth::W64, false) => store_as!(value, u64, wide, fmt),
        }
        Ok(())
    }

    /// Reads the integer at `value` as an `i64`
    ///
    /// Only unsigned 64-bit values above `i64::MAX` can fail to convert.
    pub fn get(&self, value: &dyn Any) -> Result<i64> {
        let wide = self.load(value)?.as_i128();
        i64::try_from(wide).map_err(|_| Error::out_of_range(wide, "i64"))
    }

    /// Writes an `i64` into the integer at `value`, validating it against the
    /// declared width and sign
    pub fn set(&self, value: &mut dyn Any, val: i64) -> Result<()> {
        self.store(value, IntValue::Signed(val))
    }
}

/// Representation family of a float format
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize))]
pub enum FloatRepr {
    Ieee,
    BFloat,
}

/// Width and representation of a float, the lookup key of the canonical
/// float descriptors
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize))]
pub struct FloatFormat {
    pub bits: u32,
    pub repr: FloatRepr,
}

impl FloatFormat {
    pub const BF16: Self = Self::new(16, FloatRepr::BFloat);
    pub const F32: Self = Self::new(32, FloatRepr::Ieee);
    pub const F64: Self = Self::new(64, FloatRepr::Ieee);

    #[must_use]
    pub const fn new(bits: u32, repr: FloatRepr) -> Self {
        Self { bits, repr }
    }
}

impl Display for FloatFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.repr {
            FloatRepr::Ieee => write!(f, "f{}", self.bits),
            FloatRepr::BFloat => write!(f, "bf{}", self.bits),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Storage {
    Bf16,
    F32,
    F64,
}

/// Descriptor of a fixed-width float
#[derive(Debug)]
pub struct FloatInfo {
    format: FloatFormat,
    storage: Storage,
}

static FLOATS: [FloatInfo; 3] = [
    FloatInfo {
        format: FloatFormat::BF16,
        storage: Storage::Bf16,
    },
    FloatInfo {
        format: FloatFormat::F32,
        storage: Storage::F32,
    },
    FloatInfo {
        format: FloatFormat::F64,
        storage: Storage::F64,
    },
];

impl FloatInfo {
    /// Returns the canonical descriptor for `format`, or `None` if the format
    /// has no supported storage type
    #[must_use]
    pub fn lookup(format: FloatFormat) -> Option<&'static Self> {
        FLOATS.iter().find(|info| info.format == format)
    }

    #[inline]
    #[must_use]
    pub fn bf16() -> &'static Self {
        &FLOATS[0]
    }

    #[inline]
    #[must_use]
    pub fn f32() -> &'static Self {
        &FLOATS[1]
    }

    #[inline]
    #[must_use]
    pub fn f64() -> &'static Self {
        &FLOATS[2]
    }

    #[inline]
    #[must_use]
    pub fn format(&self) -> FloatFormat {
        self.format
    }

    #[inline]
    #[must_use]
    pub fn bit_width(&self) -> u32 {
        self.format.bits
    }

    #[inline]
    #[must_use]
    pub fn byte_size(&self) -> usize {
        match self.storage {
            Storage::Bf16 => std::mem::size_of::<Bf16>(),
            Storage::F32 => std::mem::size_of::<f32>(),
            Storage::F64 => std::mem::size_of::<f64>(),
        }
    }

    /// Reads the float at `value`, widened to `f64` (exact)
    pub fn get(&self, value: &dyn Any) -> Result<f64> {
        Ok(match self.storage {
            Storage::Bf16 => downcast::<Bf16>(value)?.to_f64(),
            Storage::F32 => f64::from(*downcast::<f32>(value)?),
            Storage::F64 => *downcast::<f64>(value)?,
        })
    }

    /// Writes `val` into the float at `value`, rounding to nearest (ties to
    /// even) when the declared width is narrower than 64 bits
    pub fn set(&self, value: &mut dyn Any, val: f64) -> Result<()> {
        match self.storage {
            Storage::Bf16 => *downcast_mut::<Bf16>(value)? = Bf16::from_f64(val),
            Storage::F32 => *downcast_mut::<f32>(value)? = f32_round_to_even(val),
            Storage::F64 => *downcast_mut::<f64>(value)? = val,
        }
        Ok(())
    }

    /// Reads the raw bit pattern of the float at `value`, zero-extended
    pub fn get_bits(&self, value: &dyn Any) -> Result<u64> {
        Ok(match self.storage {
            Storage::Bf16 => u64::from(downcast::<Bf16>(value)?.to_bits()),
            Storage::F32 => u64::from(downcast::<f32>(value)?.to_bits()),
            Storage::F64 => downcast::<f64>(value)?.to_bits(),
        })
    }

    /// Writes a raw bit pattern into the float at `value`, failing if it has
    /// bits set beyond the declared width
    pub fn set_bits(&self, value: &mut dyn Any, bits: u64) -> Result<()> {
        let too_wide = || Error::out_of_range(bits, self.format);
        match self.storage {
            Storage::Bf16 => {
                *downcast_mut::<Bf16>(value)? =
                    Bf16::from_bits(u16::try_from(bits).map_err(|_| too_wide())?)
            }
            Storage::F32 => {
                *downcast_mut::<f32>(value)? =
                    f32::from_bits(u32::try_from(bits).map_err(|_| too_wide())?)
            }
            Storage::F64 => *downcast_mut::<f64>(value)? = f64::from_bits(bits),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_lookup_is_stable() {
        for bits in [8, 16, 32, 64] {
            let a = IntegerInfo::signed(bits).unwrap();
            let b = IntegerInfo::signed(bits).unwrap();
            assert!(std::ptr::eq(a, b));
            assert!(a.is_signed());
            assert_eq!(a.bit_width(), bits);
            let u = IntegerInfo::unsigned(bits).unwrap();
            assert!(!std::ptr::eq(a, u));
            assert!(!u.is_signed());
        }
        assert!(IntegerInfo::signed(24).is_none());
        assert!(IntegerInfo::unsigned(128).is_none());
    }

    #[test]
    fn format_bounds() {
        let i8f = IntFormat::signed(IntWidth::W8);
        assert_eq!((i8f.min(), i8f.max()), (-128, 127));
        let u32f = IntFormat::unsigned(IntWidth::W32);
        assert_eq!((u32f.min(), u32f.max()), (0, 4_294_967_295));
        let u64f = IntFormat::unsigned(IntWidth::W64);
        assert_eq!(u64f.max(), i128::from(u64::MAX));
        assert!(!u64f.contains(-1));
        assert_eq!(u32f.to_string(), "u32");
        assert_eq!(IntFormat::signed(IntWidth::W64).to_string(), "i64");
    }

    #[test]
    fn integer_get_set() {
        let info = IntegerInfo::of(IntFormat::signed(IntWidth::W16));
        let mut x = 0i16;
        info.set(&mut x, -300).unwrap();
        assert_eq!(x, -300);
        assert_eq!(info.get(&x).unwrap(), -300);
        assert!(matches!(
            info.set(&mut x, 40_000),
            Err(Error::ValueOutOfRange { value: 40_000, .. })
        ));
        assert_eq!(x, -300);
    }

    #[test]
    fn unsigned_integer_limits() {
        let info = IntegerInfo::of(IntFormat::unsigned(IntWidth::W64));
        let mut x = u64::MAX;
        assert_eq!(info.load(&x).unwrap(), IntValue::Unsigned(u64::MAX));
        assert!(info.get(&x).is_err());
        assert!(info.set(&mut x, -1).is_err());
        info.store(&mut x, IntValue::Unsigned(7)).unwrap();
        assert_eq!(info.get(&x).unwrap(), 7);
    }

    #[test]
    fn integer_location_mismatch() {
        let info = IntegerInfo::of(IntFormat::signed(IntWidth::W32));
        let x = 1i64;
        assert!(matches!(
            info.get(&x),
            Err(Error::LocationMismatch { expected: "i32" })
        ));
    }

    #[test]
    fn float_lookup() {
        assert!(FloatInfo::lookup(FloatFormat::F64).is_some());
        assert!(FloatInfo::lookup(FloatFormat::BF16).is_some());
        assert!(FloatInfo::lookup(FloatFormat::new(16, FloatRepr::Ieee)).is_none());
        let a = FloatInfo::lookup(FloatFormat::F32).unwrap();
        let b = FloatInfo::lookup(FloatFormat::new(32, FloatRepr::Ieee)).unwrap();
        assert!(std::ptr::eq(a, b));
        assert_eq!(FloatFormat::BF16.to_string(), "bf16");
    }

    #[test]
    fn float_narrowing_and_bits() {
        let info = FloatInfo::lookup(FloatFormat::BF16).unwrap();
        let mut x = Bf16::ZERO;
        info.set(&mut x, 1.0).unwrap();
        assert_eq!(x, Bf16::ONE);
        assert_eq!(info.get_bits(&x).unwrap(), 0x3f80);
        info.set_bits(&mut x, 0xc000).unwrap();
        assert_eq!(info.get(&x).unwrap(), -2.0);
        assert!(info.set_bits(&mut x, 0x1_0000).is_err());

        let info = FloatInfo::lookup(FloatFormat::F32).unwrap();
        let mut y = 0f32;
        info.set(&mut y, 0.1).unwrap();
        assert_eq!(y, 0.1f32);
        assert_eq!(info.get(&y).unwrap(), f64::from(0.1f32));
    }
}
