//! Reduced-precision floating-point storage
//!
//! This module provides [`Bf16`], the storage type behind the `bf16` float
//! descriptor, together with the narrowing conversions used whenever a
//! double-precision value has to be stored into a narrower float slot.
//!
//! # Rounding
//!
//! Every narrowing conversion in this crate rounds to nearest, ties to even.
//! For `f64 -> f32` this is what `as` already does. For `f64 -> bf16` a naive
//! `f64 -> f32 -> bf16` chain rounds twice and can land one ulp away from the
//! correctly rounded result, so the first step rounds to odd instead, which
//! leaves enough information in the low mantissa bit for the second step to
//! round correctly.
//!
//! NaN inputs produce a quiet NaN; infinities and signed zeros are preserved.

/// A `bfloat16` value, stored as its raw bit pattern
///
/// `bfloat16` shares the sign and 8-bit exponent layout of `f32` and keeps
/// only the top 7 mantissa bits, so widening to `f32` is exact and simply
/// appends sixteen zero bits.
///
/// Equality and hashing are bitwise: `-0.0` and `+0.0` compare unequal, and a
/// NaN is equal to another NaN with the same payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Bf16(u16);

impl Bf16 {
    /// Positive zero
    pub const ZERO: Self = Self(0);

    /// `1.0` in bfloat16
    pub const ONE: Self = Self(0x3f80);

    /// Constructs a `Bf16` directly from its bit pattern
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Returns the raw bit pattern of `self`
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u16 {
        self.0
    }

    /// Rounds an `f32` to the nearest `bfloat16`, ties to even
    #[must_use]
    pub fn from_f32(val: f32) -> Self {
        let bits = val.to_bits();
        if val.is_nan() {
            // keep the sign and top payload bits, force the quiet bit
            return Self(upper_half(bits) | 0x0040);
        }
        let bias = 0x7fff + ((bits >> 16) & 1);
        Self(upper_half(bits.wrapping_add(bias)))
    }

    /// Rounds an `f64` to the nearest `bfloat16`, ties to even
    #[must_use]
    pub fn from_f64(val: f64) -> Self {
        Self::from_f32(f32_round_to_odd(val))
    }

    /// Widens `self` to `f32` (exact)
    #[inline]
    #[must_use]
    pub fn to_f32(self) -> f32 {
        f32::from_bits(u32::from(self.0) << 16)
    }

    /// Widens `self` to `f64` (exact)
    #[inline]
    #[must_use]
    pub fn to_f64(self) -> f64 {
        f64::from(self.to_f32())
    }
}

impl From<Bf16> for f32 {
    fn from(val: Bf16) -> Self {
        val.to_f32()
    }
}

impl From<Bf16> for f64 {
    fn from(val: Bf16) -> Self {
        val.to_f64()
    }
}

#[inline]
fn upper_half(bits: u32) -> u16 {
    // the shifted value always fits in 16 bits
    u16::try_from(bits >> 16).unwrap_or(u16::MAX)
}

/// Narrows `val` to `f32` rounding to nearest, ties to even.
#[inline]
#[must_use]
pub fn f32_round_to_even(val: f64) -> f32 {
    val as f32
}

/// Narrows `val` to `f32` rounding to odd: inexact results have their lowest
/// mantissa bit forced to 1.
fn f32_round_to_odd(val: f64) -> f32 {
    let nearest = val as f32;
    let widened = f64::from(nearest);
    if !nearest.is_finite() || widened == val || nearest.to_bits() & 1 == 1 {
        return nearest;
    }
    // step one ulp towards `val`, away from the even neighbour
    let bits = nearest.to_bits();
    if val.abs() > widened.abs() {
        f32::from_bits(bits + 1)
    } else {
        f32::from_bits(bits - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_values() {
        const CASES: [(f32, u16); 6] = [
            (0.0, 0x0000),
            (-0.0, 0x8000),
            (1.0, 0x3f80),
            (-2.0, 0xc000),
            (f32::INFINITY, 0x7f80),
            (f32::NEG_INFINITY, 0xff80),
        ];
        for (f, bits) in CASES {
            assert_eq!(Bf16::from_f32(f).to_bits(), bits, "{f}");
            assert_eq!(Bf16::from_bits(bits).to_f32().to_bits(), f.to_bits());
        }
    }

    #[test]
    fn ties_to_even() {
        // 1 + 2^-8 is exactly halfway between 1.0 (even) and 1 + 2^-7 (odd)
        assert_eq!(Bf16::from_f32(1.0 + 2f32.powi(-8)).to_bits(), 0x3f80);
        // 1 + 3 * 2^-8 is halfway between 1 + 2^-7 (odd) and 1 + 2^-6 (even)
        assert_eq!(Bf16::from_f32(1.0 + 3.0 * 2f32.powi(-8)).to_bits(), 0x3f82);
        // just above the midpoint rounds up
        assert_eq!(Bf16::from_f32(1.0 + 2f32.powi(-8) + 2f32.powi(-20)).to_bits(), 0x3f81);
    }

    #[test]
    fn no_double_rounding() {
        // Slightly above the bf16 midpoint, but close enough that f32 rounding
        // alone would land exactly on the midpoint and then tie to even.
        let val = 1.0 + 2f64.powi(-8) + 2f64.powi(-40);
        assert_eq!(Bf16::from_f32(val as f32).to_bits(), 0x3f80);
        assert_eq!(Bf16::from_f64(val).to_bits(), 0x3f81);
    }

    #[test]
    fn nan_stays_nan() {
        assert!(Bf16::from_f32(f32::NAN).to_f32().is_nan());
        assert!(Bf16::from_f64(f64::NAN).to_f64().is_nan());
    }

    #[test]
    fn f32_narrowing() {
        assert_eq!(f32_round_to_even(0.1), 0.1f32);
        assert_eq!(f64::from(f32_round_to_even(1.5)), 1.5);
    }
}
