//! `SmallModulus`: a 60-bit prime with cached Barrett reduction constants.

use crate::error::{Error, Result};
use crate::uint::divide192_64;

/// A prime modulus `q < 2^60`, with precomputed Barrett reduction data.
///
/// Barrett's constant is `mu = floor(2^128 / q)`, stored as two 64-bit words
/// (`mu_lo`, `mu_hi`) so that reducing a 128-bit input needs only 64x64->128
/// multiplications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SmallModulus {
    value: u64,
    bit_count: u32,
    mu_lo: u64,
    mu_hi: u64,
}

impl SmallModulus {
    /// Maximum bit width permitted for a ciphertext-modulus prime.
    pub const MAX_BITS: u32 = 60;

    /// Constructs a `SmallModulus`, computing and caching its Barrett constant.
    ///
    /// Fails with [`Error::InvalidParameters`] if `value` is zero or exceeds
    /// [`SmallModulus::MAX_BITS`] bits.
    pub fn new(value: u64) -> Result<Self> {
        if value == 0 {
            return Err(Error::InvalidParameters("modulus must be non-zero".into()));
        }
        let bit_count = 64 - value.leading_zeros();
        if bit_count > Self::MAX_BITS {
            return Err(Error::InvalidParameters(format!(
                "modulus {value} exceeds {} bits",
                Self::MAX_BITS
            )));
        }
        // mu = floor(2^128 / value), computed as floor(2^192 / value) >> 64
        // via 3-word division by a 64-bit divisor.
        let (q, _) = divide192_64([0, 0, 1], value);
        // q above is floor(2^128 / value) already since words = [0,0,1] represents 2^128.
        Ok(SmallModulus {
            value,
            bit_count,
            mu_lo: q[0],
            mu_hi: q[1],
        })
    }

    /// The prime value itself.
    #[inline]
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Bit-length of the prime.
    #[inline]
    pub fn bit_count(&self) -> u32 {
        self.bit_count
    }

    /// Barrett constant `mu = floor(2^128/q)` as `(lo, hi)` 64-bit words.
    #[inline]
    pub fn barrett_mu(&self) -> (u64, u64) {
        (self.mu_lo, self.mu_hi)
    }
}

impl std::fmt::Display for SmallModulus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero() {
        assert!(SmallModulus::new(0).is_err());
    }

    #[test]
    fn rejects_too_large() {
        assert!(SmallModulus::new(1u64 << 60).is_err());
        assert!(SmallModulus::new((1u64 << 60) - 1).is_ok());
    }

    #[test]
    fn bit_count_matches() {
        let m = SmallModulus::new(0xffffee001).unwrap();
        assert_eq!(m.bit_count(), 36);
    }
}
