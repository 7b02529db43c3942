//! Arithmetic modulo a 60-bit prime ([`SmallModulus`]).
//!
//! All reduction here is eager: every operation returns a value fully
//! reduced into `[0, q)`. The reference design defers reduction across
//! lazy-accumulation ranges of `[0, 2q)`/`[0, 4q)` as a performance
//! optimization; this port performs full Barrett reduction after each step
//! instead (see `DESIGN.md`), trading the optimization for a simpler,
//! obviously-correct accumulation loop.

use crate::error::{Error, Result};
use crate::modulus::SmallModulus;
use crate::uint::mul64;
use num_bigint::BigUint;

/// Barrett-reduces a 128-bit value `x` (given as `(lo, hi)`) modulo `modulus`.
///
/// Correct for all `x` in `[0, 2^128)`. Not constant-time.
///
/// The reference design computes the quotient estimate `q' = floor(x*mu/2^128)`
/// with hand-rolled 256-bit limb arithmetic on two 64-bit machine words. This
/// port keeps the same two-step structure (multiply-high, then subtract and
/// correct) but performs the wide multiply through [`BigUint`] rather than
/// reimplementing 256-bit schoolbook multiplication by hand, since a correct
/// accumulation loop matters more here than shaving the last allocation.
pub fn barrett_reduce128(lo: u64, hi: u64, modulus: &SmallModulus) -> u64 {
    let q = modulus.value();
    let (mu_lo, mu_hi) = modulus.barrett_mu();
    let x = (BigUint::from(hi) << 64) + BigUint::from(lo);
    let mu = (BigUint::from(mu_hi) << 64) + BigUint::from(mu_lo);
    let q_est = (&x * &mu) >> 128;
    let qm = BigUint::from(q);
    let prod = &q_est * &qm;
    // x >= q_est*q always holds for a correctly computed Barrett quotient estimate.
    let mut r = if x >= prod { x - prod } else { BigUint::from(0u64) };
    while r >= qm {
        r -= &qm;
    }
    r.iter_u64_digits().next().unwrap_or(0)
}

/// Reduces an arbitrary `u64` (possibly `>= q`, but `< 2^64`) modulo `modulus`.
pub fn barrett_reduce64(x: u64, modulus: &SmallModulus) -> u64 {
    barrett_reduce128(x, 0, modulus)
}

/// `(a + b) mod q`.
#[inline]
pub fn add_mod(a: u64, b: u64, modulus: &SmallModulus) -> u64 {
    let q = modulus.value();
    let s = a.wrapping_add(b);
    // a, b < q < 2^60 so a+b cannot wrap a u64; just compare.
    if s >= q {
        s - q
    } else {
        s
    }
}

/// `(a - b) mod q`.
#[inline]
pub fn sub_mod(a: u64, b: u64, modulus: &SmallModulus) -> u64 {
    let q = modulus.value();
    if a >= b {
        a - b
    } else {
        q - (b - a)
    }
}

/// `-a mod q`.
#[inline]
pub fn negate_mod(a: u64, modulus: &SmallModulus) -> u64 {
    if a == 0 {
        0
    } else {
        modulus.value() - a
    }
}

/// `(a * b) mod q` via full 128-bit product + Barrett reduction.
#[inline]
pub fn multiply_mod(a: u64, b: u64, modulus: &SmallModulus) -> u64 {
    let (lo, hi) = mul64(a, b);
    barrett_reduce128(lo, hi, modulus)
}

/// Modular inverse of `a` mod `q` via the extended Euclidean algorithm.
///
/// Fails with [`Error::ArithmeticFailure`] when `gcd(a, q) != 1`.
pub fn invert_mod(a: u64, modulus: &SmallModulus) -> Result<u64> {
    let q = modulus.value() as i128;
    let mut a = (a as i128) % q;
    if a == 0 {
        return Err(Error::ArithmeticFailure("cannot invert zero".into()));
    }
    let (mut old_r, mut r) = (a, q);
    let (mut old_s, mut s) = (1i128, 0i128);
    while r != 0 {
        let quotient = old_r / r;
        let tmp_r = old_r - quotient * r;
        old_r = r;
        r = tmp_r;
        let tmp_s = old_s - quotient * s;
        old_s = s;
        s = tmp_s;
    }
    if old_r != 1 {
        return Err(Error::ArithmeticFailure(format!(
            "{} has no inverse mod {}: gcd = {}",
            a, q, old_r
        )));
    }
    a = ((old_s % q) + q) % q;
    Ok(a as u64)
}

/// `a^e mod q` via square-and-multiply.
pub fn power_mod(a: u64, mut e: u64, modulus: &SmallModulus) -> u64 {
    let mut base = barrett_reduce64(a, modulus);
    let mut result = 1u64 % modulus.value();
    while e > 0 {
        if e & 1 == 1 {
            result = multiply_mod(result, base, modulus);
        }
        base = multiply_mod(base, base, modulus);
        e >>= 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(v: u64) -> SmallModulus {
        SmallModulus::new(v).unwrap()
    }

    #[test]
    fn barrett_matches_naive_mod() {
        let modulus = m(0xffffee001);
        for x in [0u64, 1, 12345, 0xfffffffff, u64::MAX] {
            let expected = (x as u128 % modulus.value() as u128) as u64;
            assert_eq!(barrett_reduce64(x, &modulus), expected);
        }
    }

    #[test]
    fn barrett_full_128() {
        let modulus = m(0xffffee001);
        let lo = u64::MAX;
        let hi = u64::MAX;
        let x = ((hi as u128) << 64) | lo as u128;
        let expected = (x % modulus.value() as u128) as u64;
        assert_eq!(barrett_reduce128(lo, hi, &modulus), expected);
    }

    #[test]
    fn multiply_mod_matches_naive() {
        let modulus = m(0xffffc4001);
        let a = 0x123456789abcdefu64 % modulus.value();
        let b = 0xfedcba987654321u64 % modulus.value();
        let expected = ((a as u128) * (b as u128) % modulus.value() as u128) as u64;
        assert_eq!(multiply_mod(a, b, &modulus), expected);
    }

    #[test]
    fn invert_roundtrips() {
        let modulus = m(97);
        for a in 1..97u64 {
            let inv = invert_mod(a, &modulus).unwrap();
            assert_eq!(multiply_mod(a, inv, &modulus), 1);
        }
    }

    #[test]
    fn invert_zero_fails() {
        let modulus = m(97);
        assert!(invert_mod(0, &modulus).is_err());
    }

    #[test]
    fn power_mod_fermat() {
        let modulus = m(97);
        // a^(q-1) = 1 for a coprime to q (Fermat's little theorem).
        for a in 1..97u64 {
            assert_eq!(power_mod(a, 96, &modulus), 1);
        }
    }
}
