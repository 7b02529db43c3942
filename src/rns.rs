//! RNS (Residue Number System) base representation and base conversion.
//!
//! An [`RnsBase`] is an ordered list of pairwise-coprime [`SmallModulus`]
//! primes together with the precomputed CRT coefficients needed to convert
//! a residue tuple to another base ([`BaseConverter`]) or to reconstruct the
//! exact big integer it represents.

use crate::arith;
use crate::error::{Error, Result};
use crate::modulus::SmallModulus;
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

/// An ordered list of pairwise-coprime primes with precomputed CRT data.
#[derive(Debug, Clone)]
pub struct RnsBase {
    moduli: Vec<SmallModulus>,
    /// Product of all moduli, `Q = prod q_i`, as an exact big integer.
    big_modulus: BigUint,
    /// `punctured_product[i] = Q / q_i`.
    punctured_products: Vec<BigUint>,
    /// `inv_punctured_product[i] = (Q / q_i)^{-1} mod q_i`.
    inv_punctured_products_modqi: Vec<u64>,
}

impl RnsBase {
    /// Builds an `RnsBase`, rejecting non-distinct moduli.
    pub fn new(moduli: Vec<SmallModulus>) -> Result<Self> {
        if moduli.is_empty() {
            return Err(Error::InvalidParameters(
                "RNS base requires at least one modulus".into(),
            ));
        }
        for i in 0..moduli.len() {
            for j in (i + 1)..moduli.len() {
                if moduli[i].value() == moduli[j].value() {
                    return Err(Error::InvalidParameters(format!(
                        "duplicate modulus {} in RNS base",
                        moduli[i].value()
                    )));
                }
            }
        }
        let big_modulus = moduli
            .iter()
            .fold(BigUint::from(1u64), |acc, m| acc * m.value());

        let mut punctured_products = Vec::with_capacity(moduli.len());
        let mut inv_punctured_products_modqi = Vec::with_capacity(moduli.len());
        for m in &moduli {
            let punctured = &big_modulus / m.value();
            let punctured_modqi = (&punctured % m.value()).to_u64().unwrap();
            let inv = arith::invert_mod(punctured_modqi, m).map_err(|_| {
                Error::InvalidParameters(format!(
                    "modulus {} is not coprime with the rest of the RNS base",
                    m.value()
                ))
            })?;
            punctured_products.push(punctured);
            inv_punctured_products_modqi.push(inv);
        }

        Ok(RnsBase {
            moduli,
            big_modulus,
            punctured_products,
            inv_punctured_products_modqi,
        })
    }

    #[inline]
    pub fn moduli(&self) -> &[SmallModulus] {
        &self.moduli
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.moduli.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.moduli.is_empty()
    }

    #[inline]
    pub fn big_modulus(&self) -> &BigUint {
        &self.big_modulus
    }

    /// Exact CRT reconstruction of the integer represented by `residues`
    /// (one residue per modulus, in base order).
    pub fn compose(&self, residues: &[u64]) -> Result<BigUint> {
        if residues.len() != self.moduli.len() {
            return Err(Error::InvalidArgument(
                "residue count must match RNS base length".into(),
            ));
        }
        let mut acc = BigUint::zero();
        for i in 0..self.moduli.len() {
            let qi = self.moduli[i];
            let term = arith::multiply_mod(residues[i], self.inv_punctured_products_modqi[i], &qi);
            acc += &self.punctured_products[i] * term;
        }
        Ok(acc % &self.big_modulus)
    }

    /// Reduces an exact big integer down to its residues in this base.
    pub fn decompose(&self, value: &BigUint) -> Vec<u64> {
        self.moduli
            .iter()
            .map(|m| (value % m.value()).to_u64().unwrap())
            .collect()
    }
}

/// Converts RNS residue tuples from one base to another via CRT reconstruction
/// followed by reduction ("fast base conversion").
///
/// This always produces the exact correct residues (it reconstructs the full
/// integer via [`RnsBase::compose`] rather than SEAL's approximate
/// single-word fast-conversion-plus-correction scheme); see `DESIGN.md` for
/// the tradeoff. Correctness-critical scaling (`divide_and_round_q_last`)
/// below computes `round(value * t / Q)` exactly, coefficient by coefficient.
pub struct BaseConverter {
    from: RnsBase,
    to: RnsBase,
}

impl BaseConverter {
    pub fn new(from: RnsBase, to: RnsBase) -> Self {
        BaseConverter { from, to }
    }

    #[inline]
    pub fn from_base(&self) -> &RnsBase {
        &self.from
    }

    #[inline]
    pub fn to_base(&self) -> &RnsBase {
        &self.to
    }

    /// Converts one polynomial's coefficients (organized as `residues[i][k]`,
    /// modulus index `i`, coefficient index `k`) from `self.from` to `self.to`.
    pub fn fast_convert_array(&self, residues: &[Vec<u64>]) -> Result<Vec<Vec<u64>>> {
        if residues.len() != self.from.len() {
            return Err(Error::InvalidArgument(
                "residue array modulus count must match source base".into(),
            ));
        }
        let n = residues[0].len();
        let mut out = vec![vec![0u64; n]; self.to.len()];
        for k in 0..n {
            let column: Vec<u64> = residues.iter().map(|row| row[k]).collect();
            let value = self.from.compose(&column)?;
            let converted = self.to.decompose(&value);
            for i in 0..self.to.len() {
                out[i][k] = converted[i];
            }
        }
        Ok(out)
    }

    /// Divide-and-round by the product of `self.from`'s moduli, scaled by `t`:
    /// approximates `round(value * t / Q)` entirely in RNS, producing residues
    /// in `self.to`. Used by homomorphic multiplication's scale-down step.
    pub fn divide_and_round_q_last(&self, residues: &[Vec<u64>], t: u64) -> Result<Vec<Vec<u64>>> {
        if residues.len() != self.from.len() {
            return Err(Error::InvalidArgument(
                "residue array modulus count must match source base".into(),
            ));
        }
        let n = residues[0].len();
        let q = self.from.big_modulus().clone();
        let mut out = vec![vec![0u64; n]; self.to.len()];
        for k in 0..n {
            let column: Vec<u64> = residues.iter().map(|row| row[k]).collect();
            let value = self.from.compose(&column)?;
            let scaled_num = &value * t;
            // round(scaled_num / q) using integer arithmetic: floor((2*num + q) / (2*q)).
            let rounded = (&scaled_num * 2u32 + &q) / (&q * 2u32);
            let converted = self.to.decompose(&rounded);
            for i in 0..self.to.len() {
                out[i][k] = converted[i];
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moduli(vs: &[u64]) -> Vec<SmallModulus> {
        vs.iter().map(|&v| SmallModulus::new(v).unwrap()).collect()
    }

    #[test]
    fn compose_decompose_roundtrip() {
        let base = RnsBase::new(moduli(&[97, 101, 103])).unwrap();
        let value = BigUint::from(123456789u64);
        let residues = base.decompose(&value);
        let back = base.compose(&residues).unwrap();
        assert_eq!(back, value % base.big_modulus());
    }

    #[test]
    fn rejects_duplicate_moduli() {
        assert!(RnsBase::new(moduli(&[97, 97])).is_err());
    }

    #[test]
    fn fast_convert_preserves_value_when_target_base_is_larger() {
        let from = RnsBase::new(moduli(&[97, 101])).unwrap();
        let to = RnsBase::new(moduli(&[97, 101, 103])).unwrap();
        let converter = BaseConverter::new(from.clone(), to.clone());
        let value = BigUint::from(5000u64);
        let residues = from.decompose(&value);
        let array = vec![vec![residues[0]], vec![residues[1]]];
        let converted = converter.fast_convert_array(&array).unwrap();
        let composed = to
            .compose(&[converted[0][0], converted[1][0], converted[2][0]])
            .unwrap();
        assert_eq!(composed, value % to.big_modulus());
    }

    #[test]
    fn divide_and_round_matches_expected_scaling() {
        let from = RnsBase::new(moduli(&[97, 101])).unwrap();
        let to = RnsBase::new(moduli(&[103])).unwrap();
        let converter = BaseConverter::new(from.clone(), to.clone());
        let value = BigUint::from(50u64);
        let residues = from.decompose(&value);
        let array = vec![vec![residues[0]], vec![residues[1]]];
        let t = 7u64;
        let result = converter.divide_and_round_q_last(&array, t).unwrap();
        let q = from.big_modulus();
        let expected_num = &value * t;
        let expected = (&expected_num * 2u32 + q) / (q * 2u32);
        let got = to.compose(&[result[0][0]]).unwrap();
        assert_eq!(got, expected % to.big_modulus());
    }
}
