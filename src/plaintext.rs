//! [`Plaintext`]: a single non-RNS polynomial with coefficients in `[0, t)`.

use crate::error::{Error, Result};
use crate::modulus::SmallModulus;

/// A message in `R_t = Z_t[x]/(x^N+1)`: `N` coefficients, each in `[0, t)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plaintext {
    coeffs: Vec<u64>,
}

impl Plaintext {
    /// Builds a plaintext from coefficients already reduced modulo `t`,
    /// rejecting out-of-range values or a degree exceeding `max_degree`.
    pub fn from_coeffs(coeffs: Vec<u64>, plain_modulus: SmallModulus, max_degree: usize) -> Result<Self> {
        if coeffs.len() > max_degree {
            return Err(Error::InvalidPlaintext(format!(
                "plaintext has {} coefficients, exceeds ring degree {max_degree}",
                coeffs.len()
            )));
        }
        for &c in &coeffs {
            if c >= plain_modulus.value() {
                return Err(Error::InvalidPlaintext(format!(
                    "coefficient {c} out of range for plaintext modulus {}",
                    plain_modulus.value()
                )));
            }
        }
        Ok(Plaintext { coeffs })
    }

    /// A single-coefficient plaintext encoding the scalar `value mod t`.
    pub fn from_scalar(value: u64, plain_modulus: SmallModulus) -> Self {
        Plaintext {
            coeffs: vec![value % plain_modulus.value()],
        }
    }

    pub fn zero() -> Self {
        Plaintext { coeffs: Vec::new() }
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0)
    }

    pub fn coeffs(&self) -> &[u64] {
        &self.coeffs
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len()
    }

    /// Coefficients zero-padded (or truncated) to exactly `n` entries, the
    /// form the evaluator and encryptor operate on.
    pub fn padded_coeffs(&self, n: usize) -> Vec<u64> {
        let mut out = vec![0u64; n];
        let copy_len = self.coeffs.len().min(n);
        out[..copy_len].copy_from_slice(&self.coeffs[..copy_len]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_coefficient() {
        let t = SmallModulus::new(1024).unwrap();
        assert!(Plaintext::from_coeffs(vec![1024], t, 1024).is_err());
        assert!(Plaintext::from_coeffs(vec![1023], t, 1024).is_ok());
    }

    #[test]
    fn rejects_overlong_plaintext() {
        let t = SmallModulus::new(1024).unwrap();
        assert!(Plaintext::from_coeffs(vec![0; 5], t, 4).is_err());
    }

    #[test]
    fn padded_coeffs_zero_fills() {
        let t = SmallModulus::new(1024).unwrap();
        let p = Plaintext::from_coeffs(vec![1, 2, 3], t, 1024).unwrap();
        let padded = p.padded_coeffs(8);
        assert_eq!(padded, vec![1, 2, 3, 0, 0, 0, 0, 0]);
    }
}
