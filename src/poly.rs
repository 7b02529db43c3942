//! Polynomial storage: single-modulus coefficient arrays and their RNS
//! (multi-modulus) composition.
//!
//! A ring element of `R = Z[x]/(x^N+1)` is stored, per prime `q_i`, as `N`
//! 64-bit words in `[0, q_i)`. An [`RnsPoly`] stacks `L` such arrays for the
//! `L` primes of a coefficient modulus `Q = prod q_i`.

use crate::arith;
use crate::error::{Error, Result};
use crate::modulus::SmallModulus;

/// Whether a polynomial's coefficients are in standard (coefficient) order
/// or in NTT (evaluation) domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    /// Standard coefficient order: `a_0, a_1, ..., a_{N-1}`.
    Coefficient,
    /// Bit-reversed evaluation order at odd powers of a 2N-th root of unity.
    Ntt,
}

/// A single ring element reduced modulo one prime `q_i`, `N` coefficients wide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poly {
    coeffs: Vec<u64>,
    modulus: SmallModulus,
    representation: Representation,
}

impl Poly {
    /// Builds a zero polynomial of degree `< n` modulo `modulus`.
    pub fn zero(n: usize, modulus: SmallModulus, representation: Representation) -> Self {
        Poly {
            coeffs: vec![0; n],
            modulus,
            representation,
        }
    }

    /// Builds a polynomial from explicit coefficients, which must already lie in `[0, q)`.
    pub fn from_coeffs(
        coeffs: Vec<u64>,
        modulus: SmallModulus,
        representation: Representation,
    ) -> Result<Self> {
        for &c in &coeffs {
            if c >= modulus.value() {
                return Err(Error::InvalidArgument(format!(
                    "coefficient {c} out of range for modulus {}",
                    modulus.value()
                )));
            }
        }
        Ok(Poly {
            coeffs,
            modulus,
            representation,
        })
    }

    /// Ring degree `N`.
    #[inline]
    pub fn degree(&self) -> usize {
        self.coeffs.len()
    }

    #[inline]
    pub fn modulus(&self) -> SmallModulus {
        self.modulus
    }

    #[inline]
    pub fn representation(&self) -> Representation {
        self.representation
    }

    #[inline]
    pub fn coeffs(&self) -> &[u64] {
        &self.coeffs
    }

    #[inline]
    pub fn coeffs_mut(&mut self) -> &mut [u64] {
        &mut self.coeffs
    }

    pub(crate) fn set_representation(&mut self, r: Representation) {
        self.representation = r;
    }

    /// Coefficient-wise addition. Both operands must share domain/modulus/degree.
    pub fn add(&self, other: &Poly) -> Poly {
        debug_assert_eq!(self.modulus, other.modulus);
        debug_assert_eq!(self.representation, other.representation);
        let coeffs = self
            .coeffs
            .iter()
            .zip(&other.coeffs)
            .map(|(&a, &b)| arith::add_mod(a, b, &self.modulus))
            .collect();
        Poly {
            coeffs,
            modulus: self.modulus,
            representation: self.representation,
        }
    }

    /// Coefficient-wise subtraction.
    pub fn sub(&self, other: &Poly) -> Poly {
        debug_assert_eq!(self.modulus, other.modulus);
        debug_assert_eq!(self.representation, other.representation);
        let coeffs = self
            .coeffs
            .iter()
            .zip(&other.coeffs)
            .map(|(&a, &b)| arith::sub_mod(a, b, &self.modulus))
            .collect();
        Poly {
            coeffs,
            modulus: self.modulus,
            representation: self.representation,
        }
    }

    /// Coefficient-wise negation.
    pub fn negate(&self) -> Poly {
        let coeffs = self
            .coeffs
            .iter()
            .map(|&a| arith::negate_mod(a, &self.modulus))
            .collect();
        Poly {
            coeffs,
            modulus: self.modulus,
            representation: self.representation,
        }
    }

    /// Pointwise (dyadic) product. Both operands must already be in NTT domain;
    /// this equals negacyclic convolution in the coefficient domain.
    pub fn dyadic_product(&self, other: &Poly) -> Poly {
        debug_assert_eq!(self.representation, Representation::Ntt);
        debug_assert_eq!(other.representation, Representation::Ntt);
        debug_assert_eq!(self.modulus, other.modulus);
        let coeffs = self
            .coeffs
            .iter()
            .zip(&other.coeffs)
            .map(|(&a, &b)| arith::multiply_mod(a, b, &self.modulus))
            .collect();
        Poly {
            coeffs,
            modulus: self.modulus,
            representation: Representation::Ntt,
        }
    }

    /// Scales every coefficient by a constant mod q.
    pub fn scalar_multiply(&self, c: u64) -> Poly {
        let c = arith::barrett_reduce64(c, &self.modulus);
        let coeffs = self
            .coeffs
            .iter()
            .map(|&a| arith::multiply_mod(a, c, &self.modulus))
            .collect();
        Poly {
            coeffs,
            modulus: self.modulus,
            representation: self.representation,
        }
    }
}

/// An RNS (Residue Number System) ring element: `L` parallel [`Poly`]s, one
/// per prime of a coefficient modulus `Q = q_0 * q_1 * ... * q_{L-1}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RnsPoly {
    parts: Vec<Poly>,
}

impl RnsPoly {
    /// A zero element over the given moduli.
    pub fn zero(n: usize, moduli: &[SmallModulus], representation: Representation) -> Self {
        RnsPoly {
            parts: moduli
                .iter()
                .map(|&m| Poly::zero(n, m, representation))
                .collect(),
        }
    }

    /// Builds an RNS polynomial from one [`Poly`] per modulus.
    pub fn from_parts(parts: Vec<Poly>) -> Result<Self> {
        if parts.is_empty() {
            return Err(Error::InvalidArgument("RNS polynomial needs at least one part".into()));
        }
        let n = parts[0].degree();
        let repr = parts[0].representation();
        for p in &parts {
            if p.degree() != n || p.representation() != repr {
                return Err(Error::InvalidArgument(
                    "RNS polynomial parts must share degree and representation".into(),
                ));
            }
        }
        Ok(RnsPoly { parts })
    }

    #[inline]
    pub fn parts(&self) -> &[Poly] {
        &self.parts
    }

    #[inline]
    pub fn parts_mut(&mut self) -> &mut [Poly] {
        &mut self.parts
    }

    #[inline]
    pub fn num_moduli(&self) -> usize {
        self.parts.len()
    }

    #[inline]
    pub fn degree(&self) -> usize {
        self.parts[0].degree()
    }

    #[inline]
    pub fn representation(&self) -> Representation {
        self.parts[0].representation()
    }

    pub(crate) fn set_representation(&mut self, r: Representation) {
        for p in &mut self.parts {
            p.set_representation(r);
        }
    }

    pub fn add(&self, other: &RnsPoly) -> RnsPoly {
        let parts = self
            .parts
            .iter()
            .zip(&other.parts)
            .map(|(a, b)| a.add(b))
            .collect();
        RnsPoly { parts }
    }

    pub fn sub(&self, other: &RnsPoly) -> RnsPoly {
        let parts = self
            .parts
            .iter()
            .zip(&other.parts)
            .map(|(a, b)| a.sub(b))
            .collect();
        RnsPoly { parts }
    }

    pub fn negate(&self) -> RnsPoly {
        RnsPoly {
            parts: self.parts.iter().map(Poly::negate).collect(),
        }
    }

    pub fn dyadic_product(&self, other: &RnsPoly) -> RnsPoly {
        let parts = self
            .parts
            .iter()
            .zip(&other.parts)
            .map(|(a, b)| a.dyadic_product(b))
            .collect();
        RnsPoly { parts }
    }

    pub fn scalar_multiply(&self, c: u64) -> RnsPoly {
        RnsPoly {
            parts: self.parts.iter().map(|p| p.scalar_multiply(c)).collect(),
        }
    }
}
