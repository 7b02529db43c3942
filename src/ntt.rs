//! Negacyclic Number-Theoretic Transform (Harvey's Cooley-Tukey / Gentleman-Sande
//! variant) for one prime `q_i ≡ 1 (mod 2N)`.
//!
//! [`NttTables`] precomputes the bit-reversed powers of a primitive `2N`-th
//! root of unity; [`forward`]/[`inverse`] carry out the in-place transform
//! used for O(N log N) ring multiplication in [`crate::poly`].

use crate::arith;
use crate::error::{Error, Result};
use crate::modulus::SmallModulus;

/// Precomputed roots-of-unity tables for the NTT over one prime `q_i`.
#[derive(Debug, Clone)]
pub struct NttTables {
    n: usize,
    log_n: u32,
    modulus: SmallModulus,
    /// `root_powers[k] = psi^(bit_reverse(k, log_n))`, forward-transform twiddles.
    root_powers: Vec<u64>,
    /// `inv_root_powers[k] = psi^(-bit_reverse(k, log_n))`, inverse-transform twiddles.
    inv_root_powers: Vec<u64>,
    /// `N^{-1} mod q`.
    inv_degree_modq: u64,
}

fn bit_reverse(mut x: u32, bits: u32) -> u32 {
    let mut r = 0u32;
    for _ in 0..bits {
        r = (r << 1) | (x & 1);
        x >>= 1;
    }
    r
}

/// Finds a generator of the multiplicative group mod `q` (a primitive `(q-1)`-th root).
fn find_primitive_root(order: u64, modulus: &SmallModulus) -> Result<u64> {
    let q = modulus.value();
    if (q - 1) % order != 0 {
        return Err(Error::InvalidParameters(format!(
            "modulus {q} does not admit an order-{order} root of unity"
        )));
    }
    let quotient = (q - 1) / order;
    // Search candidate generators g, and test g^quotient has exact order `order`.
    let mut candidate = 2u64;
    while candidate < q {
        let root = arith::power_mod(candidate, quotient, modulus);
        if is_primitive(root, order, modulus) {
            return Ok(root);
        }
        candidate += 1;
    }
    Err(Error::InvalidParameters(format!(
        "could not find a primitive {order}-th root of unity mod {q}"
    )))
}

fn is_primitive(root: u64, order: u64, modulus: &SmallModulus) -> bool {
    if root == 0 {
        return false;
    }
    if arith::power_mod(root, order, modulus) != 1 {
        return false;
    }
    // Verify no proper divisor of `order` also yields 1 (order is a power of two
    // in our use case, so it suffices to check order/2).
    if order > 1 && arith::power_mod(root, order / 2, modulus) == 1 {
        return false;
    }
    true
}

impl NttTables {
    /// Builds NTT tables for ring degree `n` (a power of two) over `modulus`,
    /// which must satisfy `modulus ≡ 1 (mod 2n)`.
    pub fn new(n: usize, modulus: SmallModulus) -> Result<Self> {
        if n == 0 || !n.is_power_of_two() {
            return Err(Error::InvalidParameters("N must be a power of two".into()));
        }
        let log_n = n.trailing_zeros();
        let two_n = 2 * n as u64;
        if (modulus.value() - 1) % two_n != 0 {
            return Err(Error::InvalidParameters(format!(
                "modulus {} is not congruent to 1 mod 2N={}",
                modulus.value(),
                two_n
            )));
        }
        let psi = find_primitive_root(two_n, &modulus)?;
        let psi_inv = arith::invert_mod(psi, &modulus)?;

        let mut root_powers = vec![0u64; n];
        let mut inv_root_powers = vec![0u64; n];
        for k in 0..n {
            let br = bit_reverse(k as u32, log_n) as u64;
            root_powers[k] = arith::power_mod(psi, br, &modulus);
            inv_root_powers[k] = arith::power_mod(psi_inv, br, &modulus);
        }
        let inv_degree_modq = arith::invert_mod(n as u64 % modulus.value(), &modulus)?;

        Ok(NttTables {
            n,
            log_n,
            modulus,
            root_powers,
            inv_root_powers,
            inv_degree_modq,
        })
    }

    #[inline]
    pub fn degree(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn modulus(&self) -> SmallModulus {
        self.modulus
    }
}

/// Forward negacyclic NTT, in place. Input/output fully reduced to `[0, q)`
/// (this port performs eager reduction throughout; see `crate::arith`).
///
/// Input: coefficients in standard order. Output: bit-reversed evaluation
/// order at the odd powers `psi^(2k+1)`.
pub fn forward(values: &mut [u64], tables: &NttTables) {
    debug_assert_eq!(values.len(), tables.n);
    let n = tables.n;
    let modulus = &tables.modulus;
    let mut t = n;
    let mut m = 1;
    while m < n {
        t /= 2;
        for i in 0..m {
            let w = tables.root_powers[m + i];
            let j1 = 2 * i * t;
            let j2 = j1 + t;
            for j in j1..j2 {
                let u = values[j];
                let v = arith::multiply_mod(values[j + t], w, modulus);
                values[j] = arith::add_mod(u, v, modulus);
                values[j + t] = arith::sub_mod(u, v, modulus);
            }
        }
        m *= 2;
    }
}

/// Inverse negacyclic NTT (Gentleman-Sande), in place, dual of [`forward`].
pub fn inverse(values: &mut [u64], tables: &NttTables) {
    debug_assert_eq!(values.len(), tables.n);
    let n = tables.n;
    let modulus = &tables.modulus;
    let mut t = 1;
    let mut m = n;
    while m > 1 {
        let mut j1 = 0;
        let h = m / 2;
        for i in 0..h {
            let w = tables.inv_root_powers[h + i];
            let j2 = j1 + t;
            for j in j1..j2 {
                let u = values[j];
                let v = values[j + t];
                values[j] = arith::add_mod(u, v, modulus);
                let diff = arith::sub_mod(u, v, modulus);
                values[j + t] = arith::multiply_mod(diff, w, modulus);
            }
            j1 += 2 * t;
        }
        t *= 2;
        m /= 2;
    }
    for v in values.iter_mut() {
        *v = arith::multiply_mod(*v, tables.inv_degree_modq, modulus);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables_1024() -> NttTables {
        NttTables::new(1024, SmallModulus::new(0xffffee001).unwrap()).unwrap()
    }

    #[test]
    fn forward_inverse_is_identity() {
        let tables = tables_1024();
        let mut rng_state = 12345u64;
        let mut next = || {
            rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
            rng_state % tables.modulus().value()
        };
        let original: Vec<u64> = (0..tables.degree()).map(|_| next()).collect();
        let mut values = original.clone();
        forward(&mut values, &tables);
        inverse(&mut values, &tables);
        assert_eq!(values, original);
    }

    #[test]
    fn pointwise_product_matches_negacyclic_convolution_small() {
        // Use a tiny prime/degree to brute-force-check against schoolbook negacyclic
        // convolution: (a*b mod x^n+1) computed directly.
        let n = 8usize;
        let modulus = SmallModulus::new(17).unwrap(); // 17 = 1 mod 16
        let tables = NttTables::new(n, modulus).unwrap();
        let a = vec![1u64, 2, 3, 4, 0, 0, 0, 0];
        let b = vec![5u64, 6, 0, 0, 0, 0, 0, 0];

        // Schoolbook negacyclic convolution.
        let mut expected = vec![0u64; n];
        for i in 0..n {
            for j in 0..n {
                let idx = i + j;
                let prod = (a[i] * b[j]) % modulus.value();
                if idx < n {
                    expected[idx] = (expected[idx] + prod) % modulus.value();
                } else {
                    let idx = idx - n;
                    expected[idx] = (expected[idx] + modulus.value() - prod % modulus.value())
                        % modulus.value();
                }
            }
        }

        let mut av = a.clone();
        let mut bv = b.clone();
        forward(&mut av, &tables);
        forward(&mut bv, &tables);
        let mut cv: Vec<u64> = av
            .iter()
            .zip(&bv)
            .map(|(&x, &y)| arith::multiply_mod(x, y, &modulus))
            .collect();
        inverse(&mut cv, &tables);
        assert_eq!(cv, expected);
    }
}
