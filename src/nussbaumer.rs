//! Nussbaumer-style large-integer negacyclic polynomial multiplication.
//!
//! Used by [`crate::decryptor::Decryptor::invariant_noise`] to compute the *exact*
//! integer negacyclic convolution `t * sum(c_i * s^i)` needed for invariant
//! noise measurement — this is explicitly not a per-operation hot path, so
//! this favors an auditable exact-arithmetic implementation over a
//! hand-optimized multi-limb version.
//!
//! The recursive structure: a degree-N negacyclic product is
//! decomposed into an `m x r` grid (`m = 2^floor(log2(N)/2)`, `r = N/m`),
//! combined via sub-products reduced modulo `(y^m + 1)`, with a direct
//! schoolbook negacyclic convolution as the base case for `N <= 8`.

use num_bigint::BigInt;
use num_traits::Zero;

/// Negacyclic convolution `c = a * b mod (x^N + 1)` over exact (unbounded)
/// integers, where `N = a.len() = b.len()` is a power of two.
pub fn negacyclic_multiply(a: &[BigInt], b: &[BigInt]) -> Vec<BigInt> {
    let n = a.len();
    debug_assert_eq!(a.len(), b.len());
    debug_assert!(n.is_power_of_two());
    if n <= 8 {
        return base_case_negacyclic(a, b);
    }
    let log_n = n.trailing_zeros();
    let log_m = log_n / 2;
    let m = 1usize << log_m;
    let r = n / m;

    // Grid split: a[i + j*r] -> A_i(y), coefficient of y^j, i in [0,r), j in [0,m).
    let a_rows = split_grid(a, r, m);
    let b_rows = split_grid(b, r, m);

    // C_k(y) accumulators, degree < m each, for k in [0, r).
    let mut c_rows: Vec<Vec<BigInt>> = vec![vec![BigInt::zero(); m]; r];

    for i in 0..r {
        for ip in 0..r {
            let prod = linear_multiply(&a_rows[i], &b_rows[ip]); // degree up to 2m-2
            let k = (i + ip) % r;
            let wrapped = i + ip >= r;
            accumulate_reduced(&mut c_rows[k], &prod, m, wrapped);
        }
    }

    // Recombine: c[k + j*r] = c_rows[k][j].
    let mut result = vec![BigInt::zero(); n];
    for k in 0..r {
        for j in 0..m {
            result[k + j * r] = c_rows[k][j].clone();
        }
    }
    result
}

/// Computes `a*a`, `b*b`, and `a*b` together, sharing the grid decomposition.
pub fn negacyclic_cross_multiply(
    a: &[BigInt],
    b: &[BigInt],
) -> (Vec<BigInt>, Vec<BigInt>, Vec<BigInt>) {
    (
        negacyclic_multiply(a, a),
        negacyclic_multiply(b, b),
        negacyclic_multiply(a, b),
    )
}

fn split_grid(a: &[BigInt], r: usize, m: usize) -> Vec<Vec<BigInt>> {
    let mut rows = vec![vec![BigInt::zero(); m]; r];
    for i in 0..r {
        for j in 0..m {
            rows[i][j] = a[i + j * r].clone();
        }
    }
    rows
}

/// `i + y`-shifted reduction of a degree `< 2m-1` polynomial modulo `(y^m + 1)`,
/// accumulated into `acc` (degree `< m`). If `wrapped`, the product is first
/// multiplied by `y` (shifted up one degree) to account for `x^i * x^{i'} = x^{i+i'-r} * x^r`.
fn accumulate_reduced(acc: &mut [BigInt], prod: &[BigInt], m: usize, wrapped: bool) {
    // Conceptually: shifted[j] = prod[j-1] if wrapped else prod[j], for j in [0, len).
    let shift = if wrapped { 1 } else { 0 };
    let len = prod.len() + shift;
    for j in 0..len {
        let coeff = if j < shift {
            continue;
        } else {
            &prod[j - shift]
        };
        if j < m {
            acc[j] += coeff;
        } else {
            // y^m = -1, so y^(m + e) = -y^e.
            acc[j - m] -= coeff;
        }
    }
}

/// Plain (non-cyclic, non-modular) schoolbook convolution: result has
/// `a.len() + b.len() - 1` coefficients.
fn linear_multiply(a: &[BigInt], b: &[BigInt]) -> Vec<BigInt> {
    let mut result = vec![BigInt::zero(); a.len() + b.len() - 1];
    for (i, ai) in a.iter().enumerate() {
        if ai.is_zero() {
            continue;
        }
        for (j, bj) in b.iter().enumerate() {
            if bj.is_zero() {
                continue;
            }
            result[i + j] += ai * bj;
        }
    }
    result
}

fn base_case_negacyclic(a: &[BigInt], b: &[BigInt]) -> Vec<BigInt> {
    let n = a.len();
    let mut result = vec![BigInt::zero(); n];
    for i in 0..n {
        if a[i].is_zero() {
            continue;
        }
        for j in 0..n {
            if b[j].is_zero() {
                continue;
            }
            let prod = &a[i] * &b[j];
            let idx = i + j;
            if idx < n {
                result[idx] += prod;
            } else {
                result[idx - n] -= prod;
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bi(v: i64) -> BigInt {
        BigInt::from(v)
    }

    #[test]
    fn matches_base_case_for_small_n() {
        let a: Vec<BigInt> = [1, 2, 3, 4, 5, 6, 7, 8].iter().map(|&v| bi(v)).collect();
        let b: Vec<BigInt> = [8, 7, 6, 5, 4, 3, 2, 1].iter().map(|&v| bi(v)).collect();
        let expected = base_case_negacyclic(&a, &b);
        let got = negacyclic_multiply(&a, &b);
        assert_eq!(got, expected);
    }

    #[test]
    fn matches_base_case_for_n16() {
        let n = 16;
        let a: Vec<BigInt> = (0..n).map(|i| bi((i + 1) as i64)).collect();
        let b: Vec<BigInt> = (0..n).map(|i| bi((n - i) as i64)).collect();
        let expected = base_case_negacyclic(&a, &b);
        let got = negacyclic_multiply(&a, &b);
        assert_eq!(got, expected);
    }

    #[test]
    fn matches_base_case_for_n64_random() {
        let n = 64;
        let mut state = 42u64;
        let mut next = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((state >> 33) % 1000) as i64 - 500
        };
        let a: Vec<BigInt> = (0..n).map(|_| bi(next())).collect();
        let b: Vec<BigInt> = (0..n).map(|_| bi(next())).collect();
        let expected = base_case_negacyclic(&a, &b);
        let got = negacyclic_multiply(&a, &b);
        assert_eq!(got, expected);
    }

    #[test]
    fn cross_multiply_matches_individual_calls() {
        let n = 16;
        let a: Vec<BigInt> = (0..n).map(|i| bi((i + 1) as i64)).collect();
        let b: Vec<BigInt> = (0..n).map(|i| bi((2 * i + 1) as i64)).collect();
        let (aa, bb, ab) = negacyclic_cross_multiply(&a, &b);
        assert_eq!(aa, negacyclic_multiply(&a, &a));
        assert_eq!(bb, negacyclic_multiply(&b, &b));
        assert_eq!(ab, negacyclic_multiply(&a, &b));
    }

    #[test]
    fn identity_element_is_neutral() {
        let n = 32;
        let mut one = vec![BigInt::zero(); n];
        one[0] = bi(1);
        let a: Vec<BigInt> = (0..n).map(|i| bi(i as i64)).collect();
        let got = negacyclic_multiply(&a, &one);
        assert_eq!(got, a);
    }
}
