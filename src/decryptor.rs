//! Decryption and invariant-noise / noise-budget measurement.

use crate::ciphertext::Ciphertext;
use crate::context::ContextData;
use crate::error::Result;
use crate::keys::SecretKey;
use crate::plaintext::Plaintext;
use crate::poly::RnsPoly;
use num_bigint::{BigInt, BigUint, ToBigInt};
use num_traits::{Signed, ToPrimitive, Zero};
use parking_lot::RwLock;
use std::sync::Arc;

/// Decrypts ciphertexts under a fixed secret key and context, and measures
/// their remaining invariant-noise budget.
pub struct Decryptor {
    context: Arc<ContextData>,
    secret_key: SecretKey,
    /// Cached ascending powers of the secret key, mirroring
    /// [`crate::keys::KeyGenerator`]'s cache: decryption of a size-`K`
    /// ciphertext needs `s^1..s^{K-1}`.
    powers_cache: RwLock<Vec<RnsPoly>>,
}

impl Decryptor {
    pub fn new(context: Arc<ContextData>, secret_key: SecretKey) -> Result<Self> {
        context.check_tag(&secret_key.tag())?;
        Ok(Decryptor {
            context,
            secret_key,
            powers_cache: RwLock::new(Vec::new()),
        })
    }

    fn secret_key_power(&self, power: usize) -> RnsPoly {
        if power == 0 {
            // s^0 = 1: the constant-one polynomial, already in NTT domain
            // (NTT of the constant polynomial "1" is itself, since the
            // identity element is fixed by every evaluation map).
            let mut one = self.context.zero_poly();
            for part in one.parts_mut() {
                part.coeffs_mut()[0] = 1;
            }
            one.set_representation(crate::poly::Representation::Ntt);
            return one;
        }
        {
            let cache = self.powers_cache.read();
            if power <= cache.len() {
                return cache[power - 1].clone();
            }
        }
        let mut cache = self.powers_cache.write();
        while cache.len() < power {
            let next = if cache.is_empty() {
                self.secret_key.data().clone()
            } else {
                cache.last().unwrap().dyadic_product(self.secret_key.data())
            };
            cache.push(next);
        }
        cache[power - 1].clone()
    }

    /// `y = Σ c_i * s^i mod Q`, NTT domain.
    fn compute_y(&self, ciphertext: &Ciphertext) -> RnsPoly {
        let mut y = ciphertext.parts()[0].clone();
        for (i, c_i) in ciphertext.parts().iter().enumerate().skip(1) {
            let s_i = self.secret_key_power(i);
            y = y.add(&c_i.dyadic_product(&s_i));
        }
        y
    }

    /// Decrypts `ciphertext`, returning the recovered plaintext.
    pub fn decrypt(&self, ciphertext: &Ciphertext) -> Result<Plaintext> {
        ciphertext.check_context(&self.context)?;
        let ctx = &self.context;
        let mut y = self.compute_y(ciphertext);
        ctx.transform_from_ntt(&mut y);

        let t = BigInt::from(ctx.plain_modulus().value());
        let q = ctx.rns_base().big_modulus().to_bigint().unwrap();
        let n = ctx.degree();

        let mut coeffs = Vec::with_capacity(n);
        for k in 0..n {
            let residues: Vec<u64> = y.parts().iter().map(|p| p.coeffs()[k]).collect();
            let composed = ctx.rns_base().compose(&residues)?;
            let signed = center(&composed, &q);
            let scaled = round_div(&(signed * &t), &q);
            coeffs.push(reduce_mod_t(&scaled, &t));
        }
        Plaintext::from_coeffs(coeffs, ctx.plain_modulus(), n)
    }

    /// Exact negacyclic convolution of every `c_i * s^i` term, over centered
    /// signed big integers, summed. Used only by noise measurement — not a
    /// hot path, so exactness is preferred over RNS/NTT speed (see
    /// `crate::nussbaumer`).
    fn exact_y(&self, ciphertext: &Ciphertext) -> Vec<BigInt> {
        let ctx = &self.context;
        let n = ctx.degree();

        let mut total = vec![BigInt::zero(); n];
        let mut s_power_exact = {
            let mut one = vec![BigInt::zero(); n];
            one[0] = BigInt::from(1);
            one
        };
        let s1_exact = centered_coeffs(ctx, self.secret_key.data());

        for (i, c_i) in ciphertext.parts().iter().enumerate() {
            if i > 0 {
                s_power_exact = crate::nussbaumer::negacyclic_multiply(&s_power_exact, &s1_exact);
            }
            let c_i_exact = centered_coeffs(ctx, c_i);
            let term = crate::nussbaumer::negacyclic_multiply(&c_i_exact, &s_power_exact);
            for k in 0..n {
                total[k] += &term[k];
            }
        }
        total
    }

    /// The invariant noise infinity norm `||v||_inf`, where
    /// `v = (t*y - m*Q)/Q` computed over the exact (non-modular) convolution.
    pub fn invariant_noise(&self, ciphertext: &Ciphertext) -> Result<f64> {
        ciphertext.check_context(&self.context)?;
        let ctx = &self.context;
        let t = BigInt::from(ctx.plain_modulus().value());
        let t_u64 = ctx.plain_modulus().value();
        let q = ctx.rns_base().big_modulus().to_bigint().unwrap();
        let plaintext = self.decrypt(ciphertext)?;
        let y_exact = self.exact_y(ciphertext);

        let mut max_v = 0.0f64;
        for (k, y_k) in y_exact.iter().enumerate() {
            let m_k = plaintext.coeffs().get(k).copied().unwrap_or(0);
            let m_centered = if m_k as u64 * 2 > t_u64 {
                BigInt::from(m_k) - &t
            } else {
                BigInt::from(m_k)
            };
            let numerator = y_k * &t - &m_centered * &q;
            let v_k = ratio_to_f64(&numerator, &q).abs();
            if v_k > max_v {
                max_v = v_k;
            }
        }
        Ok(max_v)
    }

    /// `max(0, -log2(2*||v||_inf))`, in bits; `0` means decryption is no
    /// longer reliable.
    pub fn invariant_noise_budget(&self, ciphertext: &Ciphertext) -> Result<f64> {
        let v_inf = self.invariant_noise(ciphertext)?;
        if v_inf <= 0.0 {
            return Ok(f64::INFINITY);
        }
        let budget = (-(2.0 * v_inf).log2()).max(0.0);
        if budget == 0.0 {
            tracing::warn!("ciphertext has exhausted its invariant noise budget");
        }
        Ok(budget)
    }
}

/// Reduces `composed` (in `[0, q)`) to its centered representative in
/// `(-q/2, q/2]`.
fn center(composed: &BigUint, q: &BigInt) -> BigInt {
    let half_q = q / 2;
    let signed = composed.to_bigint().unwrap();
    if signed > half_q {
        signed - q
    } else {
        signed
    }
}

/// Rounds `num/den` (`den > 0`) to the nearest integer, ties away from zero.
fn round_div(num: &BigInt, den: &BigInt) -> BigInt {
    let sign = if num.is_negative() { -1 } else { 1 };
    let abs_num = num.abs();
    let abs_den = den.abs();
    let doubled = &abs_num * 2 + &abs_den;
    let q = doubled / (&abs_den * 2);
    BigInt::from(sign) * q
}

fn reduce_mod_t(v: &BigInt, t: &BigInt) -> u64 {
    let mut r = v % t;
    if r.is_negative() {
        r += t;
    }
    r.to_u64().unwrap()
}

/// Approximates `num/den` as `f64`, tolerating operands too large for a
/// direct cast by falling back to a bit-length-scaled estimate.
fn ratio_to_f64(num: &BigInt, den: &BigInt) -> f64 {
    if let (Some(n), Some(d)) = (num.to_f64(), den.to_f64()) {
        if n.is_finite() && d.is_finite() && d != 0.0 {
            return n / d;
        }
    }
    let sign = if num.is_negative() { -1.0 } else { 1.0 };
    let n_bits = num.magnitude().bits() as i64;
    let d_bits = den.magnitude().bits() as i64;
    sign * 2f64.powi((n_bits - d_bits) as i32)
}

/// Centers an RNS polynomial's coefficients (NTT domain input tolerated via
/// an explicit coefficient-domain copy) into exact signed `BigInt`s.
fn centered_coeffs(ctx: &ContextData, poly: &RnsPoly) -> Vec<BigInt> {
    let mut coeff_domain = poly.clone();
    if coeff_domain.representation() == crate::poly::Representation::Ntt {
        ctx.transform_from_ntt(&mut coeff_domain);
    }
    let q = ctx.rns_base().big_modulus().to_bigint().unwrap();
    let n = ctx.degree();
    (0..n)
        .map(|k| {
            let residues: Vec<u64> = coeff_domain.parts().iter().map(|p| p.coeffs()[k]).collect();
            let composed = ctx.rns_base().compose(&residues).unwrap();
            center(&composed, &q)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EncryptionParametersBuilder;
    use crate::encryptor::Encryptor;
    use crate::keys::KeyGenerator;
    use crate::sampling::OsEntropyGenerator;

    fn small_context() -> Arc<ContextData> {
        let params = EncryptionParametersBuilder::new()
            .set_poly_modulus_degree(1024)
            .set_coeff_modulus(vec![0xffffee001, 0xffffc4001])
            .set_plain_modulus(1024)
            .build()
            .unwrap();
        ContextData::new(params).unwrap()
    }

    #[test]
    fn fresh_ciphertext_has_positive_noise_budget() {
        let ctx = small_context();
        let mut rng = OsEntropyGenerator::new();
        let keygen = KeyGenerator::new(ctx.clone(), &mut rng);
        let encryptor = Encryptor::with_secret_key(ctx.clone(), keygen.secret_key().clone()).unwrap();
        let decryptor = Decryptor::new(ctx.clone(), keygen.secret_key().clone()).unwrap();

        let pt = Plaintext::from_coeffs(vec![7, 7, 7], ctx.plain_modulus(), ctx.degree()).unwrap();
        let ct = encryptor.encrypt_symmetric(&pt, &mut rng).unwrap();
        let budget = decryptor.invariant_noise_budget(&ct).unwrap();
        assert!(budget > 0.0, "fresh ciphertext should decrypt reliably, got budget {budget}");
    }

    #[test]
    fn decrypt_rejects_foreign_ciphertext() {
        let ctx = small_context();
        let mut rng = OsEntropyGenerator::new();
        let keygen = KeyGenerator::new(ctx.clone(), &mut rng);
        let decryptor = Decryptor::new(ctx.clone(), keygen.secret_key().clone()).unwrap();
        let mut tag = ctx.parameter_hash();
        tag[0] ^= 1;
        let bogus = Ciphertext::new(tag, vec![ctx.zero_poly(), ctx.zero_poly()]).unwrap();
        assert!(decryptor.decrypt(&bogus).is_err());
    }
}
