//! Secret/public/evaluation/Galois key types and generation.
//!
//! Key-switching keys use a single global base-`2^w` digit decomposition of
//! the full integer each ciphertext coefficient represents (reconstructed by
//! CRT across every prime of `Q`), rather than SEAL's per-modulus RNS digit
//! decomposition. It is the same "digit decomposition" relinearization the
//! scheme's operation table describes, just with the digits taken over the
//! composed integer instead of over each residue independently — simpler to
//! verify by hand, at the cost of one CRT composition per coefficient during
//! both key generation and key switching. See `DESIGN.md`.

use crate::context::ContextData;
use crate::error::{Error, Result};
use crate::poly::RnsPoly;
use crate::rns_sample::{gaussian_rns_ntt, ternary_rns_ntt, uniform_rns_ntt};
use crate::sampling::UniformRandomGenerator;
use parking_lot::RwLock;
use std::sync::Arc;

/// Default decomposition bit width `w` for relinearization/Galois keys.
pub const DEFAULT_DECOMPOSITION_BIT_COUNT: u32 = 30;

/// A single RNS polynomial holding the secret, kept in NTT form once generated.
#[derive(Clone)]
pub struct SecretKey {
    tag: [u8; 32],
    data: RnsPoly,
}

impl SecretKey {
    pub fn tag(&self) -> [u8; 32] {
        self.tag
    }

    pub fn data(&self) -> &RnsPoly {
        &self.data
    }

    /// Rebuilds a secret key from its raw parts, e.g. when loading from storage.
    pub(crate) fn from_parts(tag: [u8; 32], data: RnsPoly) -> Self {
        SecretKey { tag, data }
    }
}

/// `(c0, c1)` with `c0 = -(a*s + e) mod Q`, `c1 = a`, stored in NTT form.
#[derive(Clone)]
pub struct PublicKey {
    tag: [u8; 32],
    c0: RnsPoly,
    c1: RnsPoly,
}

impl PublicKey {
    pub fn tag(&self) -> [u8; 32] {
        self.tag
    }

    pub fn c0(&self) -> &RnsPoly {
        &self.c0
    }

    pub fn c1(&self) -> &RnsPoly {
        &self.c1
    }

    pub(crate) fn from_parts(tag: [u8; 32], c0: RnsPoly, c1: RnsPoly) -> Self {
        PublicKey { tag, c0, c1 }
    }
}

/// One digit-decomposed key-switching key: `digits[j] = (A_j, B_j)`, with
/// `B_j + A_j*s = 2^{j*w} * target - e_j` (the quantity being switched to an
/// encryption under `s`), matching the `c0 = -(a*s+e)` convention `PublicKey`
/// and decryption both use.
#[derive(Clone)]
pub struct KeySwitchKey {
    digits: Vec<(RnsPoly, RnsPoly)>,
    decomposition_bit_count: u32,
}

impl KeySwitchKey {
    pub fn digits(&self) -> &[(RnsPoly, RnsPoly)] {
        &self.digits
    }

    pub fn decomposition_bit_count(&self) -> u32 {
        self.decomposition_bit_count
    }

    pub(crate) fn from_parts(digits: Vec<(RnsPoly, RnsPoly)>, decomposition_bit_count: u32) -> Self {
        KeySwitchKey { digits, decomposition_bit_count }
    }
}

/// Indexed collection of key-switching keys for relinearizing ciphertext
/// power `k+1` down to `k`, `k = 1..K_max-1`. Present entries form a prefix
/// of `1..=K_max-1`; an absent entry makes relinearizing below that size
/// impossible ([`Error::InsufficientKeys`]).
#[derive(Clone, Default)]
pub struct EvaluationKeys {
    tag: [u8; 32],
    by_power: Vec<KeySwitchKey>,
}

impl EvaluationKeys {
    pub fn tag(&self) -> [u8; 32] {
        self.tag
    }

    /// Key for relinearizing away the coefficient of `s^{power+1}`.
    pub fn get(&self, power: usize) -> Option<&KeySwitchKey> {
        self.by_power.get(power.checked_sub(1)?)
    }

    pub fn max_power(&self) -> usize {
        self.by_power.len() + 1
    }

    pub(crate) fn from_parts(tag: [u8; 32], by_power: Vec<KeySwitchKey>) -> Self {
        EvaluationKeys { tag, by_power }
    }
}

/// Keyed by Galois element `g`; like [`EvaluationKeys`] but indexed by the
/// automorphism applied rather than the ciphertext-size reduction step.
#[derive(Clone, Default)]
pub struct GaloisKeys {
    tag: [u8; 32],
    by_element: std::collections::BTreeMap<u64, KeySwitchKey>,
}

impl GaloisKeys {
    pub fn tag(&self) -> [u8; 32] {
        self.tag
    }

    pub fn get(&self, galois_element: u64) -> Option<&KeySwitchKey> {
        self.by_element.get(&galois_element)
    }

    pub fn has(&self, galois_element: u64) -> bool {
        self.by_element.contains_key(&galois_element)
    }

    pub fn elements(&self) -> impl Iterator<Item = u64> + '_ {
        self.by_element.keys().copied()
    }

    pub(crate) fn from_parts(
        tag: [u8; 32],
        by_element: std::collections::BTreeMap<u64, KeySwitchKey>,
    ) -> Self {
        GaloisKeys { tag, by_element }
    }
}

/// Generates secret/public/evaluation/Galois keys for one [`ContextData`],
/// and lazily caches ascending powers of the secret key in NTT form.
pub struct KeyGenerator {
    context: Arc<ContextData>,
    secret_key: SecretKey,
    /// `powers_cache[0] = s^1`, `powers_cache[1] = s^2`, ... grown monotonically.
    /// A readers-writer lock lets concurrent reads of already-cached powers
    /// never block each other; growing the cache takes the write lock and
    /// re-checks the length, since another writer may have raced ahead.
    powers_cache: RwLock<Vec<RnsPoly>>,
}

impl KeyGenerator {
    /// Generates a fresh secret key and wraps it in a key generator.
    pub fn new(context: Arc<ContextData>, rng: &mut dyn UniformRandomGenerator) -> Self {
        let secret_key = generate_secret_key(&context, rng);
        KeyGenerator {
            context,
            secret_key,
            powers_cache: RwLock::new(Vec::new()),
        }
    }

    /// Re-wraps an existing secret key (e.g. loaded from storage), checking
    /// it was generated under this context's parameter set.
    pub fn from_secret_key(context: Arc<ContextData>, secret_key: SecretKey) -> Result<Self> {
        context.check_tag(&secret_key.tag)?;
        Ok(KeyGenerator {
            context,
            secret_key,
            powers_cache: RwLock::new(Vec::new()),
        })
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    /// Generates a fresh public key for the held secret key.
    pub fn create_public_key(&self, rng: &mut dyn UniformRandomGenerator) -> PublicKey {
        let ctx = &self.context;
        let a = uniform_rns_ntt(ctx, rng);
        let e = gaussian_rns_ntt(ctx, rng);

        let a_s = a.dyadic_product(self.secret_key.data());
        let c0 = a_s.add(&e).negate();

        PublicKey {
            tag: ctx.parameter_hash(),
            c0,
            c1: a,
        }
    }

    /// Returns the cached NTT-domain power `s^power` (`power >= 1`),
    /// extending the cache under the write lock if necessary.
    pub fn secret_key_power(&self, power: usize) -> RnsPoly {
        assert!(power >= 1, "secret key powers are 1-indexed");
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

    /// Generates evaluation (relinearization) keys covering ciphertext sizes
    /// `2..=max_power` (entries for `k = 1..=max_power-1`).
    pub fn create_evaluation_keys(
        &self,
        max_power: usize,
        decomposition_bit_count: u32,
        rng: &mut dyn UniformRandomGenerator,
    ) -> Result<EvaluationKeys> {
        if max_power < 2 {
            return Err(Error::InvalidArgument(
                "evaluation keys require max_power >= 2".into(),
            ));
        }
        self.check_decomposition_width(decomposition_bit_count)?;
        let mut by_power = Vec::with_capacity(max_power - 1);
        for k in 1..max_power {
            let secret_power = self.secret_key_power(k + 1);
            by_power.push(self.generate_key_switch_key(&secret_power, decomposition_bit_count, rng));
        }
        tracing::debug!(max_power, decomposition_bit_count, "generated evaluation keys");
        Ok(EvaluationKeys {
            tag: self.context.parameter_hash(),
            by_power,
        })
    }

    /// Generates Galois keys for the given set of Galois elements (each must
    /// be odd and in `(1, 2N)`).
    pub fn create_galois_keys(
        &self,
        galois_elements: &[u64],
        decomposition_bit_count: u32,
        rng: &mut dyn UniformRandomGenerator,
    ) -> Result<GaloisKeys> {
        self.check_decomposition_width(decomposition_bit_count)?;
        let two_n = 2 * self.context.degree() as u64;
        let mut by_element = std::collections::BTreeMap::new();
        for &g in galois_elements {
            if g % 2 == 0 || g <= 1 || g >= two_n {
                return Err(Error::InvalidArgument(format!(
                    "Galois element {g} must be odd and in (1, 2N)"
                )));
            }
            let permuted = crate::evaluator::apply_galois_ntt(self.secret_key.data(), g, &self.context);
            let ksk = self.generate_key_switch_key(&permuted, decomposition_bit_count, rng);
            by_element.insert(g, ksk);
        }
        tracing::debug!(count = galois_elements.len(), "generated Galois keys");
        Ok(GaloisKeys {
            tag: self.context.parameter_hash(),
            by_element,
        })
    }

    fn check_decomposition_width(&self, decomposition_bit_count: u32) -> Result<()> {
        if decomposition_bit_count == 0 || decomposition_bit_count > 60 {
            return Err(Error::InvalidParameters(
                "decomposition bit count must be in [1, 60]".into(),
            ));
        }
        let digit_count = digit_count_for(&self.context, decomposition_bit_count);
        let total_multiplicands = digit_count * self.context.coeff_moduli().len();
        if total_multiplicands > self.context.max_lazy_reduction_bound() {
            return Err(Error::InvalidParameters(format!(
                "decomposition bit count {decomposition_bit_count} yields {total_multiplicands} \
                 accumulated multiplicands per coefficient, exceeding the safe bound of {}",
                self.context.max_lazy_reduction_bound()
            )));
        }
        Ok(())
    }

    /// Encrypts the digit decomposition of `2^{j*w}` scaled `target` under
    /// the held secret key.
    fn generate_key_switch_key(
        &self,
        target: &RnsPoly,
        decomposition_bit_count: u32,
        rng: &mut dyn UniformRandomGenerator,
    ) -> KeySwitchKey {
        let ctx = &self.context;
        let digit_count = digit_count_for(ctx, decomposition_bit_count);
        let mut digits = Vec::with_capacity(digit_count);
        for j in 0..digit_count {
            let shift = j as u64 * decomposition_bit_count as u64;
            let mut plain_component = target.clone();
            for (part, &qi) in plain_component.parts_mut().iter_mut().zip(ctx.coeff_moduli()) {
                // 2^shift mod q_i: shift stays small enough in practice (w <= 60,
                // digit_count bounded by Q's bit width) that a direct u64 shift
                // followed by one Barrett reduction is exact and simpler than a
                // general square-and-multiply here.
                let scale = if shift < 63 {
                    (1u64 << shift) % qi.value()
                } else {
                    crate::arith::power_mod(2, shift, &qi)
                };
                *part = part.scalar_multiply(scale);
            }

            let a = uniform_rns_ntt(ctx, rng);
            let e = gaussian_rns_ntt(ctx, rng);
            let a_s = a.dyadic_product(self.secret_key.data());
            let b = a_s.add(&e).negate().add(&plain_component);
            digits.push((a, b));
        }
        KeySwitchKey {
            digits,
            decomposition_bit_count,
        }
    }
}

/// Number of base-`2^w` digits needed to cover the full bit width of `Q`.
pub(crate) fn digit_count_for(context: &ContextData, decomposition_bit_count: u32) -> usize {
    let q_bits: u32 = context.coeff_moduli().iter().map(|m| m.bit_count()).sum();
    ((q_bits + decomposition_bit_count - 1) / decomposition_bit_count) as usize
}

fn generate_secret_key(context: &Arc<ContextData>, rng: &mut dyn UniformRandomGenerator) -> SecretKey {
    SecretKey {
        tag: context.parameter_hash(),
        data: ternary_rns_ntt(context, rng),
    }
}
