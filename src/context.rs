//! Encryption parameters, their validation, and the precomputed tables
//! ([`ContextData`]) every other component consumes.

use crate::error::{Error, Result};
use crate::modulus::SmallModulus;
use crate::ntt::NttTables;
use crate::poly::{Poly, Representation};
use crate::rns::RnsBase;
use crate::sampling::{OsEntropyGeneratorFactory, RandomGeneratorFactory};
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::ToPrimitive;
use sha3::{Digest, Sha3_256};
use std::sync::Arc;

/// Minimum and maximum permitted ring degree.
pub const MIN_POLY_MODULUS_DEGREE: usize = 1024;
pub const MAX_POLY_MODULUS_DEGREE: usize = 32768;

/// Conservative bound on the number of lazy-reduction multiplicands
/// permitted in relinearization's digit-decomposition accumulation.
///
/// The reference design hard-codes `63`, assuming specific Barrett-constant
/// widths. This port performs eager reduction after every multiply-accumulate
/// (see `crate::arith`), so it does not *need* a lazy-reduction bound for
/// correctness, but still performs the equivalent safety *check* at
/// context-construction time (see `DESIGN.md`). We re-derive the bound for
/// 64-bit words: each accumulated term is `< q^2 < 2^120`, and
/// we require the running sum to stay representable without overflowing a
/// 64-bit-word lazy accumulator of width `4q` before a reduction — i.e. the
/// same headroom SEAL assumes for its 60-bit moduli. That yields the same
/// bound of 63 for 60-bit primes; we keep the derivation explicit here so a
/// different word width could re-derive it rather than hard-coding `63`.
pub fn max_lazy_reduction_multiplicands(modulus_bit_count: u32) -> usize {
    // Lazy accumulation is safe while `k * q^2 < 2^(2*64)`, i.e.
    // `k < 2^128 / q^2 = 2^(128 - 2*bit_count)`.
    let shift = 128i64 - 2 * modulus_bit_count as i64;
    if shift <= 0 {
        1
    } else {
        (1usize << shift.min(63)).min(63.max(1))
    }
}

/// Fallible builder for [`EncryptionParameters`], mirroring the configuration
/// surface of spec §6: `set_poly_modulus_degree`, `set_coeff_modulus`,
/// `set_plain_modulus`, `set_noise_standard_deviation`, `set_random_generator`.
#[derive(Default)]
pub struct EncryptionParametersBuilder {
    poly_modulus_degree: Option<usize>,
    coeff_modulus: Option<Vec<u64>>,
    plain_modulus: Option<u64>,
    noise_standard_deviation: Option<f64>,
}

impl EncryptionParametersBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_poly_modulus_degree(mut self, n: usize) -> Self {
        self.poly_modulus_degree = Some(n);
        self
    }

    pub fn set_coeff_modulus(mut self, moduli: Vec<u64>) -> Self {
        self.coeff_modulus = Some(moduli);
        self
    }

    pub fn set_plain_modulus(mut self, t: u64) -> Self {
        self.plain_modulus = Some(t);
        self
    }

    pub fn set_noise_standard_deviation(mut self, sigma: f64) -> Self {
        self.noise_standard_deviation = Some(sigma);
        self
    }

    pub fn build(self) -> Result<EncryptionParameters> {
        let n = self
            .poly_modulus_degree
            .ok_or_else(|| Error::InvalidParameters("poly_modulus_degree is required".into()))?;
        let coeff_modulus = self
            .coeff_modulus
            .ok_or_else(|| Error::InvalidParameters("coeff_modulus is required".into()))?;
        let plain_modulus = self
            .plain_modulus
            .ok_or_else(|| Error::InvalidParameters("plain_modulus is required".into()))?;
        let sigma = self.noise_standard_deviation.unwrap_or(3.19);

        Ok(EncryptionParameters {
            poly_modulus_degree: n,
            coeff_modulus,
            plain_modulus,
            noise_standard_deviation: sigma,
        })
    }
}

/// The user-facing parameter set, before validation/precomputation.
#[derive(Debug, Clone)]
pub struct EncryptionParameters {
    poly_modulus_degree: usize,
    coeff_modulus: Vec<u64>,
    plain_modulus: u64,
    noise_standard_deviation: f64,
}

impl EncryptionParameters {
    pub fn poly_modulus_degree(&self) -> usize {
        self.poly_modulus_degree
    }

    pub fn coeff_modulus(&self) -> &[u64] {
        &self.coeff_modulus
    }

    pub fn plain_modulus(&self) -> u64 {
        self.plain_modulus
    }

    pub fn noise_standard_deviation(&self) -> f64 {
        self.noise_standard_deviation
    }
}

/// Whether a parameter set supports optional scheme features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptionParameterQualifiers {
    pub parameters_set: bool,
    pub using_batching: bool,
    pub using_fast_plain_lift: bool,
}

/// Immutable, fully precomputed context for one parameter set.
///
/// Built once; consumed by [`crate::keys::KeyGenerator`], `Encryptor`,
/// `Decryptor`, and `Evaluator` for the lifetime of the parameter set.
pub struct ContextData {
    parameters: EncryptionParameters,
    coeff_moduli: Vec<SmallModulus>,
    plain_modulus: SmallModulus,
    ntt_tables: Vec<NttTables>,
    rns_base: RnsBase,
    /// Auxiliary RNS base `Q_extra`, used to absorb growth during homomorphic
    /// multiplication without wraparound (spec §4.4).
    aux_base: RnsBase,
    /// NTT tables for `aux_base`'s primes, each generated congruent to `1 mod 2N`
    /// just like `rns_base`'s, so dyadic products work there too.
    aux_ntt_tables: Vec<NttTables>,
    /// `rns_base`'s primes followed by `aux_base`'s: `Q * Q_extra`, large enough
    /// that a tensor-product coefficient's exact (centered) value never wraps.
    extended_base: RnsBase,
    qualifiers: EncryptionParameterQualifiers,
    parameter_hash: [u8; 32],
    /// `[Q mod t]`: used when lifting a plaintext into ciphertext scale.
    q_mod_t: u64,
    /// `⌊Q/t⌋`, the plaintext scaling factor `delta`, as an exact integer.
    delta: BigUint,
    max_lazy_reduction_bound: usize,
}

impl ContextData {
    /// Validates `parameters` and precomputes every derived table (RNS base,
    /// NTT tables per prime, `delta`, the parameter-hash tag). On failure,
    /// returns an error rather than a degraded "parameters_set = false"
    /// sentinel object — callers match on the error and construct nothing.
    pub fn new(parameters: EncryptionParameters) -> Result<Arc<Self>> {
        let n = parameters.poly_modulus_degree;
        if n < MIN_POLY_MODULUS_DEGREE || n > MAX_POLY_MODULUS_DEGREE || !n.is_power_of_two() {
            return Err(Error::InvalidParameters(format!(
                "poly_modulus_degree must be a power of two in [{MIN_POLY_MODULUS_DEGREE}, {MAX_POLY_MODULUS_DEGREE}], got {n}"
            )));
        }

        if parameters.coeff_modulus.is_empty() {
            return Err(Error::InvalidParameters(
                "coeff_modulus must contain at least one prime".into(),
            ));
        }

        let mut coeff_moduli = Vec::with_capacity(parameters.coeff_modulus.len());
        for &q in &parameters.coeff_modulus {
            let sm = SmallModulus::new(q)?;
            if !is_probable_prime(q) {
                return Err(Error::InvalidParameters(format!("{q} is not prime")));
            }
            let two_n = 2 * n as u64;
            if (q - 1) % two_n != 0 {
                return Err(Error::InvalidParameters(format!(
                    "coeff modulus {q} is not congruent to 1 mod 2N"
                )));
            }
            coeff_moduli.push(sm);
        }
        for i in 0..coeff_moduli.len() {
            for j in (i + 1)..coeff_moduli.len() {
                if coeff_moduli[i].value() == coeff_moduli[j].value() {
                    return Err(Error::InvalidParameters("coeff_modulus entries must be distinct".into()));
                }
            }
        }

        let plain_modulus = SmallModulus::new(parameters.plain_modulus)?;
        if parameters.plain_modulus < 2 {
            return Err(Error::InvalidParameters("plain_modulus must be >= 2".into()));
        }

        if parameters.noise_standard_deviation <= 0.0 {
            return Err(Error::InvalidParameters(
                "noise_standard_deviation must be positive".into(),
            ));
        }

        let ntt_tables = coeff_moduli
            .iter()
            .map(|&m| NttTables::new(n, m))
            .collect::<Result<Vec<_>>>()?;

        let rns_base = RnsBase::new(coeff_moduli.clone())?;

        // Auxiliary RNS base: generate one extra ~60-bit prime per base modulus
        // (matching the multiplication tensor's size requirement) distinct from Q.
        let mut aux_primes = Vec::with_capacity(coeff_moduli.len() + 1);
        let mut candidate_bits: u32 = 60;
        while aux_primes.len() < coeff_moduli.len() + 1 {
            if let Some(p) = generate_prime_of_size(candidate_bits, n as u64, &coeff_moduli, &aux_primes) {
                aux_primes.push(p);
            } else if candidate_bits > 20 {
                candidate_bits -= 1;
            } else {
                return Err(Error::InvalidParameters(
                    "could not generate enough auxiliary primes for multiplication".into(),
                ));
            }
        }
        let aux_moduli: Vec<SmallModulus> =
            aux_primes.iter().map(|&p| SmallModulus::new(p).unwrap()).collect();
        let aux_ntt_tables = aux_moduli
            .iter()
            .map(|&m| NttTables::new(n, m))
            .collect::<Result<Vec<_>>>()?;
        let aux_base = RnsBase::new(aux_moduli.clone())?;
        let extended_base = RnsBase::new(
            coeff_moduli.iter().copied().chain(aux_moduli).collect(),
        )?;

        // Qualifiers.
        let using_batching = is_probable_prime(parameters.plain_modulus)
            && (parameters.plain_modulus - 1) % (2 * n as u64) == 0;
        let using_fast_plain_lift = coeff_moduli.iter().all(|m| m.value() > parameters.plain_modulus);

        let q_big = rns_base.big_modulus().clone();
        let t = parameters.plain_modulus;
        let q_mod_t = (&q_big % t).to_u64().unwrap();
        let delta = &q_big / t;

        let max_lazy_reduction_bound = coeff_moduli
            .iter()
            .map(|m| max_lazy_reduction_multiplicands(m.bit_count()))
            .min()
            .unwrap_or(1);

        let parameter_hash = compute_parameter_hash(&parameters);

        tracing::debug!(
            n,
            moduli = parameters.coeff_modulus.len(),
            t = parameters.plain_modulus,
            "constructed BFV context"
        );

        Ok(Arc::new(ContextData {
            parameters,
            coeff_moduli,
            plain_modulus,
            ntt_tables,
            rns_base,
            aux_base,
            aux_ntt_tables,
            extended_base,
            qualifiers: EncryptionParameterQualifiers {
                parameters_set: true,
                using_batching,
                using_fast_plain_lift,
            },
            parameter_hash,
            q_mod_t,
            delta,
            max_lazy_reduction_bound,
        }))
    }

    pub fn parameters(&self) -> &EncryptionParameters {
        &self.parameters
    }

    pub fn degree(&self) -> usize {
        self.parameters.poly_modulus_degree
    }

    pub fn coeff_moduli(&self) -> &[SmallModulus] {
        &self.coeff_moduli
    }

    pub fn plain_modulus(&self) -> SmallModulus {
        self.plain_modulus
    }

    pub fn ntt_tables(&self) -> &[NttTables] {
        &self.ntt_tables
    }

    pub fn rns_base(&self) -> &RnsBase {
        &self.rns_base
    }

    pub fn aux_base(&self) -> &RnsBase {
        &self.aux_base
    }

    pub fn aux_ntt_tables(&self) -> &[NttTables] {
        &self.aux_ntt_tables
    }

    /// `rns_base`'s primes followed by `aux_base`'s, as one combined base —
    /// the range within which a multiplication tensor coefficient's exact
    /// value is reconstructed without wraparound.
    pub fn extended_base(&self) -> &RnsBase {
        &self.extended_base
    }

    pub fn qualifiers(&self) -> EncryptionParameterQualifiers {
        self.qualifiers
    }

    pub fn parameter_hash(&self) -> [u8; 32] {
        self.parameter_hash
    }

    pub fn q_mod_t(&self) -> u64 {
        self.q_mod_t
    }

    pub fn delta(&self) -> &BigUint {
        &self.delta
    }

    pub fn max_lazy_reduction_bound(&self) -> usize {
        self.max_lazy_reduction_bound
    }

    /// `floor(Q/t) mod q_i`, for each prime `q_i` of `Q`: the per-modulus
    /// scaling constant used to lift a plaintext into ciphertext scale.
    pub fn delta_rns(&self) -> Vec<u64> {
        self.coeff_moduli
            .iter()
            .map(|m| (&self.delta % m.value()).to_u64().unwrap())
            .collect()
    }

    /// Checks that `tag` matches this context's parameter hash.
    pub fn check_tag(&self, tag: &[u8; 32]) -> Result<()> {
        if tag != &self.parameter_hash {
            return Err(Error::ParameterMismatch);
        }
        Ok(())
    }

    /// A zero RNS polynomial in coefficient domain over this context's base.
    pub fn zero_poly(&self) -> crate::poly::RnsPoly {
        crate::poly::RnsPoly::zero(self.degree(), &self.coeff_moduli, Representation::Coefficient)
    }

    /// Transforms every part of `poly` into NTT domain, in place.
    pub fn transform_to_ntt(&self, poly: &mut crate::poly::RnsPoly) {
        for (part, tables) in poly.parts_mut().iter_mut().zip(&self.ntt_tables) {
            let mut buf = part.coeffs().to_vec();
            crate::ntt::forward(&mut buf, tables);
            *part = Poly::from_coeffs(buf, tables.modulus(), Representation::Ntt).unwrap();
        }
    }

    /// Transforms every part of `poly` out of NTT domain, in place.
    pub fn transform_from_ntt(&self, poly: &mut crate::poly::RnsPoly) {
        for (part, tables) in poly.parts_mut().iter_mut().zip(&self.ntt_tables) {
            let mut buf = part.coeffs().to_vec();
            crate::ntt::inverse(&mut buf, tables);
            *part = Poly::from_coeffs(buf, tables.modulus(), Representation::Coefficient).unwrap();
        }
    }

    /// A zero RNS polynomial in coefficient domain over `aux_base`.
    pub fn zero_aux_poly(&self) -> crate::poly::RnsPoly {
        crate::poly::RnsPoly::zero(self.degree(), self.aux_base.moduli(), Representation::Coefficient)
    }

    /// Transforms every part of `poly` (over `aux_base`) into NTT domain, in place.
    pub fn transform_aux_to_ntt(&self, poly: &mut crate::poly::RnsPoly) {
        for (part, tables) in poly.parts_mut().iter_mut().zip(&self.aux_ntt_tables) {
            let mut buf = part.coeffs().to_vec();
            crate::ntt::forward(&mut buf, tables);
            *part = Poly::from_coeffs(buf, tables.modulus(), Representation::Ntt).unwrap();
        }
    }

    /// Transforms every part of `poly` (over `aux_base`) out of NTT domain, in place.
    pub fn transform_aux_from_ntt(&self, poly: &mut crate::poly::RnsPoly) {
        for (part, tables) in poly.parts_mut().iter_mut().zip(&self.aux_ntt_tables) {
            let mut buf = part.coeffs().to_vec();
            crate::ntt::inverse(&mut buf, tables);
            *part = Poly::from_coeffs(buf, tables.modulus(), Representation::Coefficient).unwrap();
        }
    }

    /// Fast-base-converts one ciphertext part (NTT domain, `rns_base`) into
    /// its representation over `aux_base` (NTT domain), so it can be included
    /// in an extended-base tensor product without ever reducing modulo `Q`.
    pub fn convert_to_aux_ntt(&self, poly: &crate::poly::RnsPoly) -> Result<crate::poly::RnsPoly> {
        let mut coeff = poly.clone();
        self.transform_from_ntt(&mut coeff);
        let residues: Vec<Vec<u64>> = coeff.parts().iter().map(|p| p.coeffs().to_vec()).collect();
        let converter = crate::rns::BaseConverter::new(self.rns_base.clone(), self.aux_base.clone());
        let aux_residues = converter.fast_convert_array(&residues)?;
        let parts: Vec<Poly> = self
            .aux_base
            .moduli()
            .iter()
            .zip(aux_residues)
            .map(|(&m, coeffs)| Poly::from_coeffs(coeffs, m, Representation::Coefficient).unwrap())
            .collect();
        let mut aux = crate::poly::RnsPoly::from_parts(parts)?;
        self.transform_aux_to_ntt(&mut aux);
        Ok(aux)
    }

    /// Lifts a plaintext's coefficients into RNS-NTT form scaled by
    /// `delta = floor(Q/t)`, the quantity added to `c_0` on encryption or
    /// `add_plain`/`sub_plain`.
    pub fn scale_plaintext_to_rns_ntt(&self, coeffs: &[u64]) -> crate::poly::RnsPoly {
        debug_assert_eq!(coeffs.len(), self.degree());
        let delta_rns = self.delta_rns();
        let mut parts = Vec::with_capacity(self.coeff_moduli.len());
        for (i, &qi) in self.coeff_moduli.iter().enumerate() {
            let scaled: Vec<u64> = coeffs
                .iter()
                .map(|&m| crate::arith::multiply_mod(m % qi.value(), delta_rns[i], &qi))
                .collect();
            parts.push(Poly::from_coeffs(scaled, qi, Representation::Coefficient).unwrap());
        }
        let mut poly = crate::poly::RnsPoly::from_parts(parts).unwrap();
        self.transform_to_ntt(&mut poly);
        poly
    }

    /// Lifts a plaintext's coefficients into RNS-NTT form at full ciphertext
    /// scale (no `delta` factor), the form `multiply_plain` operates with.
    pub fn lift_plaintext_to_rns_ntt(&self, coeffs: &[u64]) -> crate::poly::RnsPoly {
        debug_assert_eq!(coeffs.len(), self.degree());
        let mut parts = Vec::with_capacity(self.coeff_moduli.len());
        for &qi in &self.coeff_moduli {
            let reduced: Vec<u64> = coeffs.iter().map(|&m| m % qi.value()).collect();
            parts.push(Poly::from_coeffs(reduced, qi, Representation::Coefficient).unwrap());
        }
        let mut poly = crate::poly::RnsPoly::from_parts(parts).unwrap();
        self.transform_to_ntt(&mut poly);
        poly
    }
}

fn generate_prime_of_size(
    bits: u32,
    two_n_base: u64,
    existing: &[SmallModulus],
    already_picked: &[u64],
) -> Option<u64> {
    let two_n = 2 * two_n_base;
    let mut candidate = (1u64 << bits) - 1;
    candidate -= candidate % two_n;
    candidate += 1;
    loop {
        if candidate < (1u64 << (bits - 1)) {
            return None;
        }
        if is_probable_prime(candidate)
            && !existing.iter().any(|m| m.value() == candidate)
            && !already_picked.contains(&candidate)
        {
            return Some(candidate);
        }
        if candidate <= two_n {
            return None;
        }
        candidate -= two_n;
    }
}

/// Miller-Rabin primality test (deterministic for all u64 inputs using the
/// well-known witness set for 64-bit integers).
pub fn is_probable_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    for p in [2u64, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37] {
        if n == p {
            return true;
        }
        if n % p == 0 {
            return false;
        }
    }
    let mut d = n - 1;
    let mut r = 0u32;
    while d.is_even() {
        d /= 2;
        r += 1;
    }
    'witness: for &a in &[2u64, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37] {
        if a >= n {
            continue;
        }
        let mut x = mod_pow_u64(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 0..r.saturating_sub(1) {
            x = ((x as u128 * x as u128) % n as u128) as u64;
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

fn mod_pow_u64(mut base: u64, mut exp: u64, modulus: u64) -> u64 {
    let mut result = 1u128;
    base %= modulus;
    let mut b = base as u128;
    let m = modulus as u128;
    while exp > 0 {
        if exp & 1 == 1 {
            result = (result * b) % m;
        }
        b = (b * b) % m;
        exp >>= 1;
    }
    result as u64
}

fn compute_parameter_hash(parameters: &EncryptionParameters) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update((parameters.poly_modulus_degree as u64).to_le_bytes());
    hasher.update((parameters.coeff_modulus.len() as u64).to_le_bytes());
    for &q in &parameters.coeff_modulus {
        hasher.update(q.to_le_bytes());
    }
    hasher.update(parameters.plain_modulus.to_le_bytes());
    hasher.update(parameters.noise_standard_deviation.to_le_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Default random-generator factory, lazily constructed on first use; may be
/// overridden per call (spec §9: the only process-wide state is this factory
/// and the global memory pool, both overridable).
pub fn default_random_generator_factory() -> Box<dyn RandomGeneratorFactory> {
    Box::new(OsEntropyGeneratorFactory)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn good_params() -> EncryptionParameters {
        EncryptionParametersBuilder::new()
            .set_poly_modulus_degree(1024)
            .set_coeff_modulus(vec![0xffffee001, 0xffffc4001])
            .set_plain_modulus(1024)
            .set_noise_standard_deviation(3.19)
            .build()
            .unwrap()
    }

    #[test]
    fn builds_valid_context() {
        let ctx = ContextData::new(good_params()).unwrap();
        assert!(ctx.qualifiers().parameters_set);
        assert_eq!(ctx.coeff_moduli().len(), 2);
    }

    #[test]
    fn rejects_non_power_of_two_degree() {
        let params = EncryptionParametersBuilder::new()
            .set_poly_modulus_degree(1000)
            .set_coeff_modulus(vec![0xffffee001])
            .set_plain_modulus(1024)
            .build()
            .unwrap();
        assert!(ContextData::new(params).is_err());
    }

    #[test]
    fn rejects_non_prime_modulus() {
        let params = EncryptionParametersBuilder::new()
            .set_poly_modulus_degree(1024)
            .set_coeff_modulus(vec![2048])
            .set_plain_modulus(1024)
            .build()
            .unwrap();
        assert!(ContextData::new(params).is_err());
    }

    #[test]
    fn rejects_duplicate_moduli() {
        let params = EncryptionParametersBuilder::new()
            .set_poly_modulus_degree(1024)
            .set_coeff_modulus(vec![0xffffee001, 0xffffee001])
            .set_plain_modulus(1024)
            .build()
            .unwrap();
        assert!(ContextData::new(params).is_err());
    }

    #[test]
    fn parameter_hash_is_deterministic_and_sensitive() {
        let ctx1 = ContextData::new(good_params()).unwrap();
        let ctx2 = ContextData::new(good_params()).unwrap();
        assert_eq!(ctx1.parameter_hash(), ctx2.parameter_hash());

        let mut other = good_params();
        other.plain_modulus = 256;
        let ctx3 = ContextData::new(other).unwrap();
        assert_ne!(ctx1.parameter_hash(), ctx3.parameter_hash());
    }

    #[test]
    fn miller_rabin_matches_known_primes() {
        assert!(is_probable_prime(0xffffee001));
        assert!(is_probable_prime(0xffffc4001));
        assert!(!is_probable_prime(0xffffee002));
        assert!(!is_probable_prime(1));
        assert!(is_probable_prime(2));
    }
}
