//! Shared helpers for drawing whole-context RNS polynomials (uniform,
//! ternary, discrete-Gaussian) directly in NTT domain. Used by key
//! generation and fresh encryption, which both need the same "sample per
//! modulus, then transform" pattern.

use crate::context::ContextData;
use crate::modulus::SmallModulus;
use crate::ntt::NttTables;
use crate::poly::{Poly, Representation, RnsPoly};
use crate::sampling::{self, DiscreteGaussian, UniformRandomGenerator};
use rand::RngCore;

pub(crate) fn find_tables<'a>(context: &'a ContextData, modulus: &SmallModulus) -> &'a NttTables {
    context
        .ntt_tables()
        .iter()
        .find(|t| t.modulus().value() == modulus.value())
        .expect("every coeff modulus has a matching NTT table")
}

pub(crate) fn uniform_rns_ntt(context: &ContextData, rng: &mut dyn UniformRandomGenerator) -> RnsPoly {
    let n = context.degree();
    let parts = context
        .coeff_moduli()
        .iter()
        .map(|&qi| {
            let coeffs = sampling::sample_uniform_poly(rng, n, &qi);
            Poly::from_coeffs(coeffs, qi, Representation::Ntt).unwrap()
        })
        .collect();
    RnsPoly::from_parts(parts).unwrap()
}

pub(crate) fn ternary_rns_ntt(context: &ContextData, rng: &mut dyn UniformRandomGenerator) -> RnsPoly {
    let n = context.degree();
    let ternary = sampling::sample_ternary(rng, n);
    let mut parts = Vec::with_capacity(context.coeff_moduli().len());
    for &qi in context.coeff_moduli() {
        let coeffs: Vec<u64> = ternary.iter().map(|&v| sampling::ternary_to_modq(v, &qi)).collect();
        let mut buf = coeffs;
        crate::ntt::forward(&mut buf, find_tables(context, &qi));
        parts.push(Poly::from_coeffs(buf, qi, Representation::Ntt).unwrap());
    }
    RnsPoly::from_parts(parts).unwrap()
}

pub(crate) fn gaussian_rns_ntt(context: &ContextData, rng: &mut dyn UniformRandomGenerator) -> RnsPoly {
    let n = context.degree();
    let sigma = context.parameters().noise_standard_deviation();
    let sampler = DiscreteGaussian::new(sigma);
    let mut bridge = GeneratorRng(rng);
    let e = sampler.sample_poly(&mut bridge, n);
    let mut parts = Vec::with_capacity(context.coeff_moduli().len());
    for &qi in context.coeff_moduli() {
        let coeffs: Vec<u64> = e.iter().map(|&v| sampling::signed_to_modq(v, &qi)).collect();
        let mut buf = coeffs;
        crate::ntt::forward(&mut buf, find_tables(context, &qi));
        parts.push(Poly::from_coeffs(buf, qi, Representation::Ntt).unwrap());
    }
    RnsPoly::from_parts(parts).unwrap()
}

/// Adapts a [`UniformRandomGenerator`] to `rand::RngCore` so `rand_distr`
/// distributions (the truncated discrete Gaussian) can draw from it.
struct GeneratorRng<'a>(&'a mut dyn UniformRandomGenerator);

impl<'a> RngCore for GeneratorRng<'a> {
    fn next_u32(&mut self) -> u32 {
        self.0.generate()
    }

    fn next_u64(&mut self) -> u64 {
        let lo = self.0.generate() as u64;
        let hi = self.0.generate() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let v = self.0.generate().to_le_bytes();
            chunk.copy_from_slice(&v[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
