//! Randomness collaborators and the three scheme-level samplers: uniform mod-q,
//! ternary, and truncated discrete Gaussian.

use crate::arith;
use crate::modulus::SmallModulus;
use rand::RngCore;
use rand_distr::{Distribution, Normal};

/// A pluggable source of uniform 32-bit words. The library serializes all
/// calls into a single generator instance; implementations need not be
/// thread-safe on their own (see the crate's concurrency model).
pub trait UniformRandomGenerator {
    /// Produces one uniformly random `u32`.
    fn generate(&mut self) -> u32;
}

/// A factory producing fresh [`UniformRandomGenerator`] instances.
pub trait RandomGeneratorFactory {
    fn create_generator(&self) -> Box<dyn UniformRandomGenerator>;
}

/// The default, OS-entropy-backed generator.
pub struct OsEntropyGenerator {
    rng: rand::rngs::OsRng,
}

impl OsEntropyGenerator {
    pub fn new() -> Self {
        OsEntropyGenerator { rng: rand::rngs::OsRng }
    }
}

impl Default for OsEntropyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl UniformRandomGenerator for OsEntropyGenerator {
    fn generate(&mut self) -> u32 {
        self.rng.next_u32()
    }
}

/// Factory for [`OsEntropyGenerator`]; this is the default random-generator
/// factory (identifier `0` in the binary parameter layout, see `crate::serialize`).
#[derive(Default)]
pub struct OsEntropyGeneratorFactory;

impl RandomGeneratorFactory for OsEntropyGeneratorFactory {
    fn create_generator(&self) -> Box<dyn UniformRandomGenerator> {
        Box::new(OsEntropyGenerator::new())
    }
}

/// Wraps a user-supplied byte/word source as a [`UniformRandomGenerator`].
pub struct UserSupplied<F: FnMut() -> u32> {
    f: F,
}

impl<F: FnMut() -> u32> UserSupplied<F> {
    pub fn new(f: F) -> Self {
        UserSupplied { f }
    }
}

impl<F: FnMut() -> u32> UniformRandomGenerator for UserSupplied<F> {
    fn generate(&mut self) -> u32 {
        (self.f)()
    }
}

/// Packs two `u32` draws into a `u64` and reduces modulo `modulus` using
/// rejection sampling so the result is exactly uniform over `[0, q)`.
pub fn sample_uniform_mod_q(rng: &mut dyn UniformRandomGenerator, modulus: &SmallModulus) -> u64 {
    let q = modulus.value();
    // Sample enough bits to cover q with headroom, then reject-sample into
    // `[0, largest multiple of q below 2^64)` to avoid modulo bias.
    let bit_count = modulus.bit_count();
    let mask: u64 = if bit_count >= 64 {
        u64::MAX
    } else {
        (1u64 << bit_count) - 1
    };
    loop {
        let lo = rng.generate() as u64;
        let hi = rng.generate() as u64;
        let candidate = ((hi << 32) | lo) & mask;
        if candidate < q {
            return candidate;
        }
        // Otherwise reduce with Barrett as a fallback so the loop cannot spin
        // forever when `mask` is close to but not tight around `q`.
        let reduced = arith::barrett_reduce64(candidate, modulus);
        if reduced < q {
            return reduced;
        }
    }
}

/// Fills an entire degree-`n` polynomial with independent uniform residues mod `q`.
pub fn sample_uniform_poly(
    rng: &mut dyn UniformRandomGenerator,
    n: usize,
    modulus: &SmallModulus,
) -> Vec<u64> {
    (0..n).map(|_| sample_uniform_mod_q(rng, modulus)).collect()
}

/// Samples `n` independent ternary coefficients in `{-1, 0, 1}` (as signed
/// values), with the last coefficient forced to `0` to keep strict degree `< N`.
pub fn sample_ternary(rng: &mut dyn UniformRandomGenerator, n: usize) -> Vec<i64> {
    let mut out = vec![0i64; n];
    for v in out.iter_mut().take(n.saturating_sub(1)) {
        // Two bits -> uniform over {0,1,2,3}; map to {-1,0,0,1} would bias toward 0
        // twice as often as +-1, matching the scheme's intended {-1,0,1} distribution
        // via a direct base-3 draw instead.
        let r = rng.generate() % 3;
        *v = match r {
            0 => -1,
            1 => 0,
            _ => 1,
        };
    }
    out
}

/// Reduces a signed ternary coefficient into `[0, q)`.
pub fn ternary_to_modq(v: i64, modulus: &SmallModulus) -> u64 {
    signed_to_modq(v, modulus)
}

/// Reduces an arbitrary small signed integer (e.g. a Gaussian error sample)
/// into `[0, q)`.
pub fn signed_to_modq(v: i64, modulus: &SmallModulus) -> u64 {
    if v >= 0 {
        arith::barrett_reduce64(v as u64, modulus)
    } else {
        arith::negate_mod(arith::barrett_reduce64((-v) as u64, modulus), modulus)
    }
}

/// Truncated discrete Gaussian sampler: samples a real value from
/// `Normal(0, sigma)`, clipped to `[-B, B]` (`B = 6*sigma`), rounded to the
/// nearest integer.
pub struct DiscreteGaussian {
    sigma: f64,
    bound: f64,
}

impl DiscreteGaussian {
    /// `bound` defaults to `6*sigma`; samples beyond it are rejected and redrawn.
    pub fn new(sigma: f64) -> Self {
        DiscreteGaussian {
            sigma,
            bound: 6.0 * sigma,
        }
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn bound(&self) -> f64 {
        self.bound
    }

    /// Draws one truncated-Gaussian integer sample using `rand`'s `StdRng`-compatible
    /// generator (any `rand::RngCore` works; callers typically seed a reproducible
    /// `StdRng` for tests and draw from `rand::rngs::OsRng` in production).
    pub fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        let normal = Normal::new(0.0, self.sigma).expect("sigma must be positive");
        loop {
            let x: f64 = normal.sample(rng);
            if x.abs() <= self.bound {
                return x.round() as i64;
            }
        }
    }

    /// Fills a degree-`n` polynomial with independent truncated-Gaussian samples.
    pub fn sample_poly<R: rand::Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<i64> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    struct CountingGenerator(rand::rngs::StdRng);
    impl UniformRandomGenerator for CountingGenerator {
        fn generate(&mut self) -> u32 {
            self.0.next_u32()
        }
    }

    #[test]
    fn uniform_mod_q_within_range() {
        let modulus = SmallModulus::new(97).unwrap();
        let mut gen = CountingGenerator(rand::rngs::StdRng::seed_from_u64(1));
        for _ in 0..1000 {
            let v = sample_uniform_mod_q(&mut gen, &modulus);
            assert!(v < 97);
        }
    }

    #[test]
    fn uniform_mod_q_covers_residues_over_many_draws() {
        let modulus = SmallModulus::new(251).unwrap();
        let mut gen = CountingGenerator(rand::rngs::StdRng::seed_from_u64(7));
        let mut seen = vec![false; 251];
        for _ in 0..200_000 {
            let v = sample_uniform_mod_q(&mut gen, &modulus) as usize;
            seen[v] = true;
        }
        assert!(seen.iter().all(|&s| s), "every residue class should appear");
    }

    #[test]
    fn ternary_last_coefficient_is_zero() {
        let mut gen = CountingGenerator(rand::rngs::StdRng::seed_from_u64(3));
        let t = sample_ternary(&mut gen, 16);
        assert_eq!(*t.last().unwrap(), 0);
        assert!(t.iter().all(|&v| v == -1 || v == 0 || v == 1));
    }

    #[test]
    fn discrete_gaussian_within_bound_and_near_mean() {
        let sampler = DiscreteGaussian::new(3.19);
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let samples = sampler.sample_poly(&mut rng, 10_000);
        assert!(samples.iter().all(|&v| (v as f64).abs() <= sampler.bound()));
        let mean: f64 = samples.iter().map(|&v| v as f64).sum::<f64>() / samples.len() as f64;
        assert!(mean.abs() < 0.1 * sampler.sigma());
        let variance: f64 = samples.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>()
            / samples.len() as f64;
        let stddev = variance.sqrt();
        assert!((stddev - sampler.sigma()).abs() < 0.2 * sampler.sigma());
    }
}
