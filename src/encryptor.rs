//! Fresh encryption under a public or secret key.

use crate::ciphertext::Ciphertext;
use crate::context::ContextData;
use crate::error::{Error, Result};
use crate::keys::{PublicKey, SecretKey};
use crate::plaintext::Plaintext;
use crate::rns_sample::{gaussian_rns_ntt, ternary_rns_ntt, uniform_rns_ntt};
use crate::sampling::UniformRandomGenerator;
use std::sync::Arc;

/// Encrypts plaintexts under a fixed public or secret key and context.
pub struct Encryptor {
    context: Arc<ContextData>,
    public_key: Option<PublicKey>,
    secret_key: Option<SecretKey>,
}

impl Encryptor {
    /// An encryptor that can only perform asymmetric (public-key) encryption.
    pub fn with_public_key(context: Arc<ContextData>, public_key: PublicKey) -> Result<Self> {
        context.check_tag(&public_key.tag())?;
        Ok(Encryptor {
            context,
            public_key: Some(public_key),
            secret_key: None,
        })
    }

    /// An encryptor that can only perform symmetric (secret-key) encryption,
    /// which yields a tighter noise budget for the same parameters.
    pub fn with_secret_key(context: Arc<ContextData>, secret_key: SecretKey) -> Result<Self> {
        context.check_tag(&secret_key.tag())?;
        Ok(Encryptor {
            context,
            public_key: None,
            secret_key: Some(secret_key),
        })
    }

    fn validate_plaintext(&self, plaintext: &Plaintext) -> Result<Vec<u64>> {
        let n = self.context.degree();
        if plaintext.degree() > n {
            return Err(Error::InvalidPlaintext(format!(
                "plaintext degree {} exceeds ring degree {n}",
                plaintext.degree()
            )));
        }
        let t = self.context.plain_modulus().value();
        for &c in plaintext.coeffs() {
            if c >= t {
                return Err(Error::InvalidPlaintext(format!(
                    "coefficient {c} out of range for plaintext modulus {t}"
                )));
            }
        }
        Ok(plaintext.padded_coeffs(n))
    }

    /// `c_0 = p_0*u + e_1 + delta*m`, `c_1 = p_1*u + e_2`, all in NTT domain.
    pub fn encrypt(
        &self,
        plaintext: &Plaintext,
        rng: &mut dyn UniformRandomGenerator,
    ) -> Result<Ciphertext> {
        let pk = self
            .public_key
            .as_ref()
            .ok_or_else(|| Error::InsufficientKeys("encryptor holds no public key".into()))?;
        let coeffs = self.validate_plaintext(plaintext)?;
        let ctx = &self.context;

        let u = ternary_rns_ntt(ctx, rng);
        let e1 = gaussian_rns_ntt(ctx, rng);
        let e2 = gaussian_rns_ntt(ctx, rng);
        let scaled_m = ctx.scale_plaintext_to_rns_ntt(&coeffs);

        let c0 = pk.c0().dyadic_product(&u).add(&e1).add(&scaled_m);
        let c1 = pk.c1().dyadic_product(&u).add(&e2);

        Ciphertext::new(ctx.parameter_hash(), vec![c0, c1])
    }

    /// Symmetric-key encryption: `c_1 = a` (uniform), `c_0 = -(a*s + e) + delta*m`.
    pub fn encrypt_symmetric(
        &self,
        plaintext: &Plaintext,
        rng: &mut dyn UniformRandomGenerator,
    ) -> Result<Ciphertext> {
        let sk = self
            .secret_key
            .as_ref()
            .ok_or_else(|| Error::InsufficientKeys("encryptor holds no secret key".into()))?;
        let coeffs = self.validate_plaintext(plaintext)?;
        let ctx = &self.context;

        let a = uniform_rns_ntt(ctx, rng);
        let e = gaussian_rns_ntt(ctx, rng);
        let scaled_m = ctx.scale_plaintext_to_rns_ntt(&coeffs);

        let a_s = a.dyadic_product(sk.data());
        let c0 = a_s.add(&e).negate().add(&scaled_m);

        Ciphertext::new(ctx.parameter_hash(), vec![c0, a])
    }
}
