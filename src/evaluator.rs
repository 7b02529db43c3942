//! Homomorphic operations on ciphertexts: arithmetic, relinearization, and
//! Galois (automorphism) evaluation.

use crate::ciphertext::{Ciphertext, MIN_SIZE};
use crate::context::ContextData;
use crate::error::{Error, Result};
use crate::keys::{EvaluationKeys, GaloisKeys, KeySwitchKey};
use crate::plaintext::Plaintext;
use crate::poly::{Poly, Representation, RnsPoly};
use num_bigint::{BigInt, BigUint};
use num_traits::{Signed, ToPrimitive};
use std::sync::Arc;

/// Performs homomorphic operations against one fixed context. Evaluation and
/// Galois keys are passed per-call, since an evaluator itself holds no
/// secret material.
pub struct Evaluator {
    context: Arc<ContextData>,
}

impl Evaluator {
    pub fn new(context: Arc<ContextData>) -> Self {
        Evaluator { context }
    }

    fn check_one(&self, ct: &Ciphertext) -> Result<()> {
        ct.check_context(&self.context)
    }

    fn check_pair(&self, a: &Ciphertext, b: &Ciphertext) -> Result<()> {
        self.check_one(a)?;
        self.check_one(b)?;
        a.check_compatible(b)
    }

    fn check_eval_keys(&self, keys: &EvaluationKeys) -> Result<()> {
        if keys.tag() != self.context.parameter_hash() {
            return Err(Error::ParameterMismatch);
        }
        Ok(())
    }

    fn check_galois_keys(&self, keys: &GaloisKeys) -> Result<()> {
        if keys.tag() != self.context.parameter_hash() {
            return Err(Error::ParameterMismatch);
        }
        Ok(())
    }

    pub fn negate(&self, ct: &Ciphertext) -> Result<Ciphertext> {
        self.check_one(ct)?;
        let parts: Vec<RnsPoly> = ct.parts().iter().map(|p| p.negate()).collect();
        Ciphertext::new(ct.tag(), parts)
    }

    pub fn add(&self, ct1: &Ciphertext, ct2: &Ciphertext) -> Result<Ciphertext> {
        self.check_pair(ct1, ct2)?;
        let parts = combine(&self.context, ct1, ct2, RnsPoly::add);
        Ciphertext::new(ct1.tag(), parts)
    }

    pub fn sub(&self, ct1: &Ciphertext, ct2: &Ciphertext) -> Result<Ciphertext> {
        self.check_pair(ct1, ct2)?;
        let parts = combine(&self.context, ct1, ct2, RnsPoly::sub);
        Ciphertext::new(ct1.tag(), parts)
    }

    pub fn add_plain(&self, ct: &Ciphertext, plaintext: &Plaintext) -> Result<Ciphertext> {
        self.check_one(ct)?;
        let ctx = &self.context;
        let coeffs = validate_plaintext(ctx, plaintext)?;
        let scaled = ctx.scale_plaintext_to_rns_ntt(&coeffs);
        let mut parts = ct.parts().to_vec();
        parts[0] = parts[0].add(&scaled);
        Ciphertext::new(ct.tag(), parts)
    }

    pub fn sub_plain(&self, ct: &Ciphertext, plaintext: &Plaintext) -> Result<Ciphertext> {
        self.check_one(ct)?;
        let ctx = &self.context;
        let coeffs = validate_plaintext(ctx, plaintext)?;
        let scaled = ctx.scale_plaintext_to_rns_ntt(&coeffs);
        let mut parts = ct.parts().to_vec();
        parts[0] = parts[0].sub(&scaled);
        Ciphertext::new(ct.tag(), parts)
    }

    /// Tensor product over the extended base `Q ∪ Q_extra` (so tensor
    /// coefficients, which grow to roughly `Delta^2`, never wrap modulo `Q`)
    /// followed by an exact divide-and-round scaling back to a single-`Delta`
    /// ciphertext of size `ct1.size() + ct2.size() - 1` (spec §4.4).
    pub fn multiply(&self, ct1: &Ciphertext, ct2: &Ciphertext) -> Result<Ciphertext> {
        self.check_pair(ct1, ct2)?;
        let ctx = &self.context;
        let (base_parts, aux_parts) = tensor(ctx, ct1, ct2)?;
        let mut out_parts = Vec::with_capacity(base_parts.len());
        for (base, aux) in base_parts.iter().zip(&aux_parts) {
            out_parts.push(scale_down(ctx, base, aux)?);
        }
        Ciphertext::new(ctx.parameter_hash(), out_parts)
    }

    pub fn square(&self, ct: &Ciphertext) -> Result<Ciphertext> {
        self.multiply(ct, ct)
    }

    pub fn multiply_plain(&self, ct: &Ciphertext, plaintext: &Plaintext) -> Result<Ciphertext> {
        self.check_one(ct)?;
        if plaintext.is_zero() {
            return Err(Error::InvalidPlaintext(
                "cannot multiply a ciphertext by the zero plaintext".into(),
            ));
        }
        let ctx = &self.context;
        let coeffs = validate_plaintext(ctx, plaintext)?;
        let lifted = ctx.lift_plaintext_to_rns_ntt(&coeffs);
        let parts: Vec<RnsPoly> = ct.parts().iter().map(|p| p.dyadic_product(&lifted)).collect();
        Ciphertext::new(ct.tag(), parts)
    }

    /// Sums `ciphertexts` pairwise in a balanced binary tree.
    pub fn add_many(&self, ciphertexts: &[Ciphertext]) -> Result<Ciphertext> {
        if ciphertexts.is_empty() {
            return Err(Error::InvalidArgument(
                "add_many requires at least one ciphertext".into(),
            ));
        }
        let mut level: Vec<Ciphertext> = ciphertexts.to_vec();
        while level.len() > 1 {
            let mut next = Vec::with_capacity((level.len() + 1) / 2);
            let mut it = level.into_iter();
            while let Some(a) = it.next() {
                match it.next() {
                    Some(b) => next.push(self.add(&a, &b)?),
                    None => next.push(a),
                }
            }
            level = next;
        }
        Ok(level.into_iter().next().unwrap())
    }

    /// Multiplies `ciphertexts` pairwise in a balanced binary tree,
    /// relinearizing back to size 2 after every product so the tree's depth
    /// doesn't compound ciphertext growth.
    pub fn multiply_many(
        &self,
        ciphertexts: &[Ciphertext],
        eval_keys: &EvaluationKeys,
    ) -> Result<Ciphertext> {
        if ciphertexts.is_empty() {
            return Err(Error::InvalidArgument(
                "multiply_many requires at least one ciphertext".into(),
            ));
        }
        let mut level: Vec<Ciphertext> = ciphertexts.to_vec();
        while level.len() > 1 {
            let mut next = Vec::with_capacity((level.len() + 1) / 2);
            let mut it = level.into_iter();
            while let Some(a) = it.next() {
                match it.next() {
                    Some(b) => {
                        let product = self.multiply(&a, &b)?;
                        next.push(self.relinearize(&product, eval_keys, MIN_SIZE)?);
                    }
                    None => next.push(a),
                }
            }
            level = next;
        }
        Ok(level.into_iter().next().unwrap())
    }

    /// Square-and-multiply exponentiation, relinearizing to size 2 after
    /// every multiplication.
    pub fn exponentiate(
        &self,
        ct: &Ciphertext,
        exponent: u64,
        eval_keys: &EvaluationKeys,
    ) -> Result<Ciphertext> {
        self.check_one(ct)?;
        if exponent == 0 {
            return Err(Error::InvalidArgument("exponent must be nonzero".into()));
        }
        let mut result: Option<Ciphertext> = None;
        let mut base = ct.clone();
        let mut e = exponent;
        while e > 0 {
            if e & 1 == 1 {
                result = Some(match result {
                    None => base.clone(),
                    Some(r) => {
                        let product = self.multiply(&r, &base)?;
                        self.relinearize(&product, eval_keys, MIN_SIZE)?
                    }
                });
            }
            e >>= 1;
            if e > 0 {
                let squared = self.multiply(&base, &base)?;
                base = self.relinearize(&squared, eval_keys, MIN_SIZE)?;
            }
        }
        Ok(result.unwrap())
    }

    /// Reduces `ct`'s size down to `target_size` (`>= 2`), key-switching one
    /// digit-decomposed top term at a time.
    pub fn relinearize(
        &self,
        ct: &Ciphertext,
        eval_keys: &EvaluationKeys,
        target_size: usize,
    ) -> Result<Ciphertext> {
        self.check_one(ct)?;
        if target_size < MIN_SIZE {
            return Err(Error::InvalidSize(format!(
                "relinearize target size must be >= {MIN_SIZE}, got {target_size}"
            )));
        }
        if target_size > ct.size() {
            return Err(Error::InvalidSize(
                "relinearize target size must not exceed the ciphertext's current size".into(),
            ));
        }
        self.check_eval_keys(eval_keys)?;
        let ctx = &self.context;
        let mut parts = ct.parts().to_vec();
        while parts.len() > target_size {
            let k = parts.len() - 2;
            let ksk = eval_keys.get(k).ok_or_else(|| {
                Error::InsufficientKeys(format!(
                    "no evaluation key available to relinearize a ciphertext of size {}",
                    parts.len()
                ))
            })?;
            let top = parts.pop().unwrap();
            let mut top_coeff = top;
            ctx.transform_from_ntt(&mut top_coeff);
            let (c0_switch, c1_switch) = key_switch(ctx, &top_coeff, ksk);
            parts[0] = parts[0].add(&c0_switch);
            parts[1] = parts[1].add(&c1_switch);
        }
        Ciphertext::new(ct.tag(), parts)
    }

    /// Applies the automorphism `x -> x^g` to a size-2 ciphertext, then
    /// key-switches the result back to an encryption under the original
    /// secret key.
    pub fn apply_galois(
        &self,
        ct: &Ciphertext,
        galois_element: u64,
        galois_keys: &GaloisKeys,
    ) -> Result<Ciphertext> {
        self.check_one(ct)?;
        if ct.size() != MIN_SIZE {
            return Err(Error::InvalidSize(format!(
                "apply_galois requires a size-{MIN_SIZE} ciphertext, got {}",
                ct.size()
            )));
        }
        self.check_galois_keys(galois_keys)?;
        let ksk = galois_keys.get(galois_element).ok_or_else(|| {
            Error::InsufficientKeys(format!("no Galois key for element {galois_element}"))
        })?;
        let ctx = &self.context;
        let permuted_c0 = apply_galois_ntt(&ct.parts()[0], galois_element, ctx);
        let permuted_c1 = apply_galois_ntt(&ct.parts()[1], galois_element, ctx);

        let mut permuted_c1_coeff = permuted_c1;
        ctx.transform_from_ntt(&mut permuted_c1_coeff);
        let (c0_switch, c1_switch) = key_switch(ctx, &permuted_c1_coeff, ksk);

        let new_c0 = permuted_c0.add(&c0_switch);
        Ciphertext::new(ct.tag(), vec![new_c0, c1_switch])
    }
}

fn validate_plaintext(ctx: &ContextData, plaintext: &Plaintext) -> Result<Vec<u64>> {
    let n = ctx.degree();
    if plaintext.degree() > n {
        return Err(Error::InvalidPlaintext(format!(
            "plaintext degree {} exceeds ring degree {n}",
            plaintext.degree()
        )));
    }
    let t = ctx.plain_modulus().value();
    for &c in plaintext.coeffs() {
        if c >= t {
            return Err(Error::InvalidPlaintext(format!(
                "coefficient {c} out of range for plaintext modulus {t}"
            )));
        }
    }
    Ok(plaintext.padded_coeffs(n))
}

/// The all-zero polynomial, tagged as NTT-domain (the zero vector is fixed
/// by every NTT, so no transform is actually needed).
fn zero_ntt(ctx: &ContextData) -> RnsPoly {
    let mut z = ctx.zero_poly();
    z.set_representation(Representation::Ntt);
    z
}

fn combine(
    ctx: &ContextData,
    ct1: &Ciphertext,
    ct2: &Ciphertext,
    op: impl Fn(&RnsPoly, &RnsPoly) -> RnsPoly,
) -> Vec<RnsPoly> {
    let size = ct1.size().max(ct2.size());
    let zero = zero_ntt(ctx);
    (0..size)
        .map(|i| {
            let a = ct1.parts().get(i).unwrap_or(&zero);
            let b = ct2.parts().get(i).unwrap_or(&zero);
            op(a, b)
        })
        .collect()
}

/// The all-zero polynomial over `aux_base`, tagged as NTT-domain.
fn zero_ntt_aux(ctx: &ContextData) -> RnsPoly {
    let mut z = ctx.zero_aux_poly();
    z.set_representation(Representation::Ntt);
    z
}

/// `Σ_{i+j=k} a_i * b_j`, computed at every prime of `Q` and of `Q_extra`
/// (spec §4.4): both ciphertexts' parts are first fast-base-converted into
/// `Q_extra`, so the dyadic product at each extended-base prime carries the
/// full (unreduced) tensor coefficient's residue there, not just its
/// reduction modulo `Q`. Returns `(Q-base parts, Q_extra-base parts)`, both
/// NTT domain, each of size `ct1.size() + ct2.size() - 1`.
fn tensor(ctx: &ContextData, ct1: &Ciphertext, ct2: &Ciphertext) -> Result<(Vec<RnsPoly>, Vec<RnsPoly>)> {
    let size_out = ct1.size() + ct2.size() - 1;

    let ct1_aux = ct1
        .parts()
        .iter()
        .map(|p| ctx.convert_to_aux_ntt(p))
        .collect::<Result<Vec<_>>>()?;
    let ct2_aux = ct2
        .parts()
        .iter()
        .map(|p| ctx.convert_to_aux_ntt(p))
        .collect::<Result<Vec<_>>>()?;

    let mut base_parts = vec![zero_ntt(ctx); size_out];
    let mut aux_parts = vec![zero_ntt_aux(ctx); size_out];
    for (i, a_i) in ct1.parts().iter().enumerate() {
        for (j, b_j) in ct2.parts().iter().enumerate() {
            let prod = a_i.dyadic_product(b_j);
            base_parts[i + j] = base_parts[i + j].add(&prod);
            let prod_aux = ct1_aux[i].dyadic_product(&ct2_aux[j]);
            aux_parts[i + j] = aux_parts[i + j].add(&prod_aux);
        }
    }
    Ok((base_parts, aux_parts))
}

/// `round(t/Q * D_k) mod Q`, the multiplication scale-down step, where `D_k`
/// is the tensor coefficient's *exact* signed value — recovered by CRT-composing
/// `base`'s and `aux`'s residues together over the extended base `Q ∪ Q_extra`
/// and centering, since `D_k` can be as large as `~Delta^2`, far past `Q`.
/// Once the rounded result is reduced back into `Q`, the auxiliary base's
/// residues are dropped.
fn scale_down(ctx: &ContextData, base: &RnsPoly, aux: &RnsPoly) -> Result<RnsPoly> {
    let mut base_coeff = base.clone();
    ctx.transform_from_ntt(&mut base_coeff);
    let mut aux_coeff = aux.clone();
    ctx.transform_aux_from_ntt(&mut aux_coeff);

    let n = ctx.degree();
    let t_signed = BigInt::from(ctx.plain_modulus().value());
    let q = ctx.rns_base().big_modulus();
    let extended = ctx.extended_base();
    let extended_modulus = extended.big_modulus();
    let half_extended = extended_modulus / 2u32;
    let extended_modulus_signed = BigInt::from(extended_modulus.clone());

    let mut columns: Vec<Vec<u64>> = vec![Vec::with_capacity(n); ctx.coeff_moduli().len()];
    for k in 0..n {
        let mut residues: Vec<u64> = base_coeff.parts().iter().map(|p| p.coeffs()[k]).collect();
        residues.extend(aux_coeff.parts().iter().map(|p| p.coeffs()[k]));
        let composed = extended.compose(&residues)?;
        let signed = if composed > half_extended {
            BigInt::from(composed) - &extended_modulus_signed
        } else {
            BigInt::from(composed)
        };
        let scaled = round_div_signed(&(signed * &t_signed), q);
        let nonneg = reduce_mod_q(&scaled, q);
        let decomposed = ctx.rns_base().decompose(&nonneg);
        for (col, &d) in columns.iter_mut().zip(decomposed.iter()) {
            col.push(d);
        }
    }

    let mut new_parts = Vec::with_capacity(ctx.coeff_moduli().len());
    for (&qi, coeffs) in ctx.coeff_moduli().iter().zip(columns.into_iter()) {
        new_parts.push(Poly::from_coeffs(coeffs, qi, Representation::Coefficient)?);
    }
    let mut result = RnsPoly::from_parts(new_parts)?;
    ctx.transform_to_ntt(&mut result);
    Ok(result)
}

/// Rounds `num/den` (`den > 0`) to the nearest integer, ties away from zero.
fn round_div_signed(num: &BigInt, den: &BigUint) -> BigInt {
    let den = BigInt::from(den.clone());
    let sign = if num.is_negative() { -1 } else { 1 };
    let abs_num = num.abs();
    let doubled = &abs_num * 2 + &den;
    let rounded = doubled / (&den * 2);
    BigInt::from(sign) * rounded
}

/// Reduces a signed value into its nonnegative canonical representative mod `q`.
fn reduce_mod_q(v: &BigInt, q: &BigUint) -> BigUint {
    let q_signed = BigInt::from(q.clone());
    let mut r = v % &q_signed;
    if r.is_negative() {
        r += &q_signed;
    }
    r.to_biguint().unwrap()
}

/// Key-switches `target` (coefficient domain) under `ksk`, returning
/// `(Σ_j B_j * d_j, Σ_j A_j * d_j)` — the `(c0, c1)` contribution that
/// replaces `target`'s coefficient of the higher secret-key power.
///
/// `target`'s coefficients are CRT-composed into exact integers and
/// decomposed into base-`2^w` digits globally (see `crate::keys`), rather
/// than per modulus.
fn key_switch(ctx: &ContextData, target: &RnsPoly, ksk: &KeySwitchKey) -> (RnsPoly, RnsPoly) {
    let w = ksk.decomposition_bit_count() as usize;
    let digits = ksk.digits();
    let n = ctx.degree();
    let mask = (BigUint::from(1u32) << w) - BigUint::from(1u32);

    let mut digit_coeffs = vec![vec![0u64; n]; digits.len()];
    for k in 0..n {
        let residues: Vec<u64> = target.parts().iter().map(|p| p.coeffs()[k]).collect();
        let mut val = ctx.rns_base().compose(&residues).expect("residue count matches RNS base");
        for row in digit_coeffs.iter_mut() {
            let digit = &val & &mask;
            row[k] = digit.to_u64().expect("digit width <= 60 bits fits in u64");
            val >>= w;
        }
    }

    let mut c0 = zero_ntt(ctx);
    let mut c1 = zero_ntt(ctx);
    for (j, (a_j, b_j)) in digits.iter().enumerate() {
        let digit_ntt = build_digit_ntt(ctx, &digit_coeffs[j]);
        c1 = c1.add(&a_j.dyadic_product(&digit_ntt));
        c0 = c0.add(&b_j.dyadic_product(&digit_ntt));
    }
    (c0, c1)
}

fn build_digit_ntt(ctx: &ContextData, coeffs: &[u64]) -> RnsPoly {
    let parts: Vec<Poly> = ctx
        .coeff_moduli()
        .iter()
        .map(|&qi| {
            let reduced: Vec<u64> = coeffs.iter().map(|&d| d % qi.value()).collect();
            Poly::from_coeffs(reduced, qi, Representation::Coefficient).unwrap()
        })
        .collect();
    let mut poly = RnsPoly::from_parts(parts).unwrap();
    ctx.transform_to_ntt(&mut poly);
    poly
}

/// Coefficient-domain substitution `x -> x^g`: `e = (k*g) mod 2N`, with a
/// sign flip when `e >= N` (since `x^N = -1` in `R = Z[x]/(x^N+1)`).
pub(crate) fn apply_galois_ntt(poly: &RnsPoly, g: u64, ctx: &ContextData) -> RnsPoly {
    let mut coeff = poly.clone();
    ctx.transform_from_ntt(&mut coeff);
    let n = ctx.degree();
    let two_n = 2 * n as u64;
    let mut out = ctx.zero_poly();

    for (part, out_part) in coeff.parts().iter().zip(out.parts_mut().iter_mut()) {
        let qi = part.modulus();
        for k in 0..n {
            let c = part.coeffs()[k];
            if c == 0 {
                continue;
            }
            let e = (k as u64 * g) % two_n;
            if e < n as u64 {
                let idx = e as usize;
                out_part.coeffs_mut()[idx] = crate::arith::add_mod(out_part.coeffs_mut()[idx], c, &qi);
            } else {
                let idx = (e - n as u64) as usize;
                out_part.coeffs_mut()[idx] = crate::arith::sub_mod(out_part.coeffs_mut()[idx], c, &qi);
            }
        }
    }
    ctx.transform_to_ntt(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EncryptionParametersBuilder;
    use crate::decryptor::Decryptor;
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

    struct Rig {
        ctx: Arc<ContextData>,
        rng: OsEntropyGenerator,
        encryptor: Encryptor,
        decryptor: Decryptor,
        keygen: KeyGenerator,
        evaluator: Evaluator,
    }

    fn rig() -> Rig {
        let ctx = small_context();
        let mut rng = OsEntropyGenerator::new();
        let keygen = KeyGenerator::new(ctx.clone(), &mut rng);
        let encryptor = Encryptor::with_secret_key(ctx.clone(), keygen.secret_key().clone()).unwrap();
        let decryptor = Decryptor::new(ctx.clone(), keygen.secret_key().clone()).unwrap();
        let evaluator = Evaluator::new(ctx.clone());
        Rig { ctx, rng, encryptor, decryptor, keygen, evaluator }
    }

    fn pt(ctx: &ContextData, coeffs: Vec<u64>) -> Plaintext {
        Plaintext::from_coeffs(coeffs, ctx.plain_modulus(), ctx.degree()).unwrap()
    }

    #[test]
    fn add_recovers_sum() {
        let mut r = rig();
        let a = r.encryptor.encrypt_symmetric(&pt(&r.ctx, vec![3, 4]), &mut r.rng).unwrap();
        let b = r.encryptor.encrypt_symmetric(&pt(&r.ctx, vec![5, 6]), &mut r.rng).unwrap();
        let sum = r.evaluator.add(&a, &b).unwrap();
        let decrypted = r.decryptor.decrypt(&sum).unwrap();
        assert_eq!(&decrypted.coeffs()[..2], &[8, 10]);
    }

    #[test]
    fn negate_then_add_is_zero() {
        let mut r = rig();
        let a = r.encryptor.encrypt_symmetric(&pt(&r.ctx, vec![7]), &mut r.rng).unwrap();
        let neg = r.evaluator.negate(&a).unwrap();
        let sum = r.evaluator.add(&a, &neg).unwrap();
        let decrypted = r.decryptor.decrypt(&sum).unwrap();
        assert!(decrypted.coeffs().iter().all(|&c| c == 0));
    }

    #[test]
    fn add_plain_and_multiply_plain_are_consistent() {
        let mut r = rig();
        let a = r.encryptor.encrypt_symmetric(&pt(&r.ctx, vec![3]), &mut r.rng).unwrap();
        let plain_five = pt(&r.ctx, vec![5]);
        let sum = r.evaluator.add_plain(&a, &plain_five).unwrap();
        assert_eq!(r.decryptor.decrypt(&sum).unwrap().coeffs()[0], 8);

        let product = r.evaluator.multiply_plain(&a, &plain_five).unwrap();
        assert_eq!(r.decryptor.decrypt(&product).unwrap().coeffs()[0], 15);
    }

    #[test]
    fn multiply_then_relinearize_recovers_product() {
        let mut r = rig();
        let eval_keys = r.keygen.create_evaluation_keys(2, 30, &mut r.rng).unwrap();
        let a = r.encryptor.encrypt_symmetric(&pt(&r.ctx, vec![6]), &mut r.rng).unwrap();
        let b = r.encryptor.encrypt_symmetric(&pt(&r.ctx, vec![7]), &mut r.rng).unwrap();
        let raw_product = r.evaluator.multiply(&a, &b).unwrap();
        assert_eq!(raw_product.size(), 3);
        let relin = r.evaluator.relinearize(&raw_product, &eval_keys, MIN_SIZE).unwrap();
        assert_eq!(relin.size(), 2);
        assert_eq!(r.decryptor.decrypt(&relin).unwrap().coeffs()[0], 42);
    }

    #[test]
    fn square_matches_multiply_by_self() {
        let mut r = rig();
        let eval_keys = r.keygen.create_evaluation_keys(2, 30, &mut r.rng).unwrap();
        let a = r.encryptor.encrypt_symmetric(&pt(&r.ctx, vec![9]), &mut r.rng).unwrap();
        let squared = r.evaluator.square(&a).unwrap();
        let relin = r.evaluator.relinearize(&squared, &eval_keys, MIN_SIZE).unwrap();
        assert_eq!(r.decryptor.decrypt(&relin).unwrap().coeffs()[0], 81);
    }

    #[test]
    fn exponentiate_computes_power() {
        let mut r = rig();
        let eval_keys = r.keygen.create_evaluation_keys(2, 30, &mut r.rng).unwrap();
        let a = r.encryptor.encrypt_symmetric(&pt(&r.ctx, vec![3]), &mut r.rng).unwrap();
        let cubed = r.evaluator.exponentiate(&a, 3, &eval_keys).unwrap();
        assert_eq!(cubed.size(), 2);
        assert_eq!(r.decryptor.decrypt(&cubed).unwrap().coeffs()[0], 27);
    }

    #[test]
    fn galois_fixes_constant_plaintext() {
        let mut r = rig();
        let galois_keys = r.keygen.create_galois_keys(&[5], 30, &mut r.rng).unwrap();
        let a = r.encryptor.encrypt_symmetric(&pt(&r.ctx, vec![11]), &mut r.rng).unwrap();
        let permuted = r.evaluator.apply_galois(&a, 5, &galois_keys).unwrap();
        assert_eq!(r.decryptor.decrypt(&permuted).unwrap().coeffs()[0], 11);
    }

    #[test]
    fn add_many_sums_every_ciphertext() {
        let mut r = rig();
        let cts: Vec<Ciphertext> = (1..=4)
            .map(|v| r.encryptor.encrypt_symmetric(&pt(&r.ctx, vec![v]), &mut r.rng).unwrap())
            .collect();
        let total = r.evaluator.add_many(&cts).unwrap();
        assert_eq!(r.decryptor.decrypt(&total).unwrap().coeffs()[0], 10);
    }

    #[test]
    fn relinearize_rejects_missing_key_for_larger_reduction() {
        let mut r = rig();
        let eval_keys = r.keygen.create_evaluation_keys(2, 30, &mut r.rng).unwrap();
        let a = r.encryptor.encrypt_symmetric(&pt(&r.ctx, vec![2]), &mut r.rng).unwrap();
        let b = r.encryptor.encrypt_symmetric(&pt(&r.ctx, vec![3]), &mut r.rng).unwrap();
        let c = r.encryptor.encrypt_symmetric(&pt(&r.ctx, vec![4]), &mut r.rng).unwrap();
        let ab = r.evaluator.multiply(&a, &b).unwrap();
        let abc = r.evaluator.multiply(&ab, &c).unwrap();
        assert_eq!(abc.size(), 4);
        assert!(r.evaluator.relinearize(&abc, &eval_keys, MIN_SIZE).is_err());
    }
}
