//! Manual little-endian binary encoding for ciphertexts, plaintexts, and key
//! material. Every payload is prefixed with the producing context's
//! parameter hash, so loading under a mismatched context fails fast with
//! [`Error::ParameterMismatch`] rather than silently misinterpreting bytes.
//!
//! No serde: coefficient arrays are already flat `u64` slices, and a direct
//! byte encoding keeps the wire format auditable by hand.

use crate::ciphertext::Ciphertext;
use crate::context::ContextData;
use crate::error::{Error, Result};
use crate::keys::{EvaluationKeys, GaloisKeys, KeySwitchKey, PublicKey, SecretKey};
use crate::plaintext::Plaintext;
use crate::poly::{Poly, Representation, RnsPoly};
use std::io;

fn eof() -> Error {
    Error::IoError(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "unexpected end of serialized input",
    ))
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.buf.len() {
            return Err(eof());
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes(b.try_into().unwrap()))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let b = self.read_bytes(8)?;
        Ok(u64::from_le_bytes(b.try_into().unwrap()))
    }

    fn read_tag(&mut self) -> Result<[u8; 32]> {
        let b = self.read_bytes(32)?;
        Ok(b.try_into().unwrap())
    }
}

fn write_u8(out: &mut Vec<u8>, v: u8) {
    out.push(v);
}

fn write_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn write_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn write_tag(out: &mut Vec<u8>, tag: [u8; 32]) {
    out.extend_from_slice(&tag);
}

fn representation_tag(r: Representation) -> u8 {
    match r {
        Representation::Coefficient => 0,
        Representation::Ntt => 1,
    }
}

fn representation_from_tag(t: u8) -> Result<Representation> {
    match t {
        0 => Ok(Representation::Coefficient),
        1 => Ok(Representation::Ntt),
        other => Err(Error::InvalidArgument(format!(
            "unknown polynomial representation tag {other}"
        ))),
    }
}

fn write_rns_poly(out: &mut Vec<u8>, poly: &RnsPoly) {
    for part in poly.parts() {
        for &c in part.coeffs() {
            write_u64(out, c);
        }
    }
}

fn read_rns_poly(reader: &mut Reader, context: &ContextData, representation: Representation) -> Result<RnsPoly> {
    let n = context.degree();
    let mut parts = Vec::with_capacity(context.coeff_moduli().len());
    for &qi in context.coeff_moduli() {
        let mut coeffs = Vec::with_capacity(n);
        for _ in 0..n {
            coeffs.push(reader.read_u64()?);
        }
        parts.push(Poly::from_coeffs(coeffs, qi, representation)?);
    }
    RnsPoly::from_parts(parts)
}

fn write_key_switch_key(out: &mut Vec<u8>, ksk: &KeySwitchKey) {
    write_u32(out, ksk.decomposition_bit_count());
    write_u64(out, ksk.digits().len() as u64);
    for (a, b) in ksk.digits() {
        write_rns_poly(out, a);
        write_rns_poly(out, b);
    }
}

fn read_key_switch_key(reader: &mut Reader, context: &ContextData) -> Result<KeySwitchKey> {
    let decomposition_bit_count = reader.read_u32()?;
    let digit_count = reader.read_u64()? as usize;
    let mut digits = Vec::with_capacity(digit_count);
    for _ in 0..digit_count {
        let a = read_rns_poly(reader, context, Representation::Ntt)?;
        let b = read_rns_poly(reader, context, Representation::Ntt)?;
        digits.push((a, b));
    }
    Ok(KeySwitchKey::from_parts(digits, decomposition_bit_count))
}

/// `tag(32) | size(u64) | representation(u8) | size * RnsPoly`.
pub fn save_ciphertext(ciphertext: &Ciphertext) -> Vec<u8> {
    let mut out = Vec::new();
    write_tag(&mut out, ciphertext.tag());
    write_u64(&mut out, ciphertext.size() as u64);
    write_u8(&mut out, representation_tag(ciphertext.representation()));
    for part in ciphertext.parts() {
        write_rns_poly(&mut out, part);
    }
    out
}

pub fn load_ciphertext(context: &ContextData, bytes: &[u8]) -> Result<Ciphertext> {
    let mut reader = Reader::new(bytes);
    let tag = reader.read_tag()?;
    context.check_tag(&tag)?;
    let size = reader.read_u64()? as usize;
    let representation = representation_from_tag(reader.read_u8()?)?;
    let mut parts = Vec::with_capacity(size);
    for _ in 0..size {
        parts.push(read_rns_poly(&mut reader, context, representation)?);
    }
    Ciphertext::new(tag, parts)
}

/// `degree(u64) | degree * u64` — no parameter hash, since a plaintext
/// carries no context-specific RNS structure.
pub fn save_plaintext(plaintext: &Plaintext) -> Vec<u8> {
    let mut out = Vec::new();
    write_u64(&mut out, plaintext.degree() as u64);
    for &c in plaintext.coeffs() {
        write_u64(&mut out, c);
    }
    out
}

pub fn load_plaintext(context: &ContextData, bytes: &[u8]) -> Result<Plaintext> {
    let mut reader = Reader::new(bytes);
    let degree = reader.read_u64()? as usize;
    let mut coeffs = Vec::with_capacity(degree);
    for _ in 0..degree {
        coeffs.push(reader.read_u64()?);
    }
    Plaintext::from_coeffs(coeffs, context.plain_modulus(), context.degree())
}

/// `tag(32) | RnsPoly` (NTT domain).
pub fn save_secret_key(secret_key: &SecretKey) -> Vec<u8> {
    let mut out = Vec::new();
    write_tag(&mut out, secret_key.tag());
    write_rns_poly(&mut out, secret_key.data());
    out
}

pub fn load_secret_key(context: &ContextData, bytes: &[u8]) -> Result<SecretKey> {
    let mut reader = Reader::new(bytes);
    let tag = reader.read_tag()?;
    context.check_tag(&tag)?;
    let data = read_rns_poly(&mut reader, context, Representation::Ntt)?;
    Ok(SecretKey::from_parts(tag, data))
}

/// `tag(32) | c0 | c1` (both NTT domain).
pub fn save_public_key(public_key: &PublicKey) -> Vec<u8> {
    let mut out = Vec::new();
    write_tag(&mut out, public_key.tag());
    write_rns_poly(&mut out, public_key.c0());
    write_rns_poly(&mut out, public_key.c1());
    out
}

pub fn load_public_key(context: &ContextData, bytes: &[u8]) -> Result<PublicKey> {
    let mut reader = Reader::new(bytes);
    let tag = reader.read_tag()?;
    context.check_tag(&tag)?;
    let c0 = read_rns_poly(&mut reader, context, Representation::Ntt)?;
    let c1 = read_rns_poly(&mut reader, context, Representation::Ntt)?;
    Ok(PublicKey::from_parts(tag, c0, c1))
}

/// `tag(32) | count(u64) | count * KeySwitchKey`, one entry per ciphertext
/// size reduction step `2..=max_power`.
pub fn save_evaluation_keys(keys: &EvaluationKeys) -> Vec<u8> {
    let mut out = Vec::new();
    write_tag(&mut out, keys.tag());
    let count = keys.max_power() - 1;
    write_u64(&mut out, count as u64);
    for k in 1..=count {
        write_key_switch_key(&mut out, keys.get(k).expect("present by construction"));
    }
    out
}

pub fn load_evaluation_keys(context: &ContextData, bytes: &[u8]) -> Result<EvaluationKeys> {
    let mut reader = Reader::new(bytes);
    let tag = reader.read_tag()?;
    context.check_tag(&tag)?;
    let count = reader.read_u64()? as usize;
    let mut by_power = Vec::with_capacity(count);
    for _ in 0..count {
        by_power.push(read_key_switch_key(&mut reader, context)?);
    }
    Ok(EvaluationKeys::from_parts(tag, by_power))
}

/// `tag(32) | count(u64) | count * (element(u64), KeySwitchKey)`.
pub fn save_galois_keys(keys: &GaloisKeys) -> Vec<u8> {
    let mut out = Vec::new();
    write_tag(&mut out, keys.tag());
    let elements: Vec<u64> = keys.elements().collect();
    write_u64(&mut out, elements.len() as u64);
    for element in elements {
        write_u64(&mut out, element);
        write_key_switch_key(&mut out, keys.get(element).expect("just enumerated"));
    }
    out
}

pub fn load_galois_keys(context: &ContextData, bytes: &[u8]) -> Result<GaloisKeys> {
    let mut reader = Reader::new(bytes);
    let tag = reader.read_tag()?;
    context.check_tag(&tag)?;
    let count = reader.read_u64()? as usize;
    let mut by_element = std::collections::BTreeMap::new();
    for _ in 0..count {
        let element = reader.read_u64()?;
        let ksk = read_key_switch_key(&mut reader, context)?;
        by_element.insert(element, ksk);
    }
    Ok(GaloisKeys::from_parts(tag, by_element))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EncryptionParametersBuilder;
    use crate::encryptor::Encryptor;
    use crate::keys::KeyGenerator;
    use crate::sampling::OsEntropyGenerator;

    fn small_context() -> std::sync::Arc<ContextData> {
        let params = EncryptionParametersBuilder::new()
            .set_poly_modulus_degree(1024)
            .set_coeff_modulus(vec![0xffffee001, 0xffffc4001])
            .set_plain_modulus(1024)
            .build()
            .unwrap();
        ContextData::new(params).unwrap()
    }

    #[test]
    fn ciphertext_roundtrips_through_bytes() {
        let ctx = small_context();
        let mut rng = OsEntropyGenerator::new();
        let keygen = KeyGenerator::new(ctx.clone(), &mut rng);
        let encryptor = Encryptor::with_secret_key(ctx.clone(), keygen.secret_key().clone()).unwrap();
        let pt = Plaintext::from_coeffs(vec![1, 2, 3], ctx.plain_modulus(), ctx.degree()).unwrap();
        let ct = encryptor.encrypt_symmetric(&pt, &mut rng).unwrap();

        let bytes = save_ciphertext(&ct);
        let loaded = load_ciphertext(&ctx, &bytes).unwrap();
        assert_eq!(loaded.size(), ct.size());
        assert_eq!(loaded.tag(), ct.tag());
        for (a, b) in ct.parts().iter().zip(loaded.parts()) {
            for (pa, pb) in a.parts().iter().zip(b.parts()) {
                assert_eq!(pa.coeffs(), pb.coeffs());
            }
        }
    }

    #[test]
    fn plaintext_roundtrips_through_bytes() {
        let ctx = small_context();
        let pt = Plaintext::from_coeffs(vec![9, 8, 7, 6], ctx.plain_modulus(), ctx.degree()).unwrap();
        let bytes = save_plaintext(&pt);
        let loaded = load_plaintext(&ctx, &bytes).unwrap();
        assert_eq!(loaded.coeffs(), pt.coeffs());
    }

    #[test]
    fn secret_key_roundtrips_and_rejects_foreign_context() {
        let ctx = small_context();
        let mut rng = OsEntropyGenerator::new();
        let keygen = KeyGenerator::new(ctx.clone(), &mut rng);
        let bytes = save_secret_key(keygen.secret_key());
        let loaded = load_secret_key(&ctx, &bytes).unwrap();
        assert_eq!(loaded.tag(), keygen.secret_key().tag());

        let other_params = EncryptionParametersBuilder::new()
            .set_poly_modulus_degree(1024)
            .set_coeff_modulus(vec![0xffffee001, 0xffffc4001])
            .set_plain_modulus(256)
            .build()
            .unwrap();
        let other_ctx = ContextData::new(other_params).unwrap();
        assert!(load_secret_key(&other_ctx, &bytes).is_err());
    }

    #[test]
    fn evaluation_keys_roundtrip_through_bytes() {
        let ctx = small_context();
        let mut rng = OsEntropyGenerator::new();
        let keygen = KeyGenerator::new(ctx.clone(), &mut rng);
        let eval_keys = keygen.create_evaluation_keys(3, 30, &mut rng).unwrap();
        let bytes = save_evaluation_keys(&eval_keys);
        let loaded = load_evaluation_keys(&ctx, &bytes).unwrap();
        assert_eq!(loaded.max_power(), eval_keys.max_power());
        assert_eq!(
            loaded.get(1).unwrap().digits().len(),
            eval_keys.get(1).unwrap().digits().len()
        );
    }

    #[test]
    fn galois_keys_roundtrip_through_bytes() {
        let ctx = small_context();
        let mut rng = OsEntropyGenerator::new();
        let keygen = KeyGenerator::new(ctx.clone(), &mut rng);
        let galois_keys = keygen.create_galois_keys(&[3, 5], 30, &mut rng).unwrap();
        let bytes = save_galois_keys(&galois_keys);
        let loaded = load_galois_keys(&ctx, &bytes).unwrap();
        assert!(loaded.has(3));
        assert!(loaded.has(5));
    }
}
