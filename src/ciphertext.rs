//! [`Ciphertext`]: an ordered sequence of `K >= 2` RNS polynomials sharing a
//! parameter-hash tag.

use crate::context::ContextData;
use crate::error::{Error, Result};
use crate::poly::{Representation, RnsPoly};

/// Minimum ciphertext size; sizes below this cannot represent a valid
/// encryption (`c_0 + c_1*s`).
pub const MIN_SIZE: usize = 2;

/// An ordered sequence `(c_0, ..., c_{K-1})` of RNS polynomials representing
/// `Σ c_i * s^i`, tagged with the parameter hash of the context it was
/// produced under.
#[derive(Clone)]
pub struct Ciphertext {
    tag: [u8; 32],
    parts: Vec<RnsPoly>,
}

impl Ciphertext {
    /// Builds a ciphertext from its parts, validating size and that every
    /// part shares the same degree/representation.
    pub fn new(tag: [u8; 32], parts: Vec<RnsPoly>) -> Result<Self> {
        if parts.len() < MIN_SIZE {
            return Err(Error::InvalidSize(format!(
                "ciphertext size must be >= {MIN_SIZE}, got {}",
                parts.len()
            )));
        }
        let n = parts[0].degree();
        let repr = parts[0].representation();
        for p in &parts {
            if p.degree() != n || p.representation() != repr {
                return Err(Error::InvalidArgument(
                    "ciphertext parts must share degree and representation".into(),
                ));
            }
        }
        Ok(Ciphertext { tag, parts })
    }

    pub fn tag(&self) -> [u8; 32] {
        self.tag
    }

    pub fn size(&self) -> usize {
        self.parts.len()
    }

    pub fn parts(&self) -> &[RnsPoly] {
        &self.parts
    }

    pub fn parts_mut(&mut self) -> &mut [RnsPoly] {
        &mut self.parts
    }

    pub fn into_parts(self) -> Vec<RnsPoly> {
        self.parts
    }

    pub fn representation(&self) -> Representation {
        self.parts[0].representation()
    }

    /// Checks this ciphertext carries `context`'s parameter hash.
    pub fn check_context(&self, context: &ContextData) -> Result<()> {
        context.check_tag(&self.tag)
    }

    /// Checks that `self` and `other` were produced under the same
    /// parameter set.
    pub fn check_compatible(&self, other: &Ciphertext) -> Result<()> {
        if self.tag != other.tag {
            return Err(Error::ParameterMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextData, EncryptionParametersBuilder};

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
    fn rejects_undersized_ciphertext() {
        let ctx = small_context();
        let one = ctx.zero_poly();
        assert!(Ciphertext::new(ctx.parameter_hash(), vec![one]).is_err());
    }

    #[test]
    fn detects_incompatible_tags() {
        let ctx = small_context();
        let a = Ciphertext::new(ctx.parameter_hash(), vec![ctx.zero_poly(), ctx.zero_poly()]).unwrap();
        let mut other_tag = ctx.parameter_hash();
        other_tag[0] ^= 0xff;
        let b = Ciphertext::new(other_tag, vec![ctx.zero_poly(), ctx.zero_poly()]).unwrap();
        assert!(a.check_compatible(&b).is_err());
    }
}
