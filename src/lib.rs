//! `bfv-core`: ring arithmetic and scheme operations for the Brakerski/
//! Fan-Vercauteren homomorphic encryption scheme.
//!
//! A [`ContextData`](context::ContextData) fixes a parameter set (ring
//! degree, RNS coefficient modulus, plaintext modulus) and its derived
//! precomputation. From there: [`KeyGenerator`](keys::KeyGenerator) produces
//! a [`SecretKey`](keys::SecretKey), [`PublicKey`](keys::PublicKey),
//! [`EvaluationKeys`](keys::EvaluationKeys), and
//! [`GaloisKeys`](keys::GaloisKeys); [`Encryptor`](encryptor::Encryptor) and
//! [`Decryptor`](decryptor::Decryptor) move [`Plaintext`](plaintext::Plaintext)s
//! in and out of [`Ciphertext`](ciphertext::Ciphertext)s; and
//! [`Evaluator`](evaluator::Evaluator) performs homomorphic arithmetic on
//! them.

pub mod arith;
pub mod ciphertext;
pub mod context;
pub mod decryptor;
pub mod encryptor;
pub mod error;
pub mod evaluator;
pub mod keys;
pub mod modulus;
pub mod ntt;
pub mod nussbaumer;
pub mod plaintext;
pub mod pool;
pub mod poly;
pub mod rns;
mod rns_sample;
pub mod sampling;
pub mod serialize;
mod uint;

pub use ciphertext::Ciphertext;
pub use context::{ContextData, EncryptionParameters, EncryptionParametersBuilder};
pub use decryptor::Decryptor;
pub use encryptor::Encryptor;
pub use error::{Error, Result};
pub use evaluator::Evaluator;
pub use keys::{EvaluationKeys, GaloisKeys, KeyGenerator, PublicKey, SecretKey};
pub use plaintext::Plaintext;
