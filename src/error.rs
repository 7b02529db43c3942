//! Crate-wide error taxonomy.
//!
//! Every fallible operation in this crate returns [`Result<T>`]. Failures are
//! fatal to the current operation: outputs are never partially mutated on the
//! error path (see the propagation policy in the crate's design notes).

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// The complete error taxonomy surfaced by this crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Null/empty buffers, negative sizes, malformed encodings.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Parameter validation failed during context construction.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Two inputs carry different parameter hashes.
    #[error("parameter mismatch: operands were created under different parameter sets")]
    ParameterMismatch,

    /// An operation needs an evaluation/Galois key that was not generated.
    #[error("insufficient keys: {0}")]
    InsufficientKeys(String),

    /// Ciphertext size out of the permitted range (< 2 or > max).
    #[error("invalid ciphertext size: {0}")]
    InvalidSize(String),

    /// Plaintext coefficient exceeds the plaintext modulus, or its degree is out of range.
    #[error("invalid plaintext: {0}")]
    InvalidPlaintext(String),

    /// Division by zero, or inverse of a non-coprime element.
    #[error("arithmetic failure: {0}")]
    ArithmeticFailure(String),

    /// Save/load stream truncation or format-identifier mismatch.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e.to_string())
    }
}
