// Errors raised by key construction, padding and the cipher engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RsaError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RsaError {
    #[error("no modular inverse exists: operands are not coprime")]
    NoInverseExists,
    #[error("key pair failed the encrypt/decrypt self-check")]
    KeyIntegrityFailure,
    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),
    #[error("unsupported key size of {0} bits: must be a multiple of 8 and at least 64")]
    InvalidKeySize(u64),
    #[error("invalid key pair: {0}")]
    InvalidKeyPair(String),
    #[error("key generation was cancelled")]
    Cancelled,
    #[error("unknown key role '{0}': expected 'public' or 'private'")]
    UnknownRole(String),
}
