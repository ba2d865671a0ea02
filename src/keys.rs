// RSA key material.

use crate::error::{Result, RsaError};

use num_bigint::BigUint;
use num_traits::One;

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    exponent: BigUint,
    modulus: BigUint,
}

impl PublicKey {
    pub fn new(exponent: BigUint, modulus: BigUint) -> Self {
        Self { exponent, modulus }
    }

    pub fn exponent(&self) -> &BigUint {
        &self.exponent
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateKey {
    exponent: BigUint,
    modulus: BigUint,
}

impl PrivateKey {
    pub fn new(exponent: BigUint, modulus: BigUint) -> Self {
        Self { exponent, modulus }
    }

    pub fn exponent(&self) -> &BigUint {
        &self.exponent
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }
}

/// Which half of a key pair is used to cipher. The other half deciphers.
///
/// `Public` gives encryption semantics, `Private` gives signing semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Public,
    Private,
}

impl Role {
    pub fn opposite(self) -> Self {
        match self {
            Role::Public => Role::Private,
            Role::Private => Role::Public,
        }
    }
}

impl FromStr for Role {
    type Err = RsaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "public" => Ok(Role::Public),
            "private" => Ok(Role::Private),
            other => Err(RsaError::UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Public => write!(f, "public"),
            Role::Private => write!(f, "private"),
        }
    }
}

/// A private and public key sharing one modulus.
///
/// The modulus bit length must be a multiple of eight: every plaintext block
/// leads with a `0x7f` sentinel, which is only guaranteed to sit below the
/// modulus when the modulus' top byte is at least `0x80`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    private: PrivateKey,
    public: PublicKey,
}

impl KeyPair {
    pub fn new(private: PrivateKey, public: PublicKey) -> Result<Self> {
        if private.modulus != public.modulus {
            return Err(RsaError::InvalidKeyPair(
                "private and public moduli differ".to_string(),
            ));
        }
        let bits = public.modulus.bits();
        if bits < 16 || bits % 8 != 0 {
            return Err(RsaError::InvalidKeyPair(format!(
                "modulus of {bits} bits is not a whole number of at least two bytes"
            )));
        }
        if private.exponent.is_one() || public.exponent.is_one() {
            return Err(RsaError::InvalidKeyPair(
                "an exponent of one leaves messages unencrypted".to_string(),
            ));
        }
        Ok(Self { private, public })
    }

    /// Build a pair from the private exponent `d`, public exponent `e` and
    /// shared modulus `n`.
    pub fn from_parts(d: BigUint, e: BigUint, n: BigUint) -> Result<Self> {
        Self::new(PrivateKey::new(d, n.clone()), PublicKey::new(e, n))
    }

    pub fn private(&self) -> &PrivateKey {
        &self.private
    }

    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    pub fn modulus(&self) -> &BigUint {
        &self.public.modulus
    }

    /// The `(exponent, modulus)` pair that `role` ciphers with.
    pub fn key_for(&self, role: Role) -> (&BigUint, &BigUint) {
        match role {
            Role::Public => (&self.public.exponent, &self.public.modulus),
            Role::Private => (&self.private.exponent, &self.private.modulus),
        }
    }

    pub fn bits(&self) -> u64 {
        self.modulus().bits()
    }

    /// Byte width of every plaintext and ciphertext block.
    pub fn block_width(&self) -> usize {
        self.bits().div_ceil(8) as usize
    }
}
