mod engine;
mod error;
mod keygen;
mod keys;
mod modinv;
mod modpow;
mod padding;
mod prime;
mod prime_tables;

pub use engine::RsaEngine;
pub use error::{Result, RsaError};
pub use keygen::{CancelToken, KeyGenConfig, KeyGenerator, DEFAULT_KEY_BITS, MIN_KEY_BITS};
pub use keys::{KeyPair, PrivateKey, PublicKey, Role};
pub use modinv::{extended_gcd, mod_inverse};
pub use modpow::mod_pow;
pub use padding::{PaddingCodec, SENTINEL, TERMINATOR};
pub use prime::{PrimalityTester, DEFAULT_MILLER_RABIN_ROUNDS};
pub use prime_tables::FIRST_100_PRIMES;
