// RSA key pair generation.

use crate::error::{Result, RsaError};
use crate::keys::KeyPair;
use crate::modinv::mod_inverse;
use crate::prime::{PrimalityTester, DEFAULT_MILLER_RABIN_ROUNDS};
use crate::prime_tables::FIRST_100_PRIMES;

use log::debug;
use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::One;
use rand::{rngs::StdRng, Rng, SeedableRng};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_KEY_BITS: u64 = 2048;
pub const MIN_KEY_BITS: u64 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyGenConfig {
    pub key_bits: u64,
    pub miller_rabin_rounds: u32,
}

impl KeyGenConfig {
    pub fn with_key_bits(mut self, key_bits: u64) -> Self {
        self.key_bits = key_bits;
        self
    }

    pub fn with_miller_rabin_rounds(mut self, rounds: u32) -> Self {
        self.miller_rabin_rounds = rounds;
        self
    }

    /// Key sizes must be whole bytes so every generated modulus has its top
    /// bit set in the leading byte.
    pub fn validate(&self) -> Result<()> {
        if self.key_bits < MIN_KEY_BITS || self.key_bits % 8 != 0 {
            return Err(RsaError::InvalidKeySize(self.key_bits));
        }
        Ok(())
    }
}

impl Default for KeyGenConfig {
    fn default() -> Self {
        Self {
            key_bits: DEFAULT_KEY_BITS,
            miller_rabin_rounds: DEFAULT_MILLER_RABIN_ROUNDS,
        }
    }
}

/// Best-effort cancellation for the unbounded prime search.
///
/// Clones share one flag, so any clone can cancel a search running on
/// another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::default(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct KeyGenerator {
    key_bits: u64,
    tester: PrimalityTester,
}

impl KeyGenerator {
    pub fn new(config: KeyGenConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            key_bits: config.key_bits,
            tester: PrimalityTester::new(&FIRST_100_PRIMES, config.miller_rabin_rounds),
        })
    }

    pub fn key_bits(&self) -> u64 {
        self.key_bits
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<KeyPair> {
        self.generate_cancellable(rng, &CancelToken::new())
    }

    /// Generate a key pair whose modulus has exactly `key_bits` bits.
    ///
    /// p and q are searched concurrently, each with its own generator seeded
    /// from `rng`. If the product falls short of the target size both primes
    /// are discarded and the search restarts.
    pub fn generate_cancellable<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        cancel: &CancelToken,
    ) -> Result<KeyPair> {
        let prime_bits = self.key_bits / 2;

        let (p, q, n) = loop {
            let mut p_rng = StdRng::from_seed(rng.gen());
            let mut q_rng = StdRng::from_seed(rng.gen());
            let (p, q) = rayon::join(
                || self.search_prime(prime_bits, &mut p_rng, cancel),
                || self.search_prime(prime_bits, &mut q_rng, cancel),
            );
            let (p, q) = self.distinct_primes(p?, q?, &mut q_rng, cancel)?;

            let n = &p * &q;
            if n.bits() >= self.key_bits {
                break (p, q, n);
            }
            debug!(
                "modulus came out at {} bits, below the target of {}; restarting",
                n.bits(),
                self.key_bits
            );
        };

        let (e, d, _) = self.derive_exponents(&p, &q, rng)?;
        KeyPair::from_parts(d, e, n)
    }

    /// Search q again for as long as it collides with p.
    fn distinct_primes<R: Rng + ?Sized>(
        &self,
        p: BigUint,
        mut q: BigUint,
        q_rng: &mut R,
        cancel: &CancelToken,
    ) -> Result<(BigUint, BigUint)> {
        while q == p {
            q = self.search_prime(self.key_bits / 2, q_rng, cancel)?;
        }
        Ok((p, q))
    }

    /// Pick a random `e` in `[2, phi)` coprime to the totient and return
    /// `(e, d, phi)` with `d` its inverse.
    fn derive_exponents<R: Rng + ?Sized>(
        &self,
        p: &BigUint,
        q: &BigUint,
        rng: &mut R,
    ) -> Result<(BigUint, BigUint, BigUint)> {
        let one = BigUint::one();
        let phi = (p - &one) * (q - &one);
        let two = BigUint::from(2u64);
        let e = loop {
            let e = rng.gen_biguint_range(&two, &phi);
            if e.gcd(&phi).is_one() {
                break e;
            }
        };
        let d = mod_inverse(&e, &phi)?;
        Ok((e, d, phi))
    }

    /// Draw odd candidates with the top bit set until one is a probable prime.
    fn search_prime<R: Rng + ?Sized>(
        &self,
        bits: u64,
        rng: &mut R,
        cancel: &CancelToken,
    ) -> Result<BigUint> {
        loop {
            if cancel.is_cancelled() {
                return Err(RsaError::Cancelled);
            }
            let mut candidate = rng.gen_biguint(bits);
            candidate.set_bit(bits - 1, true);
            candidate.set_bit(0, true);
            if self.tester.is_probable_prime(&candidate, rng) {
                return Ok(candidate);
            }
        }
    }
}
