// Functions related to identification of prime numbers.

use crate::modpow::mod_pow;
use crate::prime_tables::FIRST_100_PRIMES;

use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::Rng;

pub const DEFAULT_MILLER_RABIN_ROUNDS: u32 = 20;

/// Two-stage probable-prime test: trial division by a table of small primes,
/// then a number of Miller-Rabin rounds with random witnesses.
///
/// A composite survives all rounds with probability at most `4^-rounds`.
#[derive(Debug, Clone, Copy)]
pub struct PrimalityTester {
    small_primes: &'static [u32],
    rounds: u32,
}

impl PrimalityTester {
    pub fn new(small_primes: &'static [u32], rounds: u32) -> Self {
        Self {
            small_primes,
            rounds,
        }
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn is_probable_prime<R: Rng + ?Sized>(&self, candidate: &BigUint, rng: &mut R) -> bool {
        let three = BigUint::from(3u64);
        if candidate < &BigUint::from(2u64) {
            return false;
        }
        if candidate <= &three {
            return true;
        }
        self.survives_trial_division(candidate) && self.miller_rabin(candidate, rng)
    }

    /// Reject candidates with a small factor. A table prime only counts as a
    /// factor if its square does not exceed the candidate, so the table
    /// primes themselves fall through to Miller-Rabin.
    fn survives_trial_division(&self, candidate: &BigUint) -> bool {
        !self.small_primes.iter().any(|&p| {
            (candidate % p).is_zero() && BigUint::from(u64::from(p) * u64::from(p)) <= *candidate
        })
    }

    fn miller_rabin<R: Rng + ?Sized>(&self, candidate: &BigUint, rng: &mut R) -> bool {
        if candidate.is_even() {
            return false;
        }
        let one = BigUint::one();
        let two = BigUint::from(2u64);
        let candidate_minus_one = candidate - &one;

        let mut d = candidate_minus_one.clone();
        let mut s = 0u64;
        while d.is_even() {
            d >>= 1;
            s += 1;
        }

        'rounds: for _ in 0..self.rounds {
            let witness = rng.gen_biguint_range(&two, &candidate_minus_one);
            let mut x = mod_pow(&witness, &d, candidate);
            if x == one {
                continue;
            }
            for _ in 0..s {
                if x == candidate_minus_one {
                    continue 'rounds;
                }
                x = mod_pow(&x, &two, candidate);
            }
            return false;
        }

        true
    }
}

impl Default for PrimalityTester {
    fn default() -> Self {
        Self::new(&FIRST_100_PRIMES, DEFAULT_MILLER_RABIN_ROUNDS)
    }
}
