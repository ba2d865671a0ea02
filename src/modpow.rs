// Fast modular exponentiation.

use num_bigint::BigUint;
use num_traits::{One, Zero};

/// Compute `base ^ exponent mod modulus` using right-to-left
/// square-and-multiply.
///
/// The result is always in `[0, modulus)`, so a zero exponent gives `1` for
/// any modulus greater than one.
///
/// # Panics
///
/// Panics if `modulus` is zero.
pub fn mod_pow(base: &BigUint, exponent: &BigUint, modulus: &BigUint) -> BigUint {
    assert!(!modulus.is_zero(), "modulus must be non-zero");
    if modulus.is_one() {
        return BigUint::zero();
    }

    let mut result = BigUint::one();
    let mut square = base % modulus;
    for bit in 0..exponent.bits() {
        if exponent.bit(bit) {
            result = (&result * &square) % modulus;
        }
        square = (&square * &square) % modulus;
    }
    result
}
