// Extended Euclidean algorithm and modular inversion.

use crate::error::{Result, RsaError};

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};

/// Return `(g, x, y)` such that `a * x + b * y = g = gcd(a, b)`.
///
/// Runs the iterative form of the algorithm, carrying both Bézout
/// coefficients alongside the remainder sequence until the remainder is zero.
pub fn extended_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let (mut r_prev, mut r) = (a.clone(), b.clone());
    let (mut x_prev, mut x) = (BigInt::one(), BigInt::zero());
    let (mut y_prev, mut y) = (BigInt::zero(), BigInt::one());

    while !r.is_zero() {
        let q = r_prev.div_floor(&r);
        let r_next = &r_prev - &q * &r;
        r_prev = std::mem::replace(&mut r, r_next);
        let x_next = &x_prev - &q * &x;
        x_prev = std::mem::replace(&mut x, x_next);
        let y_next = &y_prev - &q * &y;
        y_prev = std::mem::replace(&mut y, y_next);
    }

    (r_prev, x_prev, y_prev)
}

/// Find `d` in `[0, m)` such that `a * d = 1 (mod m)`.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Result<BigUint> {
    if m.is_zero() {
        return Err(RsaError::NoInverseExists);
    }
    let m_signed = BigInt::from_biguint(Sign::Plus, m.clone());
    let (g, x, _) = extended_gcd(&BigInt::from_biguint(Sign::Plus, a.clone()), &m_signed);
    if !g.is_one() {
        return Err(RsaError::NoInverseExists);
    }

    // mod_floor keeps negative coefficients in [0, m).
    x.mod_floor(&m_signed)
        .to_biguint()
        .ok_or(RsaError::NoInverseExists)
}
