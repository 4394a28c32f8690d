// Here's an implementation of Shamir's M-of-S secret sharing over a prime
// field.
//
// Shares of one secret always sit at x = 1..S.  Fixing the X coordinates is
// what lets shares of different secrets be added point-wise: the sum of two
// shares at the same x is a share, at that x, of the sum of the secrets.

use num::bigint::BigUint;
use num::traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use std::collections::HashSet;

use crate::data::Share;
use crate::error::{Error, Result};
use crate::math::Field;

// We don't support more than this many shares, although we could.
pub const MAX_SHARES: u32 = 1024;

// Fewer points than this can't even describe a line.
pub const MIN_RECOVERY_POINTS: usize = 2;

// A Params structure encodes M (the threshold), S (the number of shares
// made for each secret) and the field everything lives in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Params {
    threshold: u32,
    shares: u32,
    field: Field,
}

// Helper: Given a polynomial's coefficients (constant term first), evaluate
// that polynomial at x with Horner's rule.
fn evaluate_poly_at(field: &Field, poly: &[BigUint], x: u32) -> BigUint {
    let x = BigUint::from(x);
    poly.iter()
        .rev()
        .fold(BigUint::zero(), |acc, coeff| field.add(&field.mul(&acc, &x), coeff))
}

impl Params {
    pub fn new(threshold: u32, shares: u32, field: Field) -> Result<Self> {
        // A threshold below two would leave shares no recovery set can use.
        if (threshold as usize) < MIN_RECOVERY_POINTS || threshold > shares {
            return Err(Error::InvalidThreshold { threshold, shares });
        }
        if shares > MAX_SHARES {
            return Err(Error::TooManyShares(shares, MAX_SHARES));
        }
        Ok(Params {
            threshold,
            shares,
            field,
        })
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn shares(&self) -> u32 {
        self.shares
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    // Split a secret according to these parameters.  Returns exactly S
    // shares, at x = 1..S in order.
    //
    // The polynomial is drawn fresh on every call and dropped before
    // returning.  (The security of this scheme is only as good as the RNG
    // you use.)
    pub fn share_secret<R: RngCore + CryptoRng + ?Sized>(
        &self,
        secret: &BigUint,
        rng: &mut R,
    ) -> Result<Vec<Share>> {
        let secret = self.field.element(secret.clone())?;

        // Random polynomial with Y intercept of secret.
        let mut poly = Vec::with_capacity(self.threshold as usize);
        poly.push(secret);
        for _ in 1..self.threshold {
            poly.push(self.field.random(rng));
        }
        debug_assert_eq!(poly.len(), self.threshold as usize);

        Ok((1..=self.shares)
            .map(|x| Share::new(x, evaluate_poly_at(&self.field, &poly, x)))
            .collect())
    }
}

// One-shot form of Params::share_secret.
pub fn generate_shares<R: RngCore + CryptoRng + ?Sized>(
    secret: &BigUint,
    threshold: u32,
    shares: u32,
    field: &Field,
    rng: &mut R,
) -> Result<Vec<Share>> {
    Params::new(threshold, shares, field.clone())?.share_secret(secret, rng)
}

// Reconstruct a secret by Lagrange interpolation at x = 0.
//
// Any M or more shares give back the secret.  With fewer than M shares you
// still get an answer, but it is unrelated to the secret: the points are
// equally consistent with every possible secret.
pub fn recover_secret(shares: &[Share], field: &Field) -> Result<BigUint> {
    if shares.len() < MIN_RECOVERY_POINTS {
        return Err(Error::InsufficientShares {
            provided: shares.len(),
            required: MIN_RECOVERY_POINTS,
        });
    }
    let mut seen = HashSet::with_capacity(shares.len());
    for sh in shares {
        if !seen.insert(sh.x) {
            return Err(Error::DuplicatePoint(sh.x));
        }
    }

    let mut accumulator = BigUint::zero();
    for (i, sh) in shares.iter().enumerate() {
        let xi = BigUint::from(sh.x);
        let mut numerator = BigUint::one();
        let mut denominator = BigUint::one();
        for (j, sh2) in shares.iter().enumerate() {
            if i == j {
                continue;
            }
            let xj = BigUint::from(sh2.x);
            numerator = field.mul(&numerator, &field.neg(&xj));
            denominator = field.mul(&denominator, &field.sub(&xi, &xj));
        }
        let term = field.div(&field.mul(&numerator, &sh.y), &denominator)?;
        accumulator = field.add(&accumulator, &term);
    }
    Ok(accumulator)
}
