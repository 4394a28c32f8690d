// Implements arithmetic in a prime field Z/pZ for an arbitrary public prime p.
//
// Elements are plain BigUint values.  Every operation reduces its result into
// 0..p, so values handed back to callers are always fully reduced.  Inputs may
// be unreduced; they are reduced before use.
//
// The default field is the Mersenne prime 2^127 - 1, which is comfortably
// larger than any sum of balances we expect to aggregate.

use num::bigint::{BigInt, BigUint, RandBigInt};
use num::traits::{One, Zero};
use num::Integer;
use rand::{CryptoRng, RngCore};
use std::fmt::{self, Display, Formatter};

use crate::error::{Error, Result};

// Exponent of the default Mersenne prime.
pub const MERSENNE_EXPONENT: usize = 127;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Field {
    prime: BigUint,
}

// Returns (g, s, t) with a*s + b*t == g == gcd(a, b).
fn extended_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let (mut old_r, mut r) = (a.clone(), b.clone());
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());
    let (mut old_t, mut t) = (BigInt::zero(), BigInt::one());

    while !r.is_zero() {
        let quot = &old_r / &r;
        let next_r = &old_r - &quot * &r;
        old_r = std::mem::replace(&mut r, next_r);
        let next_s = &old_s - &quot * &s;
        old_s = std::mem::replace(&mut s, next_s);
        let next_t = &old_t - &quot * &t;
        old_t = std::mem::replace(&mut t, next_t);
    }
    (old_r, old_s, old_t)
}

impl Field {
    // The modulus must be an odd number >= 3.  We don't run a primality
    // test; a composite modulus shows up as DivisionByZero on the first
    // non-invertible denominator.
    pub fn new(prime: BigUint) -> Result<Self> {
        if prime < BigUint::from(3u32) {
            return Err(Error::InvalidModulus(format!("{} is too small", prime)));
        }
        if prime.is_even() {
            return Err(Error::InvalidModulus(format!("{} is even", prime)));
        }
        Ok(Field { prime })
    }

    pub fn from_u64(prime: u64) -> Result<Self> {
        Field::new(BigUint::from(prime))
    }

    pub fn mersenne127() -> Self {
        Field {
            prime: (BigUint::one() << MERSENNE_EXPONENT) - 1u32,
        }
    }

    pub fn prime(&self) -> &BigUint {
        &self.prime
    }

    // Number of bytes needed to hold any reduced element, big-endian.
    pub fn byte_len(&self) -> usize {
        ((self.prime.bits() + 7) / 8) as usize
    }

    pub fn reduce(&self, v: &BigUint) -> BigUint {
        v % &self.prime
    }

    // Accept v only if it is already a reduced element.
    pub fn element(&self, v: BigUint) -> Result<BigUint> {
        if v < self.prime {
            Ok(v)
        } else {
            Err(Error::ValueOutOfRange)
        }
    }

    pub fn add(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a + b) % &self.prime
    }

    pub fn sub(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (self.reduce(a) + &self.prime - self.reduce(b)) % &self.prime
    }

    pub fn neg(&self, a: &BigUint) -> BigUint {
        (&self.prime - self.reduce(a)) % &self.prime
    }

    pub fn mul(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a * b) % &self.prime
    }

    // Multiplicative inverse by the extended Euclidean algorithm: find s with
    // a*s + p*t == 1, and return s mod p.
    pub fn modinv(&self, a: &BigUint) -> Result<BigUint> {
        let a = self.reduce(a);
        if a.is_zero() {
            return Err(Error::DivisionByZero);
        }
        let p = BigInt::from(self.prime.clone());
        let (g, s, _) = extended_gcd(&BigInt::from(a), &p);
        if !g.is_one() {
            return Err(Error::DivisionByZero);
        }
        s.mod_floor(&p).to_biguint().ok_or(Error::DivisionByZero)
    }

    pub fn div(&self, num: &BigUint, den: &BigUint) -> Result<BigUint> {
        Ok(self.mul(num, &self.modinv(den)?))
    }

    // Uniform element of 0..p.
    pub fn random<R: RngCore + CryptoRng + ?Sized>(&self, rng: &mut R) -> BigUint {
        rng.gen_biguint_below(&self.prime)
    }
}

impl Default for Field {
    fn default() -> Self {
        Field::mersenne127()
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "GF({})", self.prime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    // 2^61 - 1, small enough to check against u128 arithmetic.
    const P61: u64 = (1 << 61) - 1;

    fn f61() -> Field {
        Field::from_u64(P61).unwrap()
    }
    fn big(v: u64) -> BigUint {
        BigUint::from(v)
    }

    #[test]
    fn primes_are_prime() {
        assert!(primal::is_prime(P61));
        assert!(primal::is_prime(65537));
        let m127 = Field::mersenne127();
        assert_eq!(m127.prime(), &((BigUint::one() << 127usize) - 1u32));
        assert_eq!(m127.byte_len(), 16);
    }

    #[test]
    fn bad_moduli() {
        assert!(matches!(Field::from_u64(2), Err(Error::InvalidModulus(_))));
        assert!(matches!(Field::from_u64(1024), Err(Error::InvalidModulus(_))));
        assert!(Field::from_u64(3).is_ok());
    }

    #[test]
    fn add_sub() {
        let f = f61();
        assert_eq!(f.sub(&big(0), &big(100)), big(P61 - 100));
        assert_eq!(f.sub(&big(100), &big(105)), big(P61 - 5));
        assert_eq!(f.sub(&big(300), &big(P61 + 1)), big(299));
        assert_eq!(f.add(&big(1337), &big(P61 - 37)), big(1300));
        assert_eq!(f.neg(&big(0)), big(0));
        assert_eq!(f.add(&f.neg(&big(10)), &f.neg(&big(15))), f.neg(&big(25)));
    }

    #[test]
    fn mult() {
        let f = f61();
        assert_eq!(f.mul(&big(999), &big(1000)), big(999000));
        assert_eq!(f.mul(&big(P61), &big(P61)), big(0));
        assert_eq!(f.mul(&big(P61 - 1), &big(P61 - 1)), big(1));
        assert_eq!(f.mul(&big(P61 - 2), &big(P61 - 2)), big(4));
    }

    #[test]
    fn recip() {
        let f = f61();
        assert_eq!(f.modinv(&big(1)).unwrap(), big(1));
        let inv = f.modinv(&big(999)).unwrap();
        assert_eq!(f.mul(&inv, &big(999)), big(1));
        assert_eq!(f.modinv(&inv).unwrap(), big(999));
        assert_eq!(f.modinv(&big(P61 - 1)).unwrap(), big(P61 - 1));
    }

    #[test]
    fn recip_of_zero() {
        let f = f61();
        assert!(matches!(f.modinv(&big(0)), Err(Error::DivisionByZero)));
        assert!(matches!(f.modinv(&big(P61)), Err(Error::DivisionByZero)));
        assert!(matches!(f.div(&big(5), &big(P61 * 2)), Err(Error::DivisionByZero)));
    }

    #[test]
    fn random_is_reduced() {
        use rand::SeedableRng;
        let f = Field::from_u64(65537).unwrap();
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(9);
        for _ in 0..1000 {
            assert!(f.random(&mut rng) < big(65537));
        }
    }

    quickcheck! {
        fn p_multiply(a: u64, b: u64) -> bool {
            let expected = ((a as u128 % P61 as u128) * (b as u128 % P61 as u128))
                % P61 as u128;
            f61().mul(&big(a), &big(b)) == BigUint::from(expected)
        }

        fn p_add(a: u64, b: u64) -> bool {
            let expected = (a as u128 + b as u128) % P61 as u128;
            f61().add(&big(a), &big(b)) == BigUint::from(expected)
        }

        fn p_recip(a: u64) -> bool {
            let f = f61();
            if a % P61 == 0 {
                return f.modinv(&big(a)).is_err();
            }
            f.mul(&big(a), &f.modinv(&big(a)).unwrap()) == big(1)
        }

        fn p_div(a: u64, b: u64) -> bool {
            let f = f61();
            if b % P61 == 0 {
                return true;
            }
            f.mul(&f.div(&big(a), &big(b)).unwrap(), &big(b)) == f.reduce(&big(a))
        }
    }
}
