use crate::*;
use num_bigint::{BigInt, BigUint, RandBigInt, Sign};
use num_traits::{One, Zero};
use sha2::{Digest, Sha256};

/// Domain tag mixed into deterministic generator derivation.
const GENERATOR_TAG: &[u8] = b"generator";

/// Multiplicative cyclic group backing all ballot cryptography.
///
/// Wraps the order-`q` subgroup of quadratic residues of `Z_p^*` for a safe
/// prime `p = 2q + 1`, together with two independent generators `g` and `G`
/// derived deterministically from the prime alone. Every party holding the
/// same election prime derives the identical group without communication.
///
/// Primality of the supplied modulus is a precondition: it is part of the
/// published election parameters and is not re-checked here beyond cheap
/// structural tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclicGroup {
    modulus: BigUint,
    order: BigUint,
    gen_g: BigUint,
    gen_big_g: BigUint,
}

impl CyclicGroup {
    /// Construct the group for a safe prime modulus.
    ///
    /// Fails with `Error::InvalidGroup` when the modulus is structurally
    /// unusable or when the two derived generators coincide (degenerate
    /// prime with too few quadratic residues). Generator coincidence is
    /// fatal for the election and calls for re-parameterization.
    pub fn new(modulus: BigUint) -> Result<Self, Error> {
        if modulus < BigUint::from(7u8) {
            return Err(Error::InvalidGroup(format!(
                "modulus {} is too small for a safe-prime group",
                modulus
            )));
        }
        // Safe primes above 5 are always 3 mod 4.
        if &modulus % 4u8 != BigUint::from(3u8) {
            return Err(Error::InvalidGroup(format!(
                "modulus {} is not 3 mod 4",
                modulus
            )));
        }

        let order = (&modulus - 1u8) / 2u8;
        let gen_g = derive_generator(&modulus, 0);
        let gen_big_g = derive_generator(&modulus, 1);

        if gen_g == gen_big_g {
            return Err(Error::InvalidGroup(format!(
                "modulus {} does not yield two distinct independent generators",
                modulus
            )));
        }

        Ok(CyclicGroup {
            modulus,
            order,
            gen_g,
            gen_big_g,
        })
    }

    /// The prime modulus `p`.
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// The subgroup order `q = (p - 1) / 2`.
    pub fn order(&self) -> &BigUint {
        &self.order
    }

    /// The blinding generator `g` (independent generator index 0).
    pub fn g(&self) -> &BigUint {
        &self.gen_g
    }

    /// The message generator `G` (independent generator index 1).
    pub fn big_g(&self) -> &BigUint {
        &self.gen_big_g
    }

    /// Exponentiation `base^exp mod p`.
    pub fn pow(&self, base: &BigUint, exp: &BigUint) -> BigUint {
        base.modpow(exp, &self.modulus)
    }

    /// Exponentiation with a signed exponent.
    ///
    /// Proof responses are computed over the integers and may be negative;
    /// a negative exponent exponentiates the inverse.
    pub fn pow_signed(&self, base: &BigUint, exp: &BigInt) -> BigUint {
        match exp.sign() {
            Sign::Minus => self.inverse(base).modpow(exp.magnitude(), &self.modulus),
            _ => base.modpow(exp.magnitude(), &self.modulus),
        }
    }

    /// The group operation `a * b mod p`.
    pub fn mul(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a * b) % &self.modulus
    }

    /// Multiplicative inverse by Fermat: `a^(p-2) mod p`.
    pub fn inverse(&self, a: &BigUint) -> BigUint {
        a.modpow(&(&self.modulus - 2u8), &self.modulus)
    }

    /// Division `a / b mod p` (multiply by the inverse).
    pub fn div(&self, a: &BigUint, b: &BigUint) -> BigUint {
        self.mul(a, &self.inverse(b))
    }

    /// Whether `x` is an element of the quadratic-residue subgroup.
    pub fn contains(&self, x: &BigUint) -> bool {
        !x.is_zero() && x < &self.modulus && self.pow(x, &self.order).is_one()
    }

    /// Inject an integer, checking subgroup membership.
    pub fn element_from_uint(&self, x: &BigUint) -> Option<BigUint> {
        if self.contains(x) {
            Some(x.clone())
        } else {
            None
        }
    }

    /// Inject a canonical big-endian byte string, checking subgroup
    /// membership.
    pub fn element_from_bytes(&self, bytes: &[u8]) -> Option<BigUint> {
        self.element_from_uint(&BigUint::from_bytes_be(bytes))
    }

    /// Uniform random exponent below the subgroup order.
    pub fn random_exponent(&self) -> BigUint {
        rand::thread_rng().gen_biguint_below(&self.order)
    }
}

/// Derive the independent generator with the given index from the prime
/// alone.
///
/// Hashes `tag || p || index || counter`, reduces mod `p` and squares to land
/// in the quadratic-residue subgroup; the counter advances past degenerate
/// candidates (0 and 1). Any accepted value generates the whole order-`q`
/// subgroup since `q` is prime.
fn derive_generator(modulus: &BigUint, index: u32) -> BigUint {
    let one = BigUint::one();
    let mut counter: u32 = 0;
    loop {
        let mut hasher = Sha256::new();
        hasher.update(GENERATOR_TAG);
        hasher.update(modulus.to_bytes_be());
        hasher.update(index.to_be_bytes());
        hasher.update(counter.to_be_bytes());
        let h = BigUint::from_bytes_be(&hasher.finalize()) % modulus;
        let candidate = (&h * &h) % modulus;
        if candidate > one {
            return candidate;
        }
        counter += 1;
    }
}
