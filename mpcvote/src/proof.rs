use crate::*;
use num_bigint::{BigInt, BigUint};
use sha2::{Digest, Sha256};

/// Non-interactive disjunctive proof that an encrypted choice is one of
/// exactly two permitted values.
///
/// A Chaum-Pedersen-style OR-proof transcript: `y = g^s * G^v` is the
/// ciphertext, `(b1, b2)` the branch commitments, `c` the Fiat-Shamir
/// challenge over `(voter id, y, b1, b2)` and `(r1, r2, d1, d2)` the
/// responses and challenge split. The challenge binding to the voter id
/// prevents replaying a valid transcript under another voter's ballot.
///
/// Responses are computed over the integers without modular reduction (the
/// component range exceeds the group order, so the arithmetic is exact) and
/// may be negative. Field order matches the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NIProof {
    #[serde(with = "crate::serde_dec::uint")]
    pub y: BigUint,
    #[serde(with = "crate::serde_dec::uint")]
    pub b1: BigUint,
    #[serde(with = "crate::serde_dec::uint")]
    pub b2: BigUint,
    #[serde(with = "crate::serde_dec::int")]
    pub r1: BigInt,
    #[serde(with = "crate::serde_dec::int")]
    pub r2: BigInt,
    #[serde(with = "crate::serde_dec::int")]
    pub d1: BigInt,
    #[serde(with = "crate::serde_dec::int")]
    pub d2: BigInt,
    #[serde(with = "crate::serde_dec::int")]
    pub c: BigInt,
}

impl NIProof {
    /// Prove that the ciphertext for `choice` encodes +1 or -1 without
    /// revealing which.
    ///
    /// One routine covers both statements: the branch matching `choice` is
    /// proven for real (commitment `g^w`, response derived from the secret),
    /// the other branch is simulated from a sampled response and challenge
    /// share. Branch 1 verifies against `(y*G)^d1`, branch 2 against
    /// `(y/G)^d2`, so YES simulates branch 1 and NO simulates branch 2.
    pub fn create(group: &CyclicGroup, secret: &BigUint, voter_id: &str, choice: Choice) -> NIProof {
        let w = group.random_exponent();
        let r_sim = group.random_exponent();
        let d_sim = group.random_exponent();
        NIProof::build(group, secret, voter_id, choice, &w, &r_sim, &d_sim)
    }

    // Deterministic core, split out so tests can pin the nonces.
    fn build(
        group: &CyclicGroup,
        secret: &BigUint,
        voter_id: &str,
        choice: Choice,
        w: &BigUint,
        r_sim: &BigUint,
        d_sim: &BigUint,
    ) -> NIProof {
        let h = group.pow(group.g(), secret);
        let y = match choice {
            Choice::Yes => group.mul(&h, group.big_g()),
            Choice::No => group.div(&h, group.big_g()),
        };

        let real = group.pow(group.g(), w);
        let sim_base = match choice {
            Choice::Yes => group.mul(&y, group.big_g()),
            Choice::No => group.div(&y, group.big_g()),
        };
        let sim = group.mul(&group.pow(group.g(), r_sim), &group.pow(&sim_base, d_sim));

        let (b1, b2) = match choice {
            Choice::Yes => (sim, real),
            Choice::No => (real, sim),
        };

        let c = BigInt::from(challenge(group, voter_id, &y, &b1, &b2));
        let d_real = &c - BigInt::from(d_sim.clone());
        let r_real = BigInt::from(w.clone()) - BigInt::from(secret.clone()) * &d_real;
        let r_sim = BigInt::from(r_sim.clone());
        let d_sim = BigInt::from(d_sim.clone());

        match choice {
            Choice::Yes => NIProof {
                y,
                b1,
                b2,
                r1: r_sim,
                r2: r_real,
                d1: d_sim,
                d2: d_real,
                c,
            },
            Choice::No => NIProof {
                y,
                b1,
                b2,
                r1: r_real,
                r2: r_sim,
                d1: d_real,
                d2: d_sim,
                c,
            },
        }
    }

    /// Verify the transcript against the claimed voter id.
    ///
    /// Checks, in order: subgroup membership of the transcript elements, the
    /// Fiat-Shamir challenge recomputation, the challenge split
    /// `d1 + d2 == c` over the integers, and both branch equations
    /// `b1 == g^r1 * (y*G)^d1` and `b2 == g^r2 * (y/G)^d2`.
    pub fn verify(&self, group: &CyclicGroup, voter_id: &str) -> bool {
        if !group.contains(&self.y) || !group.contains(&self.b1) || !group.contains(&self.b2) {
            return false;
        }

        let expected = BigInt::from(challenge(group, voter_id, &self.y, &self.b1, &self.b2));
        if self.c != expected {
            return false;
        }

        if &self.d1 + &self.d2 != self.c {
            return false;
        }

        let y_times_g = group.mul(&self.y, group.big_g());
        let lhs1 = group.mul(
            &group.pow_signed(group.g(), &self.r1),
            &group.pow_signed(&y_times_g, &self.d1),
        );
        if lhs1 != self.b1 {
            return false;
        }

        let y_over_g = group.div(&self.y, group.big_g());
        let lhs2 = group.mul(
            &group.pow_signed(group.g(), &self.r2),
            &group.pow_signed(&y_over_g, &self.d2),
        );
        lhs2 == self.b2
    }
}

/// Fiat-Shamir challenge `SHA-256(voter_id || y || b1 || b2) mod p`.
///
/// The voter id enters as its UTF-8 string form, group elements as canonical
/// big-endian bytes.
fn challenge(
    group: &CyclicGroup,
    voter_id: &str,
    y: &BigUint,
    b1: &BigUint,
    b2: &BigUint,
) -> BigUint {
    let mut hasher = Sha256::new();
    hasher.update(voter_id.as_bytes());
    hasher.update(y.to_bytes_be());
    hasher.update(b1.to_bytes_be());
    hasher.update(b2.to_bytes_be());
    BigUint::from_bytes_be(&hasher.finalize()) % group.modulus()
}
