use crate::*;
use lazy_static::lazy_static;
use log::debug;
use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::One;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Smallest 512-bit prime (`P`) of the shared identity-key modulus.
const IDENTITY_P: &str = "6703903964971298549787012499102923063739682910296196688861780721860882015036773488400937149083451713845015929093243025426876941405973284973216824503042159";

/// Smallest 511-bit prime (`Q`) of the shared identity-key modulus.
const IDENTITY_Q: &str = "3351951982485649274893506249551461531869841455148098344430890360930441007518386744200468574541725856922507964546621512713438470702986642486608412251521039";

lazy_static! {
    /// The shared identity-key parameter space, version 1.
    ///
    /// Static system parameters, not per-election: every voter derives an
    /// exponent pair in the same fixed modulus, which is what makes public
    /// keys totally ordered integers and share encryption a single
    /// exponentiation.
    pub static ref IDENTITY_SPACE: IdentitySpace = IdentitySpace::v1();
}

/// Fixed parameter space for identity keys.
///
/// The version number pins the tuple (hash algorithm, modulus, derivation
/// order); any change to these is a new version, never a silent edit, so
/// independent implementations cannot drift apart undetected.
pub struct IdentitySpace {
    pub version: u32,
    modulus: BigUint,
    phi: BigUint,
}

impl IdentitySpace {
    fn v1() -> Self {
        let p = BigUint::from_str(IDENTITY_P).expect("mpcvote: bad identity prime constant");
        let q = BigUint::from_str(IDENTITY_Q).expect("mpcvote: bad identity prime constant");
        let one = BigUint::one();
        IdentitySpace {
            version: 1,
            modulus: &p * &q,
            phi: (&p - &one) * (&q - &one),
        }
    }

    /// The shared modulus `n = P * Q`.
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    fn hash_to_modulus(&self, message: &[u8]) -> BigUint {
        BigUint::from_bytes_be(&Sha256::digest(message)) % &self.modulus
    }
}

/// A voter's public identity key: the encryption/verification exponent.
///
/// Its decimal string form is the voter's pseudonymous identifier on the
/// ledger.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicKey(#[serde(with = "crate::serde_dec::uint")] BigUint);

/// A voter's private identity key: the decryption/signing exponent.
///
/// Never transmitted and never persisted; recomputed on demand from the
/// password.
#[derive(Clone, Debug)]
pub struct PrivateKey(BigUint);

/// A deterministically derived identity key pair.
#[derive(Clone, Debug)]
pub struct KeyPair {
    pub public: PublicKey,
    pub private: PrivateKey,
}

impl KeyPair {
    /// Derive the key pair for a password.
    ///
    /// Seeds a ChaCha20 stream with `SHA-256(password)` and samples exponents
    /// until one is invertible mod `phi(n)`. The same password always yields
    /// the same pair, so key material needs no storage.
    pub fn derive(password: &str) -> KeyPair {
        let seed: [u8; 32] = Sha256::digest(password.as_bytes()).into();
        let mut rng = ChaCha20Rng::from_seed(seed);
        let space = &*IDENTITY_SPACE;
        let three = BigUint::from(3u8);
        loop {
            let e = rng.gen_biguint_range(&three, &space.phi);
            if e.is_even() {
                continue;
            }
            if let Some(d) = e.modinv(&space.phi) {
                return KeyPair {
                    public: PublicKey(e),
                    private: PrivateKey(d),
                };
            }
        }
    }

    /// The voter's pseudonymous ledger identifier.
    pub fn voter_id(&self) -> String {
        self.public.to_string()
    }
}

impl PublicKey {
    /// The raw exponent value; defines the total order used for share
    /// assignment.
    pub fn value(&self) -> &BigUint {
        &self.0
    }

    /// Encrypt a share value addressed to the holder of the matching
    /// private key: `m^e mod n`.
    pub fn encrypt(&self, message: &BigUint) -> BigUint {
        message.modpow(&self.0, IDENTITY_SPACE.modulus())
    }

    /// Verify a payload signature: `sig^e == SHA-256(message) mod n`.
    pub fn verify(&self, message: &[u8], signature: &BigUint) -> bool {
        let space = &*IDENTITY_SPACE;
        signature.modpow(&self.0, &space.modulus) == space.hash_to_modulus(message)
    }
}

impl PrivateKey {
    /// Decrypt a share value addressed to this key: `c^d mod n`.
    pub fn decrypt(&self, ciphertext: &BigUint) -> BigUint {
        ciphertext.modpow(&self.0, IDENTITY_SPACE.modulus())
    }

    /// Sign a message: `SHA-256(message)^d mod n`.
    pub fn sign(&self, message: &[u8]) -> BigUint {
        let space = &*IDENTITY_SPACE;
        space.hash_to_modulus(message).modpow(&self.0, &space.modulus)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PublicKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value =
            BigUint::from_str(s).map_err(|_| Error::MalformedKey(format!("bad voter id {}", s)))?;
        Ok(PublicKey(value))
    }
}

/// Derive a voter's per-election cyclic-group secret.
///
/// `s = SHA-256(password || salt) mod p`, output `g^(g^s)` as canonical
/// big-endian bytes. The double exponentiation binds the secret to group
/// membership while staying recomputable from `(password, salt, modulus)`
/// alone.
pub fn derive_secret(group: &CyclicGroup, password: &str, salt: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    let seed = hasher.finalize();
    debug!("secret seed hash {}", hex::encode(&seed));

    let s = BigUint::from_bytes_be(&seed) % group.modulus();
    let inner = group.pow(group.g(), &s);
    let outer = group.pow(group.g(), &inner);
    outer.to_bytes_be()
}
