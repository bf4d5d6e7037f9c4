use crate::*;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use num_bigint::{BigInt, BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};

lazy_static! {
    /// The fixed prime field the Shamir sharing runs in: the smallest 60-bit
    /// prime.
    ///
    /// Precondition for exact overkey recovery: `n * p` must stay below this
    /// prime, where `n` is the voter count and `p` the election modulus, so
    /// the aggregate secret sum never wraps the field.
    pub static ref SHARE_FIELD: BigUint = BigUint::from(576_460_752_303_423_619u64);
}

/// One Shamir share: the evaluation `y = f(x)` of a sharing polynomial at a
/// non-zero index `x`.
///
/// Shares addressed to the same recipient all carry that recipient's index,
/// which is what lets them be summed pointwise into one share of the
/// aggregate polynomial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShamirShare {
    pub x: BigUint,
    pub y: BigUint,
}

impl ShamirShare {
    /// Pack into the single-integer wire value `x * field + y`.
    pub fn pack(&self) -> BigUint {
        &self.x * &*SHARE_FIELD + &self.y
    }

    /// Unpack a wire value; rejects index zero and values outside the field.
    pub fn unpack(value: &BigUint) -> Result<ShamirShare, Error> {
        let (x, y) = value.div_rem(&SHARE_FIELD);
        if x.is_zero() {
            return Err(Error::IncompleteShares(
                "share index zero is not a valid evaluation point".into(),
            ));
        }
        Ok(ShamirShare { x, y })
    }
}

/// Split a secret into an `n`-of-`n` Shamir sharing over the share field.
///
/// A degree `n - 1` polynomial with `f(0) = secret mod field` and uniformly
/// random coefficients, evaluated at `x = 1..=n` in index order. Every share
/// is required for reconstruction.
pub fn deal_shares(secret: &[u8], n: usize) -> Vec<ShamirShare> {
    let field = &*SHARE_FIELD;
    let mut rng = rand::thread_rng();

    let mut coefficients = vec![BigUint::from_bytes_be(secret) % field];
    for _ in 1..n {
        coefficients.push(rng.gen_biguint_below(field));
    }

    (1..=n)
        .map(|i| {
            let x = BigUint::from(i);
            let y = evaluate(&coefficients, &x);
            ShamirShare { x, y }
        })
        .collect()
}

// Horner evaluation mod the share field.
fn evaluate(coefficients: &[BigUint], x: &BigUint) -> BigUint {
    let field = &*SHARE_FIELD;
    let mut acc = BigUint::zero();
    for c in coefficients.iter().rev() {
        acc = (acc * x + c) % field;
    }
    acc
}

/// Split a voter's secret for all participants and encrypt each share for
/// its recipient.
///
/// Recipients are sorted ascending by public-key integer value before shares
/// are assigned positionally. Every participant reproduces this order
/// independently; share index correctness depends on it, and a mismatched
/// order corrupts reconstruction without any local symptom.
pub fn split_secret(secret: &[u8], recipients: &[PublicKey]) -> IndexMap<String, BigUint> {
    let mut sorted: Vec<&PublicKey> = recipients.iter().collect();
    sorted.sort_by(|a, b| a.value().cmp(b.value()));

    let shares = deal_shares(secret, sorted.len());

    let mut encrypted = IndexMap::with_capacity(sorted.len());
    for (public, share) in sorted.iter().zip(shares) {
        encrypted.insert(public.to_string(), public.encrypt(&share.pack()));
    }
    encrypted
}

/// Decrypt the shares addressed to one recipient and sum them in the field.
///
/// The result is one share of the aggregate polynomial `F = sum f_i`, the
/// recipient's local contribution to reconstructing the global key. All
/// shares must carry the recipient's own index.
pub fn sum_shares(encrypted: &[BigUint], private: &PrivateKey) -> Result<ShamirShare, Error> {
    let field = &*SHARE_FIELD;
    let mut index: Option<BigUint> = None;
    let mut sum = BigUint::zero();

    for ciphertext in encrypted {
        let share = ShamirShare::unpack(&private.decrypt(ciphertext))?;
        match &index {
            None => index = Some(share.x.clone()),
            Some(x) if *x != share.x => {
                return Err(Error::IncompleteShares(
                    "shares addressed to one recipient carry mismatched indexes".into(),
                ))
            }
            Some(_) => {}
        }
        sum = (sum + share.y) % field;
    }

    let x = index.ok_or_else(|| {
        Error::IncompleteShares("no shares addressed to this recipient".into())
    })?;
    Ok(ShamirShare { x, y: sum })
}

/// Recover the aggregate secret from all `expected` share sums by Lagrange
/// interpolation at zero.
///
/// Threshold equals participant count: fewer (or duplicated) sums fail with
/// `Error::IncompleteShares` rather than ever interpolating a silently wrong
/// key. A single withholding voter therefore blocks recovery, by design.
pub fn recover_overkey(sums: &[ShamirShare], expected: usize) -> Result<BigUint, Error> {
    if expected == 0 || sums.len() != expected {
        return Err(Error::IncompleteShares(format!(
            "expected {} share sums, found {}",
            expected,
            sums.len()
        )));
    }
    lagrange_at_zero(sums)
}

fn lagrange_at_zero(points: &[ShamirShare]) -> Result<BigUint, Error> {
    let field = BigInt::from(SHARE_FIELD.clone());
    let mut acc = BigInt::zero();

    for (i, point) in points.iter().enumerate() {
        let xi = BigInt::from(point.x.clone());
        let mut numerator = BigInt::one();
        let mut denominator = BigInt::one();
        for (j, other) in points.iter().enumerate() {
            if i == j {
                continue;
            }
            let xj = BigInt::from(other.x.clone());
            numerator = numerator * &xj % &field;
            denominator = denominator * (&xj - &xi) % &field;
        }

        let denominator = denominator.mod_floor(&field);
        let inverse = denominator.modinv(&field).ok_or_else(|| {
            Error::IncompleteShares("duplicate share indexes in recovery set".into())
        })?;
        acc = (acc + BigInt::from(point.y.clone()) * numerator % &field * inverse) % &field;
    }

    let recovered = acc.mod_floor(&field);
    Ok(recovered
        .to_biguint()
        .expect("mpcvote: mod_floor result is non-negative"))
}
