use crate::*;
use num_bigint::{BigInt, BigUint};

/// The decoded election result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub yes: u32,
    pub no: u32,
}

impl Tally {
    /// Convert a signed vote sum over `valid_votes` ballots into yes/no
    /// counts.
    ///
    /// With every vote contributing +1 or -1, `valid_votes` and the sum
    /// always share parity, so both divisions are exact and
    /// `yes + no == valid_votes`, `yes - no == sum`.
    pub fn from_sum(valid_votes: usize, sum: i64) -> Tally {
        let n = valid_votes as i64;
        Tally {
            yes: ((n + sum) / 2) as u32,
            no: ((n - sum) / 2) as u32,
        }
    }
}

/// Group-operation product of all encrypted choices, `None` for an empty set.
pub fn combine_ballots(group: &CyclicGroup, choices: &[BigUint]) -> Option<BigUint> {
    let mut iter = choices.iter();
    let first = iter.next()?.clone();
    Some(iter.fold(first, |acc, choice| group.mul(&acc, choice)))
}

/// Recover the signed vote sum from the combined ballot product and the
/// reconstructed overkey.
///
/// Divides out the blinding factor `g^overkey`, leaving `G^(sum v_i)`, then
/// searches candidate exponents linearly. The search window is
/// `[-max(5, voter_count), voter_count]`; the linear scan is only viable
/// because the window is bounded by the voter count, and the true sum always
/// lies inside it for any voter count >= 1. No match means a protocol
/// invariant was violated upstream (miscounted voters, corrupted shares) and
/// fails loudly with `Error::TallyNotFound` rather than widening the search.
pub fn decrypt_tally(
    group: &CyclicGroup,
    tally: &BigUint,
    overkey: &BigUint,
    voter_count: usize,
) -> Result<i64, Error> {
    let blinding = group.pow(group.g(), overkey);
    let decrypted = group.div(tally, &blinding);

    let low = -(voter_count.max(5) as i64);
    let high = voter_count as i64;

    let mut candidate = group.pow_signed(group.big_g(), &BigInt::from(low));
    for exponent in low..=high {
        if candidate == decrypted {
            return Ok(exponent);
        }
        candidate = group.mul(&candidate, group.big_g());
    }
    Err(Error::TallyNotFound { low, high })
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::RandBigInt;
    use num_traits::Zero;

    fn group() -> CyclicGroup {
        CyclicGroup::new(BigUint::from(562_949_953_422_839u64)).unwrap()
    }

    // Build the combined ballot product for synthetic secrets and a uniform
    // vote, without going through ballot construction.
    fn synthetic_tally(group: &CyclicGroup, secrets: &[BigUint], vote_sum: i64) -> BigUint {
        let secret_sum = secrets.iter().fold(BigUint::zero(), |acc, s| acc + s);
        group.mul(
            &group.pow(group.g(), &secret_sum),
            &group.pow_signed(group.big_g(), &BigInt::from(vote_sum)),
        )
    }

    #[test]
    fn decodes_small_sums() {
        let group = group();
        let mut rng = rand::thread_rng();
        let secrets: Vec<BigUint> = (0..5)
            .map(|_| rng.gen_biguint_below(group.modulus()))
            .collect();
        let overkey = secrets.iter().fold(BigUint::zero(), |acc, s| acc + s);

        for sum in [-5i64, -1, 0, 1, 5] {
            let tally = synthetic_tally(&group, &secrets, sum);
            assert_eq!(decrypt_tally(&group, &tally, &overkey, 5).unwrap(), sum);
        }
    }

    #[test]
    fn search_window_covers_extreme_sums_at_any_voter_count() {
        let group = group();
        let mut rng = rand::thread_rng();

        for count in [1usize, 100] {
            let secrets: Vec<BigUint> = (0..count)
                .map(|_| rng.gen_biguint_below(group.modulus()))
                .collect();
            let overkey = secrets.iter().fold(BigUint::zero(), |acc, s| acc + s);

            for sum in [-(count as i64), count as i64] {
                let tally = synthetic_tally(&group, &secrets, sum);
                assert_eq!(
                    decrypt_tally(&group, &tally, &overkey, count).unwrap(),
                    sum,
                    "sum {} not found at voter count {}",
                    sum,
                    count
                );
            }
        }
    }

    #[test]
    fn corrupted_overkey_fails_loudly() {
        let group = group();
        let secrets = vec![BigUint::from(1234u32), BigUint::from(5678u32)];
        let overkey = BigUint::from(6912u32);
        let tally = synthetic_tally(&group, &secrets, 2);

        let wrong = &overkey + BigUint::from(1u8);
        let err = decrypt_tally(&group, &tally, &wrong, 2).unwrap_err();
        assert!(matches!(err, Error::TallyNotFound { .. }));
    }

    #[test]
    fn empty_ballot_set_has_no_product() {
        let group = group();
        assert!(combine_ballots(&group, &[]).is_none());

        let one_ballot = vec![group.pow(group.g(), &BigUint::from(9u8))];
        assert_eq!(
            combine_ballots(&group, &one_ballot),
            Some(one_ballot[0].clone())
        );
    }

    #[test]
    fn yes_no_split_preserves_count_and_sum() {
        for (n, sum, yes, no) in [
            (5usize, -1i64, 2u32, 3u32),
            (5, 5, 5, 0),
            (5, -5, 0, 5),
            (4, 0, 2, 2),
            (4, 2, 3, 1),
            (1, -1, 0, 1),
        ] {
            let tally = Tally::from_sum(n, sum);
            assert_eq!((tally.yes, tally.no), (yes, no));
            assert_eq!((tally.yes + tally.no) as usize, n);
            assert_eq!(tally.yes as i64 - tally.no as i64, sum);
        }
    }
}
