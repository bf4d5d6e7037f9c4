use crate::*;
use num_bigint::BigUint;
use std::collections::HashSet;

/// Election parameters as published on the bulletin board.
///
/// Created by an administrator and mutable only through parameter updates
/// before voting starts; read-only for everyone afterwards. The order of
/// `eligible_voters` is not protocol-relevant (share assignment re-sorts by
/// public-key value), but ids must be unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    pub title: String,

    /// Voting window bounds, seconds since epoch.
    pub voting_start: i64,
    pub voting_end: i64,

    /// Safe-prime modulus of the election's cyclic group.
    #[serde(with = "crate::serde_dec::uint")]
    pub prime: BigUint,

    /// Public-key identifiers of everyone allowed to vote.
    pub eligible_voters: Vec<String>,
}

impl Election {
    pub fn new(title: String, voting_start: i64, voting_end: i64, prime: BigUint) -> Election {
        Election {
            title,
            voting_start,
            voting_end,
            prime,
            eligible_voters: vec![],
        }
    }

    pub fn with_voters(mut self, eligible_voters: Vec<String>) -> Election {
        self.eligible_voters = eligible_voters;
        self
    }

    /// Sanity-check the parameters before publication.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.voting_end < self.voting_start {
            return Err(ValidationError::InvalidVotingWindow);
        }
        let mut seen = HashSet::with_capacity(self.eligible_voters.len());
        for id in &self.eligible_voters {
            if !seen.insert(id) {
                return Err(ValidationError::DuplicateVoter(id.clone()));
            }
        }
        Ok(())
    }

    pub fn is_eligible(&self, voter_id: &str) -> bool {
        self.eligible_voters.iter().any(|id| id == voter_id)
    }

    pub fn voter_count(&self) -> usize {
        self.eligible_voters.len()
    }
}

/// Lifecycle of an election as observed by one voter process.
///
/// Transitions are strictly forward; polling an already-reached state is a
/// no-op, which is what makes overlapping timer polls idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ElectionState {
    NotStarted,
    VotingOpen,
    VotingClosed,
    SharesSubmitted,
    Tallied,
}

impl ElectionState {
    /// Advance to `next` if it is further along; never regress.
    /// Returns whether the state changed.
    pub fn advance_to(&mut self, next: ElectionState) -> bool {
        if next > *self {
            *self = next;
            true
        } else {
            false
        }
    }
}
