use crate::*;
use num_bigint::BigUint;
use std::str::FromStr;

/// A voter's binary choice, encoded as +1 / -1 in the exponent so ballot
/// products accumulate a signed vote sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Yes,
    No,
}

impl Choice {
    /// The exponent value this choice contributes to the tally.
    pub fn value(&self) -> i64 {
        match self {
            Choice::Yes => 1,
            Choice::No => -1,
        }
    }
}

/// Encrypt a choice under the voter's cyclic-group secret: `g^s * G^v mod p`.
///
/// Additively homomorphic in the exponent: the group-operation product of any
/// set of ballots is `g^(sum s_i) * G^(sum v_i)`, and dividing out the
/// blinding factor `g^(sum s_i)` (the overkey) leaves the encoded vote sum.
pub fn encrypt_choice(group: &CyclicGroup, secret: &BigUint, choice: Choice) -> BigUint {
    let h = group.pow(group.g(), secret);
    match choice {
        Choice::Yes => group.mul(&h, group.big_g()),
        Choice::No => group.div(&h, group.big_g()),
    }
}

/// An encrypted choice with its proof of validity. Immutable once built.
///
/// Wire form is JSON with this exact field order, every number a decimal
/// string: `{"choice": ..., "proof": {"y", "b1", "b2", "r1", "r2", "d1",
/// "d2", "c"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    #[serde(with = "crate::serde_dec::uint")]
    pub choice: BigUint,
    pub proof: NIProof,
}

impl Ballot {
    /// Encrypt `choice` and attach the proof of validity.
    pub fn new(group: &CyclicGroup, secret: &BigUint, voter_id: &str, choice: Choice) -> Ballot {
        let encrypted = encrypt_choice(group, secret, choice);
        let proof = NIProof::create(group, secret, voter_id, choice);
        debug_assert_eq!(encrypted, proof.y);
        Ballot {
            choice: encrypted,
            proof,
        }
    }

    /// Serialize to the canonical wire form.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from the wire form.
    pub fn from_json(serialized: &str) -> Result<Ballot, Error> {
        Ok(serde_json::from_str(serialized)?)
    }
}

/// The signed unit a voter persists to the bulletin board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotePayload {
    pub voter_id: String,
    pub ballot: String,
    #[serde(with = "crate::serde_dec::uint")]
    pub signature: BigUint,
    pub submission_timestamp: i64,
}

impl VotePayload {
    /// Assemble a payload; the submission timestamp is stamped by the ledger
    /// on write.
    pub fn new(voter_id: String, ballot: String, signature: BigUint) -> VotePayload {
        VotePayload {
            voter_id,
            ballot,
            signature,
            submission_timestamp: 0,
        }
    }

    /// Validate the payload for inclusion in the tally.
    ///
    /// Checks eligibility, the payload signature against the voter's public
    /// key, well-formedness of the ballot, that the ciphertext is a group
    /// element matching the proof statement, the proof itself, and that
    /// submission happened before voting end. The first failing check is
    /// returned; a rejected payload is excluded from the tally, nothing more.
    pub fn validate(&self, group: &CyclicGroup, election: &Election) -> Result<(), ValidationError> {
        if !election.is_eligible(&self.voter_id) {
            return Err(ValidationError::NotEligible(self.voter_id.clone()));
        }

        let public = PublicKey::from_str(&self.voter_id)
            .map_err(|e| ValidationError::MalformedBallot(e.to_string()))?;
        if !public.verify(self.ballot.as_bytes(), &self.signature) {
            return Err(ValidationError::BadSignature(self.voter_id.clone()));
        }

        let ballot = Ballot::from_json(&self.ballot)
            .map_err(|e| ValidationError::MalformedBallot(e.to_string()))?;
        if !group.contains(&ballot.choice) {
            return Err(ValidationError::NotAGroupElement);
        }
        if ballot.choice != ballot.proof.y {
            return Err(ValidationError::CiphertextMismatch);
        }
        if !ballot.proof.verify(group, &self.voter_id) {
            return Err(ValidationError::ProofVerificationFailed(
                self.voter_id.clone(),
            ));
        }

        if self.submission_timestamp > election.voting_end {
            return Err(ValidationError::LateSubmission);
        }

        Ok(())
    }
}
