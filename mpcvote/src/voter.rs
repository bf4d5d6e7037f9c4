use crate::*;
use chrono::Utc;
use indexmap::IndexMap;
use log::{debug, info, warn};
use num_bigint::BigUint;
use std::str::FromStr;

/// A voter's cryptographic engine for one election.
///
/// Owns the cyclic group, the per-election secret and the identity key pair,
/// all derived deterministically from `(prime, password, salt)`. Nothing here
/// is persisted or transmitted in cleartext; a voter rebuilds the engine from
/// the password whenever needed.
#[derive(Debug)]
pub struct VoterCrypto {
    group: CyclicGroup,
    secret: Vec<u8>,
    keypair: KeyPair,
}

impl VoterCrypto {
    pub fn new(prime: &BigUint, password: &str, salt: &str) -> Result<VoterCrypto, Error> {
        let group = CyclicGroup::new(prime.clone())?;
        info!(
            "initializing voter crypto for prime {} (salt {})",
            group.modulus(),
            salt
        );
        let secret = derive_secret(&group, password, salt);
        let keypair = KeyPair::derive(password);
        debug!("voter id {}", keypair.voter_id());

        Ok(VoterCrypto {
            group,
            secret,
            keypair,
        })
    }

    pub fn group(&self) -> &CyclicGroup {
        &self.group
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.keypair.public
    }

    /// The voter's pseudonymous ledger identifier.
    pub fn voter_id(&self) -> String {
        self.keypair.voter_id()
    }

    /// The secret as the exponent it contributes to ballots and the overkey.
    pub fn secret_exponent(&self) -> BigUint {
        BigUint::from_bytes_be(&self.secret)
    }

    /// Encrypt a choice and attach its proof of validity.
    pub fn create_ballot(&self, choice: Choice) -> Ballot {
        Ballot::new(&self.group, &self.secret_exponent(), &self.voter_id(), choice)
    }

    pub fn sign(&self, message: &[u8]) -> BigUint {
        self.keypair.private.sign(message)
    }

    /// Shamir-split the secret for all participants, encrypted per recipient.
    pub fn split_shares(&self, recipients: &[PublicKey]) -> IndexMap<String, BigUint> {
        split_secret(&self.secret, recipients)
    }

    /// Decrypt and sum the shares addressed to this voter.
    pub fn sum_own_shares(&self, encrypted: &[BigUint]) -> Result<ShamirShare, Error> {
        sum_shares(encrypted, &self.keypair.private)
    }
}

/// One voter's view of the election protocol.
///
/// Sequences ballot submission, MPC-sum submission and tallying against the
/// bulletin board. Built by explicit construction from its collaborators; no
/// ambient registry. Each session is an independent state machine: concurrent
/// voters share nothing but the board.
#[derive(Debug)]
pub struct VoterSession<B: BulletinBoard> {
    election: Election,
    crypto: VoterCrypto,
    board: B,
    state: ElectionState,
    has_voted: bool,
}

impl<B: BulletinBoard> VoterSession<B> {
    /// Wire up a session. The election parameters must validate and match
    /// the group the crypto engine was built for.
    pub fn new(election: Election, crypto: VoterCrypto, board: B) -> Result<Self, Error> {
        election.validate()?;
        if &election.prime != crypto.group().modulus() {
            return Err(Error::InvalidGroup(
                "election prime differs from the crypto engine's group".into(),
            ));
        }

        Ok(VoterSession {
            election,
            crypto,
            board,
            state: ElectionState::NotStarted,
            has_voted: false,
        })
    }

    pub fn voter_id(&self) -> String {
        self.crypto.voter_id()
    }

    pub fn state(&self) -> ElectionState {
        self.state
    }

    /// Submit this voter's ballot: encrypt the choice, prove its validity,
    /// sign the serialized ballot, and publish it together with the Shamir
    /// shares of the voting secret for every eligible voter.
    ///
    /// Valid only while voting is open. The ledger write is at-most-once:
    /// a failure surfaces to the caller, nothing is retried.
    pub fn submit_vote(&mut self, choice: Choice) -> Result<(), Error> {
        if Utc::now().timestamp() >= self.election.voting_end || self.board.is_voting_closed()? {
            return Err(Error::VotingClosed);
        }
        if self.has_voted {
            return Err(Error::AlreadyVoted);
        }

        let voter_id = self.crypto.voter_id();
        info!("submitting vote for voter {}", voter_id);

        let ballot = self.crypto.create_ballot(choice);
        let serialized = ballot.to_json()?;
        let signature = self.crypto.sign(serialized.as_bytes());

        let recipients = self.eligible_public_keys()?;
        let shares: IndexMap<String, String> = self
            .crypto
            .split_shares(&recipients)
            .into_iter()
            .map(|(recipient, ciphertext)| (recipient, ciphertext.to_string()))
            .collect();

        let payload = VotePayload::new(voter_id.clone(), serialized, signature);
        self.board.submit_vote(&payload, &shares)?;
        self.has_voted = true;
        self.state.advance_to(ElectionState::VotingOpen);

        info!("vote submitted for voter {}", voter_id);
        Ok(())
    }

    /// Decrypt the shares addressed to this voter, sum them, and publish the
    /// sum.
    ///
    /// Valid only once voting has closed. Idempotent: if this voter's sum is
    /// already on the board, the call is a no-op, so overlapping poll-driven
    /// invocations cannot double-submit.
    pub fn submit_mpc_sum(&mut self) -> Result<(), Error> {
        if !self.board.is_voting_closed()? {
            return Err(Error::VotingStillOpen);
        }
        self.state.advance_to(ElectionState::VotingClosed);

        let voter_id = self.crypto.voter_id();
        if self.board.get_mpc_sums()?.contains_key(&voter_id) {
            debug!("MPC sum already published for voter {}", voter_id);
            return Ok(());
        }

        info!("submitting MPC share sum for voter {}", voter_id);
        let encrypted = self
            .board
            .get_mpc_shares(&voter_id)?
            .iter()
            .map(|share| {
                BigUint::from_str(share).map_err(|_| {
                    Error::IncompleteShares(format!(
                        "malformed encrypted share addressed to voter {}",
                        voter_id
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let sum = self.crypto.sum_own_shares(&encrypted)?;
        self.board.submit_mpc_sum(&voter_id, &sum.pack().to_string())?;

        info!("MPC share sum submitted for voter {}", voter_id);
        Ok(())
    }

    /// Recover the overkey from all published share sums, filter the
    /// submitted ballots, and decode the final tally.
    ///
    /// Requires every eligible voter's sum on the board; anything less fails
    /// with `Error::IncompleteShares`. Ballots failing validation are logged
    /// and excluded, not fatal. Re-running after success recomputes the same
    /// result from board state.
    pub fn tally_votes(&mut self) -> Result<Tally, Error> {
        if !self.board.is_voting_closed()? {
            return Err(Error::VotingStillOpen);
        }

        let expected = self.election.voter_count();
        let sums = self.decode_share_sums(expected)?;
        self.state.advance_to(ElectionState::SharesSubmitted);

        let mut accepted = Vec::new();
        for payload in self.board.get_submitted_votes()? {
            match payload.validate(self.crypto.group(), &self.election) {
                Ok(()) => accepted.push(payload),
                Err(reason) => warn!(
                    "excluding ballot from voter {} at tally: {}",
                    payload.voter_id, reason
                ),
            }
        }

        let choices = accepted
            .iter()
            .map(|payload| Ballot::from_json(&payload.ballot).map(|ballot| ballot.choice))
            .collect::<Result<Vec<_>, _>>()?;

        let product = match combine_ballots(self.crypto.group(), &choices) {
            Some(product) => product,
            None => {
                info!("no valid ballots; tally is empty");
                self.state.advance_to(ElectionState::Tallied);
                return Ok(Tally { yes: 0, no: 0 });
            }
        };

        let overkey = recover_overkey(&sums, expected)?;
        let sum = decrypt_tally(self.crypto.group(), &product, &overkey, accepted.len())?;
        let tally = Tally::from_sum(accepted.len(), sum);
        info!(
            "tally decoded over {} valid ballots: {} yes / {} no",
            accepted.len(),
            tally.yes,
            tally.no
        );

        self.state.advance_to(ElectionState::Tallied);
        Ok(tally)
    }

    /// Poll the board and advance the local election state.
    ///
    /// Monotonic: observing an already-reached state changes nothing, so a
    /// periodic timer can call this as often as it likes.
    pub fn refresh_state(&mut self) -> Result<ElectionState, Error> {
        if self.board.has_tally_started()? {
            self.state.advance_to(ElectionState::Tallied);
        } else if self.all_sums_published()? {
            self.state.advance_to(ElectionState::SharesSubmitted);
        } else if self.board.is_voting_closed()? {
            self.state.advance_to(ElectionState::VotingClosed);
        } else if Utc::now().timestamp() >= self.election.voting_start {
            self.state.advance_to(ElectionState::VotingOpen);
        }
        Ok(self.state)
    }

    fn all_sums_published(&self) -> Result<bool, Error> {
        let expected = self.election.voter_count();
        Ok(expected > 0
            && self.board.is_voting_closed()?
            && self.board.get_mpc_sums()?.len() >= expected)
    }

    fn eligible_public_keys(&self) -> Result<Vec<PublicKey>, Error> {
        self.election
            .eligible_voters
            .iter()
            .map(|id| PublicKey::from_str(id))
            .collect()
    }

    fn decode_share_sums(&self, expected: usize) -> Result<Vec<ShamirShare>, Error> {
        let published = self.board.get_mpc_sums()?;
        if published.len() != expected {
            return Err(Error::IncompleteShares(format!(
                "expected MPC sums from {} voters, found {}",
                expected,
                published.len()
            )));
        }
        published
            .values()
            .map(|value| {
                let packed = BigUint::from_str(value).map_err(|_| {
                    Error::IncompleteShares("malformed MPC sum on the board".into())
                })?;
                ShamirShare::unpack(&packed)
            })
            .collect()
    }
}
