use crate::*;
use chrono::Utc;
use indexmap::IndexMap;
use std::sync::{Arc, Mutex};

/// The append-only bulletin board the protocol exchanges everything through.
///
/// Implementations wrap the actual ledger (a smart-contract client, a test
/// double); the core never retries a failed write, every failure surfaces as
/// `Error::Ledger` to the caller.
pub trait BulletinBoard {
    /// Fetch the published election parameters.
    fn get_election_parameters(&self) -> Result<Election, Error>;

    /// Publish or update election parameters. Admin-only; updates are
    /// rejected once voting has started. Fails transactionally.
    fn set_election_parameters(&self, election: &Election) -> Result<(), Error>;

    /// Persist a vote payload together with the submitter's encrypted share
    /// map (recipient voter id -> encrypted share, decimal strings).
    fn submit_vote(
        &self,
        payload: &VotePayload,
        shares: &IndexMap<String, String>,
    ) -> Result<(), Error>;

    /// All vote payloads submitted so far.
    fn get_submitted_votes(&self) -> Result<Vec<VotePayload>, Error>;

    /// Publish a voter's recombined share sum.
    fn submit_mpc_sum(&self, voter_id: &str, value: &str) -> Result<(), Error>;

    /// All published share sums, voter id -> packed share value.
    fn get_mpc_sums(&self) -> Result<IndexMap<String, String>, Error>;

    /// The encrypted shares addressed to one recipient across all
    /// submitters.
    fn get_mpc_shares(&self, voter_id: &str) -> Result<Vec<String>, Error>;

    fn is_voting_closed(&self) -> Result<bool, Error>;

    fn has_tally_started(&self) -> Result<bool, Error>;
}

// Voters in one process can share a board handle.
impl<B: BulletinBoard> BulletinBoard for Arc<B> {
    fn get_election_parameters(&self) -> Result<Election, Error> {
        (**self).get_election_parameters()
    }

    fn set_election_parameters(&self, election: &Election) -> Result<(), Error> {
        (**self).set_election_parameters(election)
    }

    fn submit_vote(
        &self,
        payload: &VotePayload,
        shares: &IndexMap<String, String>,
    ) -> Result<(), Error> {
        (**self).submit_vote(payload, shares)
    }

    fn get_submitted_votes(&self) -> Result<Vec<VotePayload>, Error> {
        (**self).get_submitted_votes()
    }

    fn submit_mpc_sum(&self, voter_id: &str, value: &str) -> Result<(), Error> {
        (**self).submit_mpc_sum(voter_id, value)
    }

    fn get_mpc_sums(&self) -> Result<IndexMap<String, String>, Error> {
        (**self).get_mpc_sums()
    }

    fn get_mpc_shares(&self, voter_id: &str) -> Result<Vec<String>, Error> {
        (**self).get_mpc_shares(voter_id)
    }

    fn is_voting_closed(&self) -> Result<bool, Error> {
        (**self).is_voting_closed()
    }

    fn has_tally_started(&self) -> Result<bool, Error> {
        (**self).has_tally_started()
    }
}

#[derive(Default, Debug)]
struct BoardState {
    election: Option<Election>,
    votes: Vec<VotePayload>,
    /// recipient voter id -> encrypted shares from each submitter
    shares: IndexMap<String, Vec<String>>,
    sums: IndexMap<String, String>,
    voting_closed: bool,
    tally_started: bool,
}

/// A simple in-memory bulletin board.
///
/// Stands in for the ledger in tests and local runs: transactional rejection
/// of unauthorized or out-of-window writes, server-side submission
/// timestamps, and manual control over the voting-closed and tally-started
/// signals.
#[derive(Default, Debug)]
pub struct MemoryBoard {
    inner: Mutex<BoardState>,
    admin: bool,
}

impl MemoryBoard {
    pub fn new() -> Self {
        MemoryBoard::default()
    }

    /// A board handle with parameter-update rights.
    pub fn new_admin() -> Self {
        MemoryBoard {
            inner: Mutex::default(),
            admin: true,
        }
    }

    /// Close voting ahead of the scheduled end, as an administrator can.
    pub fn close_voting(&self) {
        self.lock().voting_closed = true;
    }

    pub fn start_tally(&self) {
        self.lock().tally_started = true;
    }

    /// Insert a payload as-is, without stamping or window checks. Test
    /// scaffolding for exercising the tally filter.
    pub fn push_vote(&self, payload: VotePayload, shares: IndexMap<String, String>) {
        let mut state = self.lock();
        state.votes.push(payload);
        for (recipient, share) in shares {
            state.shares.entry(recipient).or_default().push(share);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BoardState> {
        self.inner.lock().expect("mpcvote: board lock poisoned")
    }
}

impl BulletinBoard for MemoryBoard {
    fn get_election_parameters(&self) -> Result<Election, Error> {
        self.lock()
            .election
            .clone()
            .ok_or_else(|| Error::Ledger("no election parameters published".into()))
    }

    fn set_election_parameters(&self, election: &Election) -> Result<(), Error> {
        if !self.admin {
            return Err(Error::Ledger(
                "election parameter update requires administrator rights".into(),
            ));
        }
        let mut state = self.lock();
        if let Some(existing) = &state.election {
            if Utc::now().timestamp() >= existing.voting_start {
                return Err(Error::Ledger(
                    "election parameters are immutable once voting has started".into(),
                ));
            }
        }
        state.election = Some(election.clone());
        Ok(())
    }

    fn submit_vote(
        &self,
        payload: &VotePayload,
        shares: &IndexMap<String, String>,
    ) -> Result<(), Error> {
        let mut state = self.lock();
        if state.voting_closed {
            return Err(Error::Ledger("vote submitted after voting closed".into()));
        }

        let mut stamped = payload.clone();
        stamped.submission_timestamp = Utc::now().timestamp();
        state.votes.push(stamped);

        for (recipient, share) in shares {
            state
                .shares
                .entry(recipient.clone())
                .or_default()
                .push(share.clone());
        }
        Ok(())
    }

    fn get_submitted_votes(&self) -> Result<Vec<VotePayload>, Error> {
        Ok(self.lock().votes.clone())
    }

    fn submit_mpc_sum(&self, voter_id: &str, value: &str) -> Result<(), Error> {
        self.lock().sums.insert(voter_id.into(), value.into());
        Ok(())
    }

    fn get_mpc_sums(&self) -> Result<IndexMap<String, String>, Error> {
        Ok(self.lock().sums.clone())
    }

    fn get_mpc_shares(&self, voter_id: &str) -> Result<Vec<String>, Error> {
        Ok(self.lock().shares.get(voter_id).cloned().unwrap_or_default())
    }

    fn is_voting_closed(&self) -> Result<bool, Error> {
        let state = self.lock();
        if state.voting_closed {
            return Ok(true);
        }
        match &state.election {
            Some(election) => Ok(Utc::now().timestamp() > election.voting_end),
            None => Ok(false),
        }
    }

    fn has_tally_started(&self) -> Result<bool, Error> {
        Ok(self.lock().tally_started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    fn election() -> Election {
        let now = Utc::now().timestamp();
        Election::new(
            "board test".into(),
            now - 10,
            now + 3_600,
            BigUint::from(23u8),
        )
    }

    #[test]
    fn parameter_updates_require_admin_rights() {
        let board = MemoryBoard::new();
        let err = board.set_election_parameters(&election()).unwrap_err();
        assert!(matches!(err, Error::Ledger(_)));

        let admin = MemoryBoard::new_admin();
        let params = election();
        admin.set_election_parameters(&params).unwrap();
        assert_eq!(admin.get_election_parameters().unwrap(), params);
    }

    #[test]
    fn parameters_freeze_once_voting_starts() {
        let admin = MemoryBoard::new_admin();
        admin.set_election_parameters(&election()).unwrap();

        // Voting started ten seconds ago, so updates must fail.
        let err = admin.set_election_parameters(&election()).unwrap_err();
        assert!(matches!(err, Error::Ledger(_)));
    }

    #[test]
    fn votes_are_stamped_and_rejected_after_close() {
        let board = MemoryBoard::new_admin();
        board.set_election_parameters(&election()).unwrap();

        let payload = VotePayload::new("1".into(), "{}".into(), BigUint::from(0u8));
        board.submit_vote(&payload, &IndexMap::new()).unwrap();
        let stored = board.get_submitted_votes().unwrap();
        assert_ne!(stored[0].submission_timestamp, 0);

        board.close_voting();
        assert!(board.is_voting_closed().unwrap());
        let err = board.submit_vote(&payload, &IndexMap::new()).unwrap_err();
        assert!(matches!(err, Error::Ledger(_)));
    }

    #[test]
    fn shares_are_routed_to_their_recipients() {
        let board = MemoryBoard::new_admin();
        board.set_election_parameters(&election()).unwrap();

        let mut shares = IndexMap::new();
        shares.insert("alice".to_string(), "11".to_string());
        shares.insert("bob".to_string(), "22".to_string());
        let payload = VotePayload::new("alice".into(), "{}".into(), BigUint::from(0u8));
        board.submit_vote(&payload, &shares).unwrap();

        assert_eq!(board.get_mpc_shares("alice").unwrap(), vec!["11"]);
        assert_eq!(board.get_mpc_shares("bob").unwrap(), vec!["22"]);
        assert!(board.get_mpc_shares("carol").unwrap().is_empty());
    }
}
