use super::*;
use chrono::Utc;
use indexmap::IndexMap;
use num_bigint::BigUint;
use num_traits::Zero;
use std::sync::Arc;

// 50-bit safe prime; small enough that five voters' secrets sum without
// wrapping the share field, large enough that the tally search is honest.
const TEST_PRIME: u64 = 562_949_953_422_839;

const TITLE: &str = "Referendum 2026";

const PASSWORDS: [&str; 5] = [
    "4libVkvJt4qyU4EW039Q",
    "zVDDeFaCObXtTK9Rj8YA",
    "RE1SolFDaEhM8OhYLUxT",
    "kTvIFJpS6vjenc3MONdg",
    "MJMEzsEbiZDzgIzHxPGT",
];

fn open_election(voter_ids: Vec<String>) -> Election {
    let now = Utc::now().timestamp();
    Election::new(TITLE.into(), now - 60, now + 3_600, BigUint::from(TEST_PRIME))
        .with_voters(voter_ids)
}

fn engines() -> Vec<VoterCrypto> {
    let prime = BigUint::from(TEST_PRIME);
    PASSWORDS
        .iter()
        .map(|password| VoterCrypto::new(&prime, password, TITLE).unwrap())
        .collect()
}

#[test]
fn five_voter_end_to_end_election() {
    let choices = [Choice::No, Choice::No, Choice::No, Choice::Yes, Choice::Yes];

    let cryptos = engines();
    let voter_ids: Vec<String> = cryptos.iter().map(|c| c.voter_id()).collect();
    let expected_overkey = cryptos
        .iter()
        .fold(BigUint::zero(), |acc, c| acc + c.secret_exponent());

    let board = Arc::new(MemoryBoard::new_admin());
    let election = open_election(voter_ids.clone());
    board.set_election_parameters(&election).unwrap();
    assert_eq!(board.get_election_parameters().unwrap(), election);

    let mut sessions: Vec<VoterSession<Arc<MemoryBoard>>> = cryptos
        .into_iter()
        .map(|crypto| VoterSession::new(election.clone(), crypto, board.clone()).unwrap())
        .collect();

    // Everyone votes. Summing shares before voting closes must fail, and
    // voting twice must fail.
    for (session, choice) in sessions.iter_mut().zip(choices) {
        assert!(matches!(
            session.submit_mpc_sum().unwrap_err(),
            Error::VotingStillOpen
        ));
        session.submit_vote(choice).unwrap();
        assert!(matches!(
            session.submit_vote(choice).unwrap_err(),
            Error::AlreadyVoted
        ));
    }

    // Every submitted ballot carries a valid proof bound to its voter.
    let group = CyclicGroup::new(BigUint::from(TEST_PRIME)).unwrap();
    for payload in board.get_submitted_votes().unwrap() {
        payload.validate(&group, &election).unwrap();
    }

    // Tallying before the sums are in must fail loudly.
    board.close_voting();
    assert!(matches!(
        sessions[0].tally_votes().unwrap_err(),
        Error::IncompleteShares(_)
    ));

    // Everyone publishes their share sum; a second call is a no-op.
    for session in sessions.iter_mut() {
        assert!(matches!(
            session.submit_vote(Choice::Yes).unwrap_err(),
            Error::VotingClosed
        ));
        session.submit_mpc_sum().unwrap();
        session.submit_mpc_sum().unwrap();
    }
    assert_eq!(board.get_mpc_sums().unwrap().len(), 5);

    // The published sums reconstruct exactly the sum of the voter secrets.
    let sums: Vec<ShamirShare> = board
        .get_mpc_sums()
        .unwrap()
        .values()
        .map(|value| ShamirShare::unpack(&value.parse().unwrap()).unwrap())
        .collect();
    let overkey = recover_overkey(&sums, 5).unwrap();
    assert_eq!(overkey, expected_overkey % &*SHARE_FIELD);

    // Any participant can now decode the tally: 2 yes, 3 no.
    let tally = sessions[0].tally_votes().unwrap();
    assert_eq!(tally, Tally { yes: 2, no: 3 });
    assert_eq!(sessions[0].state(), ElectionState::Tallied);

    // Tallying is idempotent and every other voter decodes the same result.
    assert_eq!(sessions[0].tally_votes().unwrap(), tally);
    for session in sessions.iter_mut().skip(1) {
        assert_eq!(session.tally_votes().unwrap(), tally);
    }
}

#[test]
fn forged_outsider_ballots_are_excluded_from_the_tally() {
    let choices = [Choice::Yes, Choice::Yes, Choice::No];

    let prime = BigUint::from(TEST_PRIME);
    let cryptos: Vec<VoterCrypto> = PASSWORDS[..3]
        .iter()
        .map(|password| VoterCrypto::new(&prime, password, TITLE).unwrap())
        .collect();
    let voter_ids: Vec<String> = cryptos.iter().map(|c| c.voter_id()).collect();

    let board = Arc::new(MemoryBoard::new_admin());
    let election = open_election(voter_ids);
    board.set_election_parameters(&election).unwrap();

    let mut sessions: Vec<VoterSession<Arc<MemoryBoard>>> = cryptos
        .into_iter()
        .map(|crypto| VoterSession::new(election.clone(), crypto, board.clone()).unwrap())
        .collect();

    for (session, choice) in sessions.iter_mut().zip(choices) {
        session.submit_vote(choice).unwrap();
    }

    // An outsider with a well-formed ballot but no eligibility slips a
    // payload onto the board directly. The filter must drop it.
    let outsider = VoterCrypto::new(&prime, "not-on-the-roll", TITLE).unwrap();
    let ballot = outsider.create_ballot(Choice::No);
    let serialized = ballot.to_json().unwrap();
    let signature = outsider.sign(serialized.as_bytes());
    let mut forged = VotePayload::new(outsider.voter_id(), serialized, signature);
    forged.submission_timestamp = Utc::now().timestamp();
    board.push_vote(forged, IndexMap::new());

    board.close_voting();
    for session in sessions.iter_mut() {
        session.submit_mpc_sum().unwrap();
    }

    let tally = sessions[0].tally_votes().unwrap();
    assert_eq!(tally, Tally { yes: 2, no: 1 });
}

#[test]
fn session_construction_checks_election_and_group() {
    let prime = BigUint::from(TEST_PRIME);
    let crypto = VoterCrypto::new(&prime, PASSWORDS[0], TITLE).unwrap();
    let id = crypto.voter_id();

    // Duplicate voter ids are rejected.
    let duplicated = open_election(vec![id.clone(), id.clone()]);
    assert!(matches!(
        VoterSession::new(duplicated, crypto, MemoryBoard::new()).unwrap_err(),
        Error::InvalidElection(_)
    ));

    // A session over a different group than the election's is rejected.
    let crypto = VoterCrypto::new(&prime, PASSWORDS[0], TITLE).unwrap();
    let mut mismatched = open_election(vec![id]);
    mismatched.prime = BigUint::from(23u8);
    assert!(matches!(
        VoterSession::new(mismatched, crypto, MemoryBoard::new()).unwrap_err(),
        Error::InvalidGroup(_)
    ));
}

#[test]
fn state_polling_is_monotonic_and_idempotent() {
    let prime = BigUint::from(TEST_PRIME);
    let crypto = VoterCrypto::new(&prime, PASSWORDS[0], TITLE).unwrap();
    let voter_id = crypto.voter_id();

    let board = Arc::new(MemoryBoard::new_admin());
    let election = open_election(vec![voter_id]);
    board.set_election_parameters(&election).unwrap();

    let mut session = VoterSession::new(election, crypto, board.clone()).unwrap();
    assert_eq!(session.state(), ElectionState::NotStarted);

    assert_eq!(session.refresh_state().unwrap(), ElectionState::VotingOpen);
    assert_eq!(session.refresh_state().unwrap(), ElectionState::VotingOpen);

    session.submit_vote(Choice::Yes).unwrap();
    board.close_voting();
    assert_eq!(session.refresh_state().unwrap(), ElectionState::VotingClosed);

    session.submit_mpc_sum().unwrap();
    assert_eq!(
        session.refresh_state().unwrap(),
        ElectionState::SharesSubmitted
    );

    let tally = session.tally_votes().unwrap();
    assert_eq!(tally, Tally { yes: 1, no: 0 });
    assert_eq!(session.state(), ElectionState::Tallied);

    // Polls after completion stay put.
    assert_eq!(session.refresh_state().unwrap(), ElectionState::Tallied);
}
