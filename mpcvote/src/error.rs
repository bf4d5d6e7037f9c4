use thiserror::Error;

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("mpcvote: invalid group: {0}")]
    InvalidGroup(String),

    #[error("mpcvote: invalid identity key: {0}")]
    MalformedKey(String),

    #[error("mpcvote: incomplete share set: {0}")]
    IncompleteShares(String),

    #[error("mpcvote: no tally found in search range [{low}, {high}]")]
    TallyNotFound { low: i64, high: i64 },

    #[error("mpcvote: ledger transaction failed: {0}")]
    Ledger(String),

    #[error("mpcvote: voting has already ended")]
    VotingClosed,

    #[error("mpcvote: voting is still open")]
    VotingStillOpen,

    #[error("mpcvote: a vote has already been submitted for this voter")]
    AlreadyVoted,

    #[error("mpcvote: invalid election parameters: {0}")]
    InvalidElection(#[from] ValidationError),

    #[error("mpcvote: JSON error serializing ballot: {0}")]
    JSONSerialization(#[from] serde_json::Error),
}

/// Ballot and payload validation errors
///
/// A payload that fails validation is rejected and excluded from the tally.
/// These are never fatal to the election.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("mpcvote validation: proof verification failed for voter {0}")]
    ProofVerificationFailed(String),

    #[error("mpcvote validation: bad payload signature for voter {0}")]
    BadSignature(String),

    #[error("mpcvote validation: voter {0} is not eligible in this election")]
    NotEligible(String),

    #[error("mpcvote validation: ballot submitted after voting end")]
    LateSubmission,

    #[error("mpcvote validation: malformed ballot: {0}")]
    MalformedBallot(String),

    #[error("mpcvote validation: encrypted choice is not a group element")]
    NotAGroupElement,

    #[error("mpcvote validation: encrypted choice does not match proof statement")]
    CiphertextMismatch,

    #[error("mpcvote validation: duplicate voter id {0}")]
    DuplicateVoter(String),

    #[error("mpcvote validation: voting window ends before it starts")]
    InvalidVotingWindow,
}
