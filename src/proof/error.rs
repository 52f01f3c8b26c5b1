use thiserror::Error;

use crate::group::EncodingError;

/// Why a transcript was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidProofKind {
    /// A recomputed commitment differs from the one in the transcript.
    CommitMismatch,
    /// OR-branch challenges do not add up to the parent challenge.
    BadSubChallenges,
    /// The transcript is truncated, has trailing bytes, or fails to parse.
    MalformedTranscript,
}

impl std::fmt::Display for InvalidProofKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidProofKind::CommitMismatch => write!(f, "commit mismatch"),
            InvalidProofKind::BadSubChallenges => write!(f, "bad sub-challenges"),
            InvalidProofKind::MalformedTranscript => write!(f, "malformed transcript"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("invalid proof: {0}")]
    InvalidProof(InvalidProofKind),

    #[error("malformed predicate: {0}")]
    MalformedPredicate(String),

    #[error("no value supplied for secret `{0}`")]
    MissingSecret(String),

    #[error("no value supplied for public point `{0}`")]
    MissingPoint(String),

    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("participant index {index} out of range for {count} participants")]
    ParticipantOutOfRange { index: usize, count: usize },

    #[error("inputs of different lengths")]
    LengthMismatch,

    #[error("peer left the protocol")]
    PeerGone,

    #[error("prover or verifier not run")]
    NotRun,
}

impl ProofError {
    pub fn commit_mismatch() -> Self {
        ProofError::InvalidProof(InvalidProofKind::CommitMismatch)
    }

    pub fn malformed_transcript() -> Self {
        ProofError::InvalidProof(InvalidProofKind::MalformedTranscript)
    }

    /// Kind of rejection, if this error is a rejected proof.
    pub fn invalid_kind(&self) -> Option<InvalidProofKind> {
        match self {
            ProofError::InvalidProof(kind) => Some(*kind),
            _ => None,
        }
    }
}
