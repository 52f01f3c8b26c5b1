use thiserror::Error;

use crate::proof::ProofError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShuffleError {
    #[error("invalid shuffle proof")]
    InvalidShuffle,

    #[error("malformed shuffle proof: {0}")]
    MalformedProof(String),

    #[error("proof error: {0}")]
    Proof(#[from] ProofError),

    #[error("dimension mismatch: {0}")]
    Dimension(String),

    #[error("degenerate randomness: {0}")]
    Degenerate(&'static str),
}
