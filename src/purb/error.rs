use thiserror::Error;

use crate::group::EncodingError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PurbError {
    #[error("no viable position for suite {0}")]
    NoViablePosition(String),

    #[error("no entry in this blob opens with the given key")]
    NotForMe,

    #[error("no key positions known for suite {0}")]
    UnknownSuite(String),

    #[error("invalid key positions for suite {suite}: {reason}")]
    InvalidPositions { suite: String, reason: String },

    #[error("entry {index} is invalid: {reason}")]
    InvalidEntry { index: usize, reason: String },

    #[error("hidden keys are {actual} bytes but the layout expects {expected}")]
    KeyLength { expected: usize, actual: usize },

    #[error("invalid layout parameters: {0}")]
    InvalidParams(&'static str),

    #[error("key derivation failed: {0}")]
    Kdf(String),

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}
