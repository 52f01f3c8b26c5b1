//! Padded uniform random blob (PURB) headers.
//!
//! A header hides, for every recipient, a short encrypted entry that only the
//! holder of the matching private key can find. Each suite advertises a list
//! of candidate positions for its hidden ephemeral key. The key is recovered
//! by XOR-ing all candidate positions together, so readers never learn which
//! position the author actually used. Entries sit in a cascade of
//! power-of-two hash tables following the first key slot. Every other byte of
//! the header is random.

pub mod decode;
pub mod error;
pub mod kdf;
pub mod layout;
pub mod writer;

pub use decode::attempt_decode;
pub use error::PurbError;
pub use kdf::EntryKeys;
pub use layout::{Extent, ReservationMap, Tag};
pub use writer::Writer;

use std::collections::BTreeMap;

use crate::config::PurbParams;
use crate::group::HidingPoint;

/// Candidate key positions of every suite, by suite name.
pub type SuitePositions = BTreeMap<String, Vec<usize>>;

/// One recipient of a PURB.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry<C> {
    /// Name of the suite the recipient's key belongs to.
    pub suite: String,
    pub public_key: C,
    /// Plaintext entry, exactly `data_len` bytes once written.
    pub data: Vec<u8>,
}

impl<C> Entry<C> {
    pub fn new(suite: impl Into<String>, public_key: C, data: Vec<u8>) -> Self {
        Self {
            suite: suite.into(),
            public_key,
            data,
        }
    }
}

/// Rejects parameters that cannot describe a header for hidden points of `C`.
fn check_params<C: HidingPoint>(params: &PurbParams) -> Result<(), PurbError> {
    if params.data_len == 0 {
        return Err(PurbError::InvalidParams("entry slots must be non-empty"));
    }
    if params.hash_attempts == 0 {
        return Err(PurbError::InvalidParams("at least one probe per table is needed"));
    }
    if C::hide_len() != params.key_len {
        return Err(PurbError::KeyLength {
            expected: params.key_len,
            actual: C::hide_len(),
        });
    }
    Ok(())
}

pub const PAYLOAD_KEY_LEN: usize = 16;
/// Encoded size of [`EntryData`].
pub const ENTRY_DATA_LEN: usize = 8 + PAYLOAD_KEY_LEN;

/// Conventional entry content: where the payload starts, and the key it is
/// encrypted under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryData {
    pub payload_offset: u64,
    pub payload_key: [u8; PAYLOAD_KEY_LEN],
}

impl EntryData {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ENTRY_DATA_LEN);
        out.extend_from_slice(&self.payload_offset.to_be_bytes());
        out.extend_from_slice(&self.payload_key);
        out
    }

    /// Parses the first [`ENTRY_DATA_LEN`] bytes of a decrypted entry.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let offset = bytes.get(..8)?.try_into().ok()?;
        let payload_key = bytes.get(8..ENTRY_DATA_LEN)?.try_into().ok()?;
        Some(Self {
            payload_offset: u64::from_be_bytes(offset),
            payload_key,
        })
    }
}
