//! Length padding that leaks only `O(log log L)` bits of a message length `L`.
//!
//! A padded message is an 8-byte big-endian pad length, the message, then the
//! pad. The pad is sized so that the final length, including a fixed
//! encryption overhead, has its low bits cleared: of the `b` bits needed to
//! write that length only the top `ceil(log2 b)` may be set.

use thiserror::Error;

/// Bytes used to store the pad length.
pub const PAD_LEN_BYTES: usize = 8;
const PAD_BYTE: u8 = 0x51;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaddingError {
    #[error("padded message of {0} bytes has no length prefix")]
    MissingPrefix(usize),

    #[error("pad of {pad} bytes does not fit a {len} byte message")]
    PadTooLong { pad: u64, len: usize },
}

/// `ceil(log2(x))`, with `0` for `x <= 1`.
fn ceil_log2(x: u64) -> u32 {
    if x <= 1 {
        0
    } else {
        u64::BITS - (x - 1).leading_zeros()
    }
}

/// Number of low bits of `len` that must be zero.
fn zero_bits(len: u64) -> u32 {
    let msg_bits = ceil_log2(len + 1);
    msg_bits - ceil_log2(u64::from(msg_bits))
}

/// Bytes of padding that bring `len + overhead` to an allowed length.
pub fn padding_len(len: usize, overhead: usize) -> u64 {
    let total = (len + overhead) as u64;
    let block = 1u64 << zero_bits(total);
    (block - total % block) % block
}

/// Whether `len` is a length [`pad`] can produce.
pub fn is_padded_len(len: usize) -> bool {
    let len = len as u64;
    len % (1u64 << zero_bits(len)) == 0
}

/// Pads `msg` for an encryption scheme adding `overhead` bytes.
pub fn pad(msg: &[u8], overhead: usize) -> Vec<u8> {
    let pad = padding_len(msg.len(), overhead + PAD_LEN_BYTES);
    let mut out = Vec::with_capacity(PAD_LEN_BYTES + msg.len() + pad as usize);
    out.extend_from_slice(&pad.to_be_bytes());
    out.extend_from_slice(msg);
    out.resize(out.len() + pad as usize, PAD_BYTE);
    out
}

/// Strips the padding added by [`pad`].
pub fn unpad(padded: &[u8]) -> Result<&[u8], PaddingError> {
    if padded.len() < PAD_LEN_BYTES {
        return Err(PaddingError::MissingPrefix(padded.len()));
    }
    let (head, rest) = padded.split_at(PAD_LEN_BYTES);
    let mut prefix = [0u8; PAD_LEN_BYTES];
    prefix.copy_from_slice(head);
    let pad = u64::from_be_bytes(prefix);
    match usize::try_from(pad) {
        Ok(pad) if pad <= rest.len() => Ok(&rest[..rest.len() - pad]),
        _ => Err(PaddingError::PadTooLong {
            pad,
            len: padded.len(),
        }),
    }
}
