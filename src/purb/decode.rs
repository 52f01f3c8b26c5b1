use super::error::PurbError;
use super::kdf::{self, EntryKeys};
use super::layout::probe_slots;
use super::{check_params, SuitePositions};
use crate::config::PurbParams;
use crate::group::{EncodingError, HidingPoint};

const LOG_TARGET: &str = "zk_mix::purb::decode";

/// Looks for an entry of `blob` addressed to `private_key` of `suite`.
///
/// Every probed slot is decrypted and handed to `check` together with the
/// whole blob. The first `Some` it returns is the result.
pub fn attempt_decode<C, F>(
    params: &PurbParams,
    suite: &str,
    suite_positions: &SuitePositions,
    private_key: C::ScalarField,
    blob: &[u8],
    mut check: F,
) -> Result<Vec<u8>, PurbError>
where
    C: HidingPoint,
    F: FnMut(&[u8], &[u8]) -> Option<Vec<u8>>,
{
    check_params::<C>(params)?;
    let positions = suite_positions
        .get(suite)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| PurbError::UnknownSuite(suite.to_owned()))?;

    let key_len = params.key_len;
    let mut hidden = vec![0u8; key_len];
    for &lo in positions {
        let window = blob
            .get(lo..lo + key_len)
            .ok_or(EncodingError::ShortBuffer {
                needed: lo + key_len,
                available: blob.len(),
            })?;
        for (h, b) in hidden.iter_mut().zip(window) {
            *h ^= b;
        }
    }

    let shared = C::hide_decode(&hidden)?.prime_component() * private_key;
    let keys = EntryKeys::for_recipient(&shared)?;
    let hash = kdf::slot_hash(&shared)?;

    let data_len = params.data_len;
    let mut plain = vec![0u8; data_len];
    let mut start = key_len;
    let mut size = 1;
    let mut probed = 0usize;
    while start + size * data_len <= blob.len() {
        for lo in probe_slots(hash, start, size, data_len, params.hash_attempts) {
            probed += 1;
            plain.copy_from_slice(&blob[lo..lo + data_len]);
            kdf::apply_keystream(&keys.receive, &mut plain);
            if let Some(message) = check(&plain, blob) {
                tracing::debug!(target: LOG_TARGET, suite, probed, "entry found");
                return Ok(message);
            }
        }
        start += size * data_len;
        size *= 2;
    }
    tracing::debug!(target: LOG_TARGET, suite, probed, "no entry for this key");
    Err(PurbError::NotForMe)
}
