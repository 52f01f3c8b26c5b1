//! Keys and slot hashes derived from a Diffie-Hellman shared point.

use ark_ec::CurveGroup;
use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::error::PurbError;
use crate::group;

const SLOT_DOMAIN: &[u8] = b"zk_mix/purb/slot/v1";
const KDF_SALT: &[u8] = b"zk_mix/purb/kdf/v1";
const STREAM_DOMAIN: &[u8] = b"zk_mix/purb/entry/v1";

const INITIATOR_INFO: &[u8] = b"initiator";
const RESPONDER_INFO: &[u8] = b"responder";

pub const ENTRY_KEY_LEN: usize = 32;

/// Symmetric keys shared by a PURB author and one recipient.
///
/// The author's `send` key is the recipient's `receive` key and vice versa.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct EntryKeys {
    pub send: [u8; ENTRY_KEY_LEN],
    pub receive: [u8; ENTRY_KEY_LEN],
}

impl EntryKeys {
    pub fn for_author<C: CurveGroup>(shared: &C) -> Result<Self, PurbError> {
        let (initiator, responder) = derive(shared)?;
        Ok(Self {
            send: initiator,
            receive: responder,
        })
    }

    pub fn for_recipient<C: CurveGroup>(shared: &C) -> Result<Self, PurbError> {
        let (initiator, responder) = derive(shared)?;
        Ok(Self {
            send: responder,
            receive: initiator,
        })
    }
}

fn derive<C: CurveGroup>(
    shared: &C,
) -> Result<([u8; ENTRY_KEY_LEN], [u8; ENTRY_KEY_LEN]), PurbError> {
    let mut ikm = group::point_bytes(shared)?;
    let hk = Hkdf::<Sha256>::new(Some(KDF_SALT), &ikm);
    ikm.zeroize();

    let mut initiator = [0u8; ENTRY_KEY_LEN];
    let mut responder = [0u8; ENTRY_KEY_LEN];
    hk.expand(INITIATOR_INFO, &mut initiator)
        .and_then(|_| hk.expand(RESPONDER_INFO, &mut responder))
        .map_err(|err| PurbError::Kdf(err.to_string()))?;
    Ok((initiator, responder))
}

/// Table hash of a shared point, the same for author and recipient.
pub fn slot_hash<C: CurveGroup>(shared: &C) -> Result<u64, PurbError> {
    let mut bytes = group::point_bytes(shared)?;
    let digest = Sha256::new_with_prefix(SLOT_DOMAIN)
        .chain_update(&bytes)
        .finalize();
    bytes.zeroize();

    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    Ok(u64::from_be_bytes(head))
}

/// XORs `data` with the keystream of `key`. Applying it twice restores `data`.
pub fn apply_keystream(key: &[u8; ENTRY_KEY_LEN], data: &mut [u8]) {
    let mut xof = Shake256::default();
    xof.update(STREAM_DOMAIN);
    xof.update(key);
    let mut reader = xof.finalize_xof();

    let mut stream = vec![0u8; data.len()];
    reader.read(&mut stream);
    for (byte, mask) in data.iter_mut().zip(&stream) {
        *byte ^= mask;
    }
    stream.zeroize();
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::PrimeGroup;
    use ark_ed25519::{EdwardsProjective, Fr};

    #[test]
    fn test_author_and_recipient_keys_mirror() {
        let shared = EdwardsProjective::generator() * Fr::from(99u64);
        let author = EntryKeys::for_author(&shared).unwrap();
        let recipient = EntryKeys::for_recipient(&shared).unwrap();
        assert!(author.send == recipient.receive);
        assert!(author.receive == recipient.send);
        assert!(author.send != author.receive);
    }

    #[test]
    fn test_slot_hash_depends_on_the_point() {
        let g = EdwardsProjective::generator();
        let a = slot_hash(&(g * Fr::from(1u64))).unwrap();
        let b = slot_hash(&(g * Fr::from(2u64))).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, slot_hash(&g).unwrap());
    }

    #[test]
    fn test_keystream_is_an_involution() {
        let key = [7u8; ENTRY_KEY_LEN];
        let plain = b"offset and key material!".to_vec();
        let mut data = plain.clone();
        apply_keystream(&key, &mut data);
        assert_ne!(data, plain);
        apply_keystream(&key, &mut data);
        assert_eq!(data, plain);
    }
}
