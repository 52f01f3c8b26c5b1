use ark_ff::UniformRand;
use ark_std::rand::RngCore;
use zeroize::Zeroize;

use super::error::PurbError;
use super::kdf::{self, EntryKeys};
use super::layout::{probe_slots, Extent, ReservationMap, Tag};
use super::{check_params, Entry, SuitePositions};
use crate::config::PurbParams;
use crate::group::HidingPoint;

const LOG_TARGET: &str = "zk_mix::purb::writer";

struct SuiteInfo<C: HidingPoint> {
    name: String,
    positions: Vec<usize>,
    /// End of the highest candidate position.
    max: usize,
    /// Index of the primary position, chosen by layout.
    level: usize,
    private_key: C::ScalarField,
    hidden: Vec<u8>,
}

impl<C: HidingPoint> Drop for SuiteInfo<C> {
    fn drop(&mut self) {
        self.private_key.zeroize();
        self.hidden.zeroize();
    }
}

impl<C: HidingPoint> SuiteInfo<C> {
    fn region(&self, level: usize, key_len: usize) -> (usize, usize) {
        let lo = self.positions[level];
        (lo, lo + key_len)
    }
}

/// Lays out and produces PURB headers for a fixed set of recipients.
///
/// [`Writer::layout`] places every suite key and entry once. Entry data may
/// be filled in afterwards, typically with the final header length, and each
/// [`Writer::write`] then produces a fresh header for that layout.
pub struct Writer<C: HidingPoint> {
    params: PurbParams,
    suites: Vec<SuiteInfo<C>>,
    layout: ReservationMap,
    entries: Vec<Entry<C>>,
    shared: Vec<C>,
    offsets: Vec<usize>,
    header_len: usize,
}

fn check_positions(suite: &str, positions: &[usize], key_len: usize) -> Result<(), PurbError> {
    if positions.windows(2).any(|w| w[1] < w[0] + key_len) {
        return Err(PurbError::InvalidPositions {
            suite: suite.to_owned(),
            reason: format!("positions must ascend at least {key_len} bytes apart"),
        });
    }
    Ok(())
}

/// Picks an ephemeral key whose public point has a hidden encoding.
fn ephemeral_key<C: HidingPoint, R: RngCore + ?Sized>(rng: &mut R) -> (C::ScalarField, Vec<u8>) {
    loop {
        let private_key = C::ScalarField::rand(rng);
        if let Some(hidden) = (C::generator() * private_key).hide_encode(rng) {
            return (private_key, hidden);
        }
    }
}

impl<C: HidingPoint> Writer<C> {
    pub fn new(params: PurbParams) -> Self {
        Self {
            params,
            suites: Vec::new(),
            layout: ReservationMap::new(),
            entries: Vec::new(),
            shared: Vec::new(),
            offsets: Vec::new(),
            header_len: 0,
        }
    }

    /// Places suite keys and entries, returning the header length.
    ///
    /// Suites with the most restrictive positions go first. Each takes the
    /// lowest of its candidate positions that overlaps no candidate position
    /// of an earlier suite.
    #[tracing::instrument(target = LOG_TARGET, skip_all, fields(entries = entries.len()))]
    pub fn layout<R: RngCore + ?Sized>(
        &mut self,
        entries: Vec<Entry<C>>,
        suite_positions: &SuitePositions,
        rng: &mut R,
    ) -> Result<usize, PurbError> {
        check_params::<C>(&self.params)?;
        self.layout.reset();
        self.suites.clear();
        self.shared.clear();
        self.offsets.clear();
        self.entries.clear();
        self.header_len = 0;
        let key_len = self.params.key_len;

        let mut suites: Vec<SuiteInfo<C>> = Vec::new();
        for entry in &entries {
            if suites.iter().any(|s| s.name == entry.suite) {
                continue;
            }
            let positions = suite_positions
                .get(&entry.suite)
                .filter(|p| !p.is_empty())
                .ok_or_else(|| PurbError::UnknownSuite(entry.suite.clone()))?;
            check_positions(&entry.suite, positions, key_len)?;
            let (private_key, hidden) = ephemeral_key::<C, R>(rng);
            suites.push(SuiteInfo {
                name: entry.suite.clone(),
                positions: positions.clone(),
                max: positions[positions.len() - 1] + key_len,
                level: 0,
                private_key,
                hidden,
            });
        }
        suites.sort_by_key(|s| s.max);

        // `exclude` holds every candidate position of the suites placed so
        // far, `self.layout` only their primaries.
        let mut exclude = ReservationMap::new();
        let mut header_len = 0;
        for suite in &mut suites {
            let mut level = None;
            for j in (0..suite.positions.len()).rev() {
                let (lo, hi) = suite.region(j, key_len);
                if exclude.reserve(lo, hi, false, Tag::Point) {
                    level = Some(j);
                }
            }
            let level = level.ok_or_else(|| PurbError::NoViablePosition(suite.name.clone()))?;
            let (lo, hi) = suite.region(level, key_len);
            if !self.layout.reserve(lo, hi, true, Tag::Point) {
                return Err(PurbError::NoViablePosition(suite.name.clone()));
            }
            suite.level = level;
            header_len = header_len.max(hi);
            tracing::debug!(target: LOG_TARGET, suite = %suite.name, level, lo, "suite key placed");
        }

        for entry in &entries {
            let Some(suite) = suites.iter().find(|s| s.name == entry.suite) else {
                return Err(PurbError::UnknownSuite(entry.suite.clone()));
            };
            let shared = entry.public_key * suite.private_key;
            let (offset, table_end) = self.place_entry(kdf::slot_hash(&shared)?);
            header_len = header_len.max(table_end);
            self.shared.push(shared);
            self.offsets.push(offset);
        }

        let all_positions_end = suites.iter().map(|s| s.max).max().unwrap_or(0);
        header_len = header_len.max(all_positions_end);
        self.layout.reserve(header_len, header_len + 1, false, Tag::End);

        self.suites = suites;
        self.entries = entries;
        self.header_len = header_len;
        tracing::debug!(target: LOG_TARGET, header_len, "header laid out");
        Ok(header_len)
    }

    /// Reserves the first free probed slot, returning its offset and the end
    /// of its table.
    fn place_entry(&mut self, hash: u64) -> (usize, usize) {
        let data_len = self.params.data_len;
        let mut start = self.params.key_len;
        let mut size = 1;
        loop {
            for lo in probe_slots(hash, start, size, data_len, self.params.hash_attempts) {
                if self.layout.reserve(lo, lo + data_len, true, Tag::Entry) {
                    return (lo, start + size * data_len);
                }
            }
            start += size * data_len;
            size *= 2;
        }
    }

    pub fn header_len(&self) -> usize {
        self.header_len
    }

    pub fn entries(&self) -> &[Entry<C>] {
        &self.entries
    }

    /// Header offset of each entry, in input order.
    pub fn entry_offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Index of the position the suite's key was placed at.
    pub fn suite_level(&self, suite: &str) -> Option<usize> {
        self.suites.iter().find(|s| s.name == suite).map(|s| s.level)
    }

    /// Ephemeral public key of a suite.
    pub fn suite_public_key(&self, suite: &str) -> Option<C> {
        self.suites
            .iter()
            .find(|s| s.name == suite)
            .map(|s| C::generator() * s.private_key)
    }

    pub fn reservations(&self) -> impl Iterator<Item = Extent> + '_ {
        self.layout.extents()
    }

    pub fn set_entry_data(&mut self, index: usize, data: Vec<u8>) -> Result<(), PurbError> {
        let data_len = self.params.data_len;
        let entry = self.entries.get_mut(index).ok_or_else(|| PurbError::InvalidEntry {
            index,
            reason: "no such entry".into(),
        })?;
        if data.len() != data_len {
            return Err(PurbError::InvalidEntry {
                index,
                reason: format!("{} bytes of data, slots hold {data_len}", data.len()),
            });
        }
        entry.data = data;
        Ok(())
    }

    /// Produces a header of exactly [`Writer::header_len`] bytes.
    pub fn write<R: RngCore + ?Sized>(&self, rng: &mut R) -> Result<Vec<u8>, PurbError> {
        let key_len = self.params.key_len;
        let data_len = self.params.data_len;
        let mut buf = vec![0u8; self.header_len];

        for (index, entry) in self.entries.iter().enumerate() {
            if entry.data.len() != data_len {
                return Err(PurbError::InvalidEntry {
                    index,
                    reason: format!("{} bytes of data, slots hold {data_len}", entry.data.len()),
                });
            }
            let keys = EntryKeys::for_author(&self.shared[index])?;
            let lo = self.offsets[index];
            let slot = &mut buf[lo..lo + data_len];
            slot.copy_from_slice(&entry.data);
            kdf::apply_keystream(&keys.send, slot);
        }

        self.layout
            .scan_free(self.header_len, |lo, hi| rng.fill_bytes(&mut buf[lo..hi]));

        // Later suites never place their key over an earlier suite's
        // candidates, so each XOR below sees final bytes.
        for suite in &self.suites {
            let mut key = suite.hidden.clone();
            for j in (0..suite.positions.len()).filter(|j| *j != suite.level) {
                let (lo, hi) = suite.region(j, key_len);
                for (k, b) in key.iter_mut().zip(&buf[lo..hi]) {
                    *k ^= b;
                }
            }
            let (lo, hi) = suite.region(suite.level, key_len);
            buf[lo..hi].copy_from_slice(&key);
        }
        Ok(buf)
    }
}
