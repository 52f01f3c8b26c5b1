//! Byte-range reservations within a header under construction.

use std::collections::BTreeMap;

/// What a reserved range holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tag {
    /// A hidden ephemeral key.
    Point,
    /// An encrypted recipient entry.
    Entry,
    /// Marker just past the end of the header.
    End,
}

/// One reserved half-open range `[lo, hi)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Extent {
    pub lo: usize,
    pub hi: usize,
    pub tag: Tag,
}

/// Ordered set of disjoint reserved ranges.
#[derive(Clone, Debug, Default)]
pub struct ReservationMap {
    // keyed by `lo`, value is `(hi, tag)`
    extents: BTreeMap<usize, (usize, Tag)>,
}

impl ReservationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.extents.clear();
    }

    /// Reserved extents overlapping `[lo, hi)`, in order.
    fn overlapping(&self, lo: usize, hi: usize) -> Vec<(usize, usize)> {
        let first = self
            .extents
            .range(..=lo)
            .next_back()
            .filter(|(_, (end, _))| *end > lo)
            .map(|(start, (end, _))| (*start, *end));
        first
            .into_iter()
            .chain(
                self.extents
                    .range(lo..hi)
                    .filter(|(start, _)| **start != lo || first.is_none())
                    .map(|(start, (end, _))| (*start, *end)),
            )
            .collect()
    }

    /// Reserves `[lo, hi)` and reports whether it was entirely free.
    ///
    /// An exclusive reservation changes nothing unless the range is free.
    /// A non-exclusive one always claims whatever parts of the range were
    /// still free.
    pub fn reserve(&mut self, lo: usize, hi: usize, exclusive: bool, tag: Tag) -> bool {
        if lo >= hi {
            return true;
        }
        let conflicts = self.overlapping(lo, hi);
        if conflicts.is_empty() {
            self.extents.insert(lo, (hi, tag));
            return true;
        }
        if exclusive {
            return false;
        }

        let mut cursor = lo;
        for (start, end) in conflicts {
            if start > cursor {
                self.extents.insert(cursor, (start, tag));
            }
            cursor = cursor.max(end);
        }
        if cursor < hi {
            self.extents.insert(cursor, (hi, tag));
        }
        false
    }

    /// Reserves the lowest free range of `len` bytes and returns its offset.
    pub fn alloc(&mut self, len: usize, tag: Tag) -> usize {
        let mut cursor = 0;
        for (start, (end, _)) in &self.extents {
            if *start >= cursor + len {
                break;
            }
            cursor = cursor.max(*end);
        }
        self.extents.insert(cursor, (cursor + len, tag));
        cursor
    }

    /// Calls `visit(lo, hi)` for every free range below `limit`.
    pub fn scan_free(&self, limit: usize, mut visit: impl FnMut(usize, usize)) {
        let mut cursor = 0;
        for (start, (end, _)) in &self.extents {
            if cursor >= limit {
                return;
            }
            if *start > cursor {
                visit(cursor, (*start).min(limit));
            }
            cursor = cursor.max(*end);
        }
        if cursor < limit {
            visit(cursor, limit);
        }
    }

    pub fn extents(&self) -> impl Iterator<Item = Extent> + '_ {
        self.extents
            .iter()
            .map(|(lo, (hi, tag))| Extent { lo: *lo, hi: *hi, tag: *tag })
    }

    /// End of the highest reservation.
    pub fn top(&self) -> usize {
        self.extents
            .iter()
            .next_back()
            .map_or(0, |(_, (end, _))| *end)
    }

    /// Total reserved bytes.
    pub fn used(&self) -> usize {
        self.extents.iter().map(|(lo, (hi, _))| hi - lo).sum()
    }
}

/// Offsets probed for `hash` in the entry table of `size` slots at `start`.
pub(crate) fn probe_slots(
    hash: u64,
    start: usize,
    size: usize,
    data_len: usize,
    attempts: usize,
) -> impl Iterator<Item = usize> {
    (0..attempts.min(size) as u64)
        .map(move |i| start + (hash.wrapping_add(i) % size as u64) as usize * data_len)
}
