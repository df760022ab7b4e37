//! Sparse back-pointer maps over the chunk chain, enabling logarithmic chunk lookup.

use alloc::vec::Vec;
use core::mem;

use crate::chunked_vec::Chunk;

/// A sparse map of stride exponents to earlier chunk positions, carried by even-sequence
/// chunks. A chunk with sequence number `s` holds an entry for every exponent `k >= 1` with
/// `2^k` dividing `s`, referencing the chunk whose sequence number is `s - 2^k`.
///
/// Entries are kept in descending exponent order so that lookups visit the farthest strides
/// first and can fall through to finer ones.
///
/// Sequence numbers advance one per promotion only while the chain grows by appending;
/// chunks created by insert splices share their split partner's number. [`SkipMap::build`]
/// therefore never trusts the chain's numbering: every hop is verified against the
/// expected number, and construction bails to a partial or absent map on any mismatch.
pub(crate) struct SkipMap {
    /// `(exponent, chain position)` pairs, descending by exponent.
    entries: Vec<(u32, usize)>,
}

impl SkipMap {
    /// Builds the map for a chunk with sequence number `seq` that is about to become the
    /// chunk directly after `earlier` (so the chunk two places back is at
    /// `earlier.len() - 2`). Returns `None` for odd sequence numbers and whenever the
    /// backing chain cannot supply a verified target; the map is an accelerator, and an
    /// absent entry only means the lookup walk falls back to single steps.
    pub(crate) fn build<T>(seq: u64, earlier: &[Chunk<T>]) -> Option<SkipMap> {
        if seq % 2 != 0 || seq == 0 {
            return None;
        }
        // The stride-2 entry references the chunk two places back; every wider stride `2^k`
        // is reached by chaining through the `2^(k-1)` entry of the previous target. Each
        // hop is verified against the expected sequence number, since chains that have been
        // spliced by inserts or removals may no longer line up.
        let first = earlier.len().checked_sub(2)?;
        if earlier[first].seq != seq - 2 {
            return None;
        }
        let mut entries = Vec::new();
        entries.push((1u32, first));
        let mut k = 2u32;
        while k < u64::BITS && (1u64 << k) <= seq && seq % (1 << k) == 0 {
            let (_, prev_target) = entries[entries.len() - 1];
            let Some(next) = Self::resolve(k - 1, prev_target, earlier) else {
                break;
            };
            if earlier[next].seq != seq - (1 << k) {
                break;
            }
            entries.push((k, next));
            k += 1;
        }
        entries.reverse();
        Some(SkipMap { entries })
    }

    /// Finds the target of the exponent-`k` entry on the chunk at `pos`, walking backward
    /// two chunks at a time over even-sequence chunks until one carries the key.
    fn resolve<T>(k: u32, pos: usize, chunks: &[Chunk<T>]) -> Option<usize> {
        let mut pos = pos;
        loop {
            if let Some(target) = chunks[pos].skip.as_ref().and_then(|m| m.get(k)) {
                return Some(target);
            }
            pos = pos.checked_sub(2)?;
        }
    }

    /// Looks up the entry for the given exponent.
    pub(crate) fn get(&self, k: u32) -> Option<usize> {
        self.entries
            .iter()
            .find(|&&(e, _)| e == k)
            .map(|&(_, target)| target)
    }

    /// Iterates `(exponent, position)` entries in descending exponent order.
    #[inline]
    pub(crate) fn iter(&self) -> impl Iterator<Item = (u32, usize)> + '_ {
        self.entries.iter().copied()
    }

    /// Adjusts entry positions after a chunk was spliced into the chain at `at`.
    pub(crate) fn shift_for_insert(&mut self, at: usize) {
        for (_, target) in &mut self.entries {
            if *target >= at {
                *target += 1;
            }
        }
    }

    /// Drops entries referencing the removed span of chain positions and slides the
    /// positions above it down.
    pub(crate) fn remap_for_removal(&mut self, removed: core::ops::Range<usize>) {
        self.entries.retain(|(_, target)| !removed.contains(target));
        for (_, target) in &mut self.entries {
            if *target >= removed.end {
                *target -= removed.len();
            }
        }
    }

    /// Heap bytes attributable to this map.
    pub(crate) fn mem_size(&self) -> usize {
        self.entries.capacity() * mem::size_of::<(u32, usize)>()
    }

    #[cfg(test)]
    pub(crate) fn check<T>(&self, carrier_pos: usize, carrier_seq: u64, chunks: &[Chunk<T>]) {
        let mut last_exponent = u32::MAX;
        for (k, target) in self.iter() {
            assert!(k >= 1);
            assert!(k < last_exponent, "entries must descend by exponent");
            last_exponent = k;
            assert!(target < carrier_pos, "entries must reference earlier chunks");
            assert_eq!(carrier_seq % (1 << k), 0);
            assert_eq!(chunks[target].seq, carrier_seq - (1 << k));
            assert!(chunks[target].offset <= chunks[carrier_pos].offset);
        }
    }
}
