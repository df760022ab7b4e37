//! The chunked sequence itself: a chain of array chunks with an append-optimized head.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::cmp::{max, min};
use core::fmt;
use core::mem;
use core::ops::{Index, IndexMut, Range};

use crate::iter::Iter;
use crate::skip::SkipMap;

/// Initial capacity of the head chunk when none is requested.
pub const DEFAULT_CAPACITY: usize = 16;
/// Largest backing array allocated when the chain grows by one chunk. Bulk appends may
/// exceed this so that a single append never allocates more than one chunk.
pub const MAX_CHUNK_SIZE: usize = 2000;
/// Chunks with a sequence number at or below this are located by plain backward steps;
/// above it, lookups descend through the skip maps when present.
pub const SKIP_MAP_THRESHOLD: u64 = 400;
/// Maximum total capacity when none is given at construction.
pub const DEFAULT_MAX_CAPACITY: usize = i32::MAX as usize;

/// One contiguous piece of the sequence: a backing array, the live prefix length, the
/// logical index of its first element, and a sequence number that counts head promotions.
/// Only the head (the last chunk in the chain) may have slack; every frozen chunk is full.
///
/// Sequence numbers never decrease along the chain, but they are not unique: a chunk
/// created by an insert splice shares the number of the chunk it split (existing chunks
/// never renumber). Everything that consumes sequence numbers tolerates this — skip-map
/// construction verifies the number behind every hop, and lookups validate candidates by
/// offset alone.
pub(crate) struct Chunk<T> {
    pub(crate) buf: Box<[T]>,
    pub(crate) len: usize,
    pub(crate) offset: usize,
    pub(crate) seq: u64,
    pub(crate) skip: Option<SkipMap>,
}

impl<T: Copy + Default> Chunk<T> {
    fn new(capacity: usize, offset: usize, seq: u64) -> Self {
        Chunk {
            buf: vec![T::default(); capacity].into_boxed_slice(),
            len: 0,
            offset,
            seq,
            skip: None,
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    fn slack(&self) -> usize {
        self.buf.len() - self.len
    }

    /// The live prefix of the backing array.
    #[inline]
    pub(crate) fn live(&self) -> &[T] {
        &self.buf[..self.len]
    }

    /// Logical index one past this chunk's last live element.
    #[inline]
    fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Swaps the backing array for one of `new_capacity` elements, preserving the live
    /// prefix.
    fn realloc(&mut self, new_capacity: usize) {
        debug_assert!(new_capacity >= self.len);
        let mut buf = vec![T::default(); new_capacity].into_boxed_slice();
        buf[..self.len].copy_from_slice(&self.buf[..self.len]);
        self.buf = buf;
    }
}

#[cold]
fn capacity_overflow(max_capacity: usize) -> ! {
    panic!("capacity overflow: the maximum capacity is {max_capacity}")
}

/// A mutable sequence of fixed-size values stored as a chain of array chunks, so that
/// very large sequences never require one contiguous allocation.
///
/// The chain is kept in logical order with the head last; appends write into the head
/// with no traversal, and when the head fills it is frozen in place and a fresh head is
/// allocated after it. Lookups walk the chain backward from the head, optionally
/// accelerated by sparse per-chunk skip maps (see [`ChunkedVec::with_skip_map`]).
///
/// Values must be `Copy + Default`; the container is for fixed-size elements and never
/// boxes them.
pub struct ChunkedVec<T> {
    /// Chunks in logical order. Never empty; the last entry is the head.
    pub(crate) chunks: Vec<Chunk<T>>,
    max_capacity: usize,
    use_skip_map: bool,
}

impl<T: Copy + Default> ChunkedVec<T> {
    /// Creates an empty sequence with the default head capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an empty sequence whose head starts with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_limit(capacity, DEFAULT_MAX_CAPACITY)
    }

    /// Creates an empty sequence with an explicit initial capacity and an upper bound on
    /// the total capacity the sequence may ever grow to.
    ///
    /// # Panics
    ///
    /// Panics if `capacity > max_capacity`.
    pub fn with_capacity_and_limit(capacity: usize, max_capacity: usize) -> Self {
        assert!(
            capacity <= max_capacity,
            "capacity (is {capacity}) should be <= the maximum capacity (is {max_capacity})"
        );
        ChunkedVec {
            chunks: vec![Chunk::new(capacity, 0, 0)],
            max_capacity,
            use_skip_map: false,
        }
    }

    /// Creates a sequence holding a copy of `values`.
    pub fn from_slice(values: &[T]) -> Self {
        let mut this = Self::with_capacity(max(values.len(), DEFAULT_CAPACITY));
        this.extend_from_slice(values);
        this
    }

    /// Enables the skip-map overlay: every promoted chunk with an even sequence number
    /// records sparse back-pointers that accelerate index lookups once the chain is long.
    /// Intended to be chained onto a constructor before the sequence grows.
    pub fn with_skip_map(mut self) -> Self {
        self.use_skip_map = true;
        self
    }

    #[inline]
    fn head(&self) -> &Chunk<T> {
        let last = self.chunks.len() - 1;
        &self.chunks[last]
    }

    #[inline]
    fn head_mut(&mut self) -> &mut Chunk<T> {
        let last = self.chunks.len() - 1;
        &mut self.chunks[last]
    }

    /// Number of elements in the sequence.
    #[inline]
    pub fn len(&self) -> usize {
        let head = self.head();
        head.offset + head.len
    }

    /// Returns `true` if the sequence is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total capacity across the chain: the head's capacity plus everything before it.
    #[inline]
    pub fn capacity(&self) -> usize {
        let head = self.head();
        head.offset + head.capacity()
    }

    /// The bound this sequence may never grow past.
    #[inline]
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Number of chunks in the chain.
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// The whole content as a single slice, if it happens to be contiguous.
    pub fn contiguous(&self) -> Option<&[T]> {
        match self.chunks.len() {
            1 => Some(self.head().live()),
            _ => None,
        }
    }

    fn check_growth(&self, additional: usize) {
        if additional > self.max_capacity - self.len() {
            capacity_overflow(self.max_capacity);
        }
    }

    /// Freezes the full head in place and pushes a fresh head of (at most) the requested
    /// capacity, clamped to the remaining allowance under `max_capacity`.
    fn promote(&mut self, new_capacity: usize) {
        let head = self.head();
        debug_assert_eq!(head.len, head.capacity(), "only a full head can be frozen");
        let offset = head.offset + head.len;
        let seq = head.seq + 1;
        let new_capacity = min(new_capacity, self.max_capacity - offset);
        if new_capacity == 0 {
            capacity_overflow(self.max_capacity);
        }
        let skip = if self.use_skip_map {
            SkipMap::build(seq, &self.chunks)
        } else {
            None
        };
        let mut fresh = Chunk::new(new_capacity, offset, seq);
        fresh.skip = skip;
        self.chunks.push(fresh);
    }

    /// Grows the chain by one chunk sized for at least `min_needed` more elements,
    /// scaling with the current length up to [`MAX_CHUNK_SIZE`].
    fn grow(&mut self, min_needed: usize) {
        debug_assert!(min_needed > 0);
        let size = min(max(min_needed, self.len()), MAX_CHUNK_SIZE);
        self.promote(size);
    }

    /// Appends one value.
    ///
    /// # Panics
    ///
    /// Panics if the sequence is at its maximum capacity.
    #[inline]
    pub fn push(&mut self, value: T) {
        if self.head().slack() == 0 {
            self.grow(1);
        }
        let head = self.head_mut();
        head.buf[head.len] = value;
        head.len += 1;
    }

    /// Appends `count` copies of `value`.
    ///
    /// # Panics
    ///
    /// Panics if `count` elements do not fit under the maximum capacity.
    pub fn push_repeat(&mut self, value: T, count: usize) {
        self.check_growth(count);
        let mut remaining = count;
        while remaining > 0 {
            if self.head().slack() == 0 {
                self.grow(remaining);
            }
            let head = self.head_mut();
            let fill = min(remaining, head.slack());
            head.buf[head.len..head.len + fill].fill(value);
            head.len += fill;
            remaining -= fill;
        }
    }

    /// Appends every value in `values`.
    ///
    /// Fills the head first; whatever remains lands in a single newly allocated chunk, so
    /// one bulk append never allocates more than once.
    ///
    /// # Panics
    ///
    /// Panics if the values do not fit under the maximum capacity.
    #[inline]
    pub fn extend_from_slice(&mut self, values: &[T]) {
        // Tiny appends that fit in the head skip the bulk path entirely.
        if values.len() <= 2 && self.head().slack() >= values.len() {
            let head = self.head_mut();
            for (i, &v) in values.iter().enumerate() {
                head.buf[head.len + i] = v;
            }
            head.len += values.len();
            return;
        }
        self.append_slice(values);
    }

    fn append_slice(&mut self, values: &[T]) {
        self.check_growth(values.len());
        let fill = min(values.len(), self.head().slack());
        if fill > 0 {
            let head = self.head_mut();
            head.buf[head.len..head.len + fill].copy_from_slice(&values[..fill]);
            head.len += fill;
        }
        let rest = &values[fill..];
        if rest.is_empty() {
            return;
        }
        let size = max(rest.len(), min(self.len(), MAX_CHUNK_SIZE));
        self.promote(size);
        let head = self.head_mut();
        head.buf[..rest.len()].copy_from_slice(rest);
        head.len = rest.len();
    }

    /// Sets the total capacity by reallocating only the head's backing array.
    ///
    /// # Panics
    ///
    /// Panics if `total` is less than the current length or greater than the maximum
    /// capacity.
    pub fn set_capacity(&mut self, total: usize) {
        let len = self.len();
        assert!(
            total >= len,
            "the new capacity (is {total}) should be >= the length (is {len})"
        );
        assert!(
            total <= self.max_capacity,
            "the new capacity (is {total}) should be <= the maximum capacity (is {})",
            self.max_capacity
        );
        if total == self.capacity() {
            return;
        }
        let head = self.head_mut();
        let new_capacity = total - head.offset;
        head.realloc(new_capacity);
    }

    /// Ensures capacity for at least `additional` more elements. Never shrinks.
    pub fn reserve(&mut self, additional: usize) {
        let needed = match self.len().checked_add(additional) {
            Some(needed) if needed <= self.max_capacity => needed,
            _ => capacity_overflow(self.max_capacity),
        };
        if needed > self.capacity() {
            self.set_capacity(needed);
        }
    }

    /// Resizes the sequence, appending copies of `value` or truncating as needed.
    pub fn resize(&mut self, new_len: usize, value: T) {
        let len = self.len();
        if new_len > len {
            self.push_repeat(value, new_len - len);
        } else {
            self.truncate(new_len);
        }
    }

    /// Shortens the sequence to `new_len` elements; a no-op if it is already short
    /// enough. The total capacity is preserved: when the cut lands in a frozen chunk,
    /// that chunk's backing array is enlarged to cover the prior capacity and it becomes
    /// the head.
    pub fn truncate(&mut self, new_len: usize) {
        let len = self.len();
        if new_len >= len {
            return;
        }
        let total_capacity = self.capacity();
        let pos = if new_len == 0 {
            0
        } else {
            self.chunk_position(new_len - 1)
        };
        if pos + 1 == self.chunks.len() {
            let head = self.head_mut();
            head.len = new_len - head.offset;
            return;
        }
        self.chunks.truncate(pos + 1);
        // Discarded chunks were all after the new head, so the surviving skip maps only
        // reference surviving chunks.
        let head = self.head_mut();
        head.len = new_len - head.offset;
        head.realloc(total_capacity - head.offset);
    }

    /// Empties the sequence, dropping all chunks in favor of a fresh default head.
    pub fn clear(&mut self) {
        self.chunks.clear();
        let capacity = min(DEFAULT_CAPACITY, self.max_capacity);
        self.chunks.push(Chunk::new(capacity, 0, 0));
    }

    /// Position of the chunk containing logical `index`, which must be in bounds.
    ///
    /// Walks backward from the head. Once past [`SKIP_MAP_THRESHOLD`], chunks carrying a
    /// skip map are crossed by the widest stride whose target is still after `index`,
    /// falling back to single steps whenever no stride qualifies. Every candidate is
    /// validated against its chunk's offset — never its sequence number — so the
    /// duplicated numbers that splices leave behind cannot misdirect the walk.
    pub(crate) fn chunk_position(&self, index: usize) -> usize {
        let chunks = &self.chunks;
        let mut pos = chunks.len() - 1;
        while chunks[pos].offset > index {
            let cur = &chunks[pos];
            let mut next = pos - 1;
            if cur.seq > SKIP_MAP_THRESHOLD {
                if let Some(map) = &cur.skip {
                    if let Some(target) = map
                        .iter()
                        .map(|(_, target)| target)
                        .find(|&t| chunks[t].offset > index)
                    {
                        debug_assert!(target < pos);
                        next = target;
                    }
                }
            }
            pos = next;
        }
        pos
    }

    /// Returns the element at `index`, or `None` when out of bounds.
    #[inline]
    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.len() {
            return None;
        }
        let chunk = &self.chunks[self.chunk_position(index)];
        Some(chunk.buf[index - chunk.offset])
    }

    /// Overwrites the element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn set(&mut self, index: usize, value: T) {
        self[index] = value;
    }

    /// The contiguous run of elements beginning at `index` and ending wherever its chunk
    /// does.
    pub(crate) fn run_from(&self, index: usize) -> &[T] {
        debug_assert!(index < self.len());
        let chunk = &self.chunks[self.chunk_position(index)];
        &chunk.buf[index - chunk.offset..chunk.len]
    }

    fn check_range(&self, range: Range<usize>) -> Range<usize> {
        let len = self.len();
        assert!(
            range.start <= range.end,
            "range index starts at {} but ends at {}",
            range.start,
            range.end
        );
        assert!(
            range.end <= len,
            "range end index {} out of range for sequence of length {len}",
            range.end
        );
        range
    }

    /// Copies `dest.len()` elements starting at logical `start` into `dest`, walking the
    /// chain backward from the chunk containing the end of the range.
    ///
    /// # Panics
    ///
    /// Panics if the source range falls outside the sequence.
    pub fn copy_to(&self, start: usize, dest: &mut [T]) {
        let len = self.len();
        let end = start.checked_add(dest.len()).unwrap_or(usize::MAX);
        assert!(
            start <= len && end <= len,
            "range end index {end} out of range for sequence of length {len}"
        );
        if dest.is_empty() {
            return;
        }
        let mut pos = self.chunk_position(end - 1);
        loop {
            let chunk = &self.chunks[pos];
            let lo = max(chunk.offset, start);
            let hi = min(chunk.end(), end);
            dest[lo - start..hi - start]
                .copy_from_slice(&chunk.buf[lo - chunk.offset..hi - chunk.offset]);
            if chunk.offset <= start {
                return;
            }
            pos -= 1;
        }
    }

    /// Overwrites `src.len()` elements starting at logical `start` with `src`.
    ///
    /// # Panics
    ///
    /// Panics if the destination range falls outside the sequence.
    pub fn copy_from(&mut self, start: usize, src: &[T]) {
        let len = self.len();
        let end = start.checked_add(src.len()).unwrap_or(usize::MAX);
        assert!(
            start <= len && end <= len,
            "range end index {end} out of range for sequence of length {len}"
        );
        if src.is_empty() {
            return;
        }
        let mut pos = self.chunk_position(end - 1);
        loop {
            let chunk = &mut self.chunks[pos];
            let lo = max(chunk.offset, start);
            let hi = min(chunk.offset + chunk.len, end);
            chunk.buf[lo - chunk.offset..hi - chunk.offset]
                .copy_from_slice(&src[lo - start..hi - start]);
            if chunk.offset <= start {
                return;
            }
            pos -= 1;
        }
    }

    /// Copies the whole sequence into one contiguous vector.
    pub fn to_vec(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len());
        for chunk in &self.chunks {
            debug_assert_eq!(
                chunk.offset,
                out.len(),
                "offsets must be the prefix sums of live lengths"
            );
            out.extend_from_slice(chunk.live());
        }
        out
    }

    /// Copies a sub-range into a contiguous vector.
    ///
    /// # Panics
    ///
    /// Panics if the range falls outside the sequence.
    pub fn to_vec_range(&self, range: Range<usize>) -> Vec<T> {
        let range = self.check_range(range);
        let mut out = vec![T::default(); range.len()];
        self.copy_to(range.start, &mut out);
        out
    }

    /// Inserts one value at `index`, shifting everything after it.
    ///
    /// # Panics
    ///
    /// Panics if `index > len` or the sequence is at its maximum capacity.
    pub fn insert(&mut self, index: usize, value: T) {
        self.insert_from_slice(index, &[value]);
    }

    /// Inserts a copy of `values` at `index`, shifting everything after it.
    pub fn insert_from_slice(&mut self, index: usize, values: &[T]) {
        self.insert_repeat(index, values, 1);
    }

    /// Inserts `count` consecutive copies of `values` at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len` or the inserted elements do not fit under the maximum
    /// capacity.
    pub fn insert_repeat(&mut self, index: usize, values: &[T], count: usize) {
        let len = self.len();
        assert!(
            index <= len,
            "insertion index (is {index}) should be <= len (is {len})"
        );
        let total = match values.len().checked_mul(count) {
            Some(total) if total <= self.max_capacity - len => total,
            _ => capacity_overflow(self.max_capacity),
        };
        if total == 0 {
            return;
        }
        let (pos, at) = self.make_room(index, total);
        let chunk = &mut self.chunks[pos];
        for rep in 0..count {
            chunk.buf[at + rep * values.len()..][..values.len()].copy_from_slice(values);
        }
    }

    /// Opens a contiguous gap of `count` elements at logical `index`, counted into the
    /// owning chunk's live length, and returns that chunk's position along with the
    /// in-chunk index of the gap.
    ///
    /// Chunks after the target have their offsets shifted up first. A head target with
    /// little enough data and sufficient slack opens the gap by an in-chunk shift;
    /// otherwise the target is split around the gap: a new full chunk takes the prefix
    /// plus the gap, and the target keeps the suffix. The gap itself holds default values
    /// until the caller fills it.
    fn make_room(&mut self, index: usize, count: usize) -> (usize, usize) {
        debug_assert!(count > 0 && count <= self.max_capacity - self.len());
        let len = self.len();
        if index == len {
            // The gap extends the sequence; this behaves like an append.
            if self.head().slack() < count {
                if self.head().slack() == 0 {
                    self.promote(max(count, min(len, MAX_CHUNK_SIZE)));
                } else {
                    let head = self.head_mut();
                    let new_capacity = head.len + count;
                    head.realloc(new_capacity);
                }
            }
            let head = self.head_mut();
            let at = head.len;
            head.len += count;
            return (self.chunks.len() - 1, at);
        }

        let pos = self.chunk_position(index);
        for chunk in &mut self.chunks[pos + 1..] {
            chunk.offset += count;
        }
        let is_head = pos + 1 == self.chunks.len();
        let target = &mut self.chunks[pos];
        let at = index - target.offset;

        if is_head && target.len <= DEFAULT_CAPACITY * 2 && target.slack() >= count {
            // Small head with room: open the gap in place.
            target.buf.copy_within(at..target.len, at + count);
            target.len += count;
            return (pos, at);
        }

        // Split the target: a new full chunk takes the prefix and the gap, and the target
        // keeps the suffix, reallocated down to exactly that suffix. The new chunk shares
        // the target's sequence number; existing chunks never renumber, and there is no
        // unused value between the target and its predecessor.
        let mut fresh = Chunk::new(at + count, target.offset, target.seq);
        fresh.buf[..at].copy_from_slice(&target.buf[..at]);
        fresh.len = at + count;
        target.offset += at + count;
        if at > 0 {
            let suffix = target.len - at;
            let mut buf = vec![T::default(); suffix].into_boxed_slice();
            buf.copy_from_slice(&target.buf[at..target.len]);
            target.buf = buf;
            target.len = suffix;
        }
        self.chunks.insert(pos, fresh);
        for chunk in &mut self.chunks[pos + 1..] {
            if let Some(map) = &mut chunk.skip {
                map.shift_for_insert(pos);
            }
        }
        // The splice grew the chain while the head kept its slack; trim that slack if the
        // total capacity overran the limit.
        if self.capacity() > self.max_capacity {
            let max_capacity = self.max_capacity;
            let head = self.head_mut();
            let new_capacity = max_capacity - head.offset;
            head.realloc(new_capacity);
        }
        // The chain grew without a promotion; the head's sequence number moves past it.
        let head_pos = self.chunks.len() - 1;
        self.chunks[head_pos].seq += 1;
        if self.use_skip_map {
            let seq = self.chunks[head_pos].seq;
            let (earlier, head) = self.chunks.split_at_mut(head_pos);
            head[0].skip = SkipMap::build(seq, earlier);
        }
        (pos, at)
    }

    /// Removes the elements in `range`, shifting everything after it down. Removing the
    /// entire sequence resets it.
    ///
    /// # Panics
    ///
    /// Panics if the range falls outside the sequence.
    pub fn remove_range(&mut self, range: Range<usize>) {
        let range = self.check_range(range);
        let count = range.len();
        let len = self.len();
        if count == 0 {
            return;
        }
        if count == len {
            self.clear();
            return;
        }
        let Range { start, end } = range;

        // Chunks wholly past the removed region move down.
        let mut pos = self.chunks.len() - 1;
        while self.chunks[pos].offset >= end {
            self.chunks[pos].offset -= count;
            pos -= 1;
        }
        let e = pos;
        let e_offset = self.chunks[e].offset;

        if e_offset <= start {
            // The removal is contained in one chunk.
            let is_head = e + 1 == self.chunks.len();
            let chunk = &mut self.chunks[e];
            let lo = start - e_offset;
            chunk.buf.copy_within(end - e_offset..chunk.len, lo);
            chunk.len -= count;
            if chunk.len == 0 {
                self.chunks.remove(e);
                self.repair_maps_after_removal(e..e + 1);
            } else if !is_head {
                let new_len = chunk.len;
                chunk.realloc(new_len);
            }
            return;
        }

        // The removal spans chunks. Cut the front of the end chunk, which now begins at
        // `start`.
        let e_is_head = e + 1 == self.chunks.len();
        {
            let chunk = &mut self.chunks[e];
            let cut = end - e_offset;
            chunk.buf.copy_within(cut..chunk.len, 0);
            chunk.len -= cut;
            chunk.offset = start;
            if chunk.len > 0 && !e_is_head {
                let new_len = chunk.len;
                chunk.realloc(new_len);
            }
        }
        // Truncate the start chunk where the removal begins.
        let mut s = e - 1;
        while self.chunks[s].offset > start {
            s -= 1;
        }
        {
            let chunk = &mut self.chunks[s];
            chunk.len = start - chunk.offset;
            if chunk.len > 0 {
                let new_len = chunk.len;
                chunk.realloc(new_len);
            }
        }
        // Everything strictly between them dies, as do either end when emptied.
        let lo = if self.chunks[s].len == 0 { s } else { s + 1 };
        let hi = if self.chunks[e].len == 0 { e + 1 } else { e };
        if lo < hi {
            self.chunks.drain(lo..hi);
            self.repair_maps_after_removal(lo..hi);
        }
    }

    /// Fixes skip maps after the chunks at `removed` positions were dropped: entries that
    /// referenced them disappear, and positions above the span slide down.
    fn repair_maps_after_removal(&mut self, removed: Range<usize>) {
        for chunk in &mut self.chunks[removed.start..] {
            if let Some(map) = &mut chunk.skip {
                map.remap_for_removal(removed.clone());
            }
        }
    }

    /// Compares the `pattern` against the elements beginning at `start`, which must leave
    /// the probe in bounds. Returns `false` on the first mismatch.
    fn matches_at(&self, start: usize, pattern: &[T]) -> bool
    where
        T: PartialEq,
    {
        debug_assert!(start + pattern.len() <= self.len());
        let mut pos = self.chunk_position(start);
        let mut pattern = pattern;
        let mut at = start;
        while !pattern.is_empty() {
            let chunk = &self.chunks[pos];
            let lo = at - chunk.offset;
            let run = min(chunk.len - lo, pattern.len());
            if chunk.buf[lo..lo + run] != pattern[..run] {
                return false;
            }
            pattern = &pattern[run..];
            at += run;
            pos += 1;
        }
        true
    }

    /// Replaces every occurrence of `old` in the sequence with `new`, returning how many
    /// were replaced. See [`ChunkedVec::replace_in`].
    pub fn replace(&mut self, old: &[T], new: &[T]) -> usize
    where
        T: PartialEq,
    {
        let len = self.len();
        self.replace_in(old, new, 0..len)
    }

    /// Replaces every occurrence of `old` that starts and ends inside `range` with `new`,
    /// returning how many were replaced. Matches are found left to right and never
    /// overlap; the window tracks the length change of each replacement.
    ///
    /// # Panics
    ///
    /// Panics if `old` is empty, the range falls outside the sequence, or a growing
    /// replacement runs out of capacity.
    pub fn replace_in(&mut self, old: &[T], new: &[T], range: Range<usize>) -> usize
    where
        T: PartialEq,
    {
        assert!(!old.is_empty(), "the pattern must not be empty");
        let range = self.check_range(range);
        let mut replaced = 0;
        let mut i = range.start;
        let mut end = range.end;
        while i + old.len() <= end {
            if !self.matches_at(i, old) {
                i += 1;
                continue;
            }
            if new.len() == old.len() {
                self.copy_from(i, new);
            } else if new.len() < old.len() {
                self.copy_from(i, new);
                self.remove_range(i + new.len()..i + old.len());
                end -= old.len() - new.len();
            } else {
                self.copy_from(i, &new[..old.len()]);
                self.insert_from_slice(i + old.len(), &new[old.len()..]);
                end += new.len() - old.len();
            }
            i += new.len();
            replaced += 1;
        }
        replaced
    }

    /// Replaces every element equal to `old` with `new`, returning how many changed.
    pub fn replace_value(&mut self, old: T, new: T) -> usize
    where
        T: PartialEq,
    {
        let len = self.len();
        self.replace_value_in(old, new, 0..len)
    }

    /// Replaces every element equal to `old` inside `range` with `new`, walking the chain
    /// backward from the end of the window. Returns how many changed.
    ///
    /// # Panics
    ///
    /// Panics if the range falls outside the sequence.
    pub fn replace_value_in(&mut self, old: T, new: T, range: Range<usize>) -> usize
    where
        T: PartialEq,
    {
        let range = self.check_range(range);
        if range.is_empty() {
            return 0;
        }
        let Range { start, end } = range;
        let mut replaced = 0;
        let mut pos = self.chunk_position(end - 1);
        loop {
            let chunk = &mut self.chunks[pos];
            let lo = max(chunk.offset, start) - chunk.offset;
            let hi = min(chunk.offset + chunk.len, end) - chunk.offset;
            for value in &mut chunk.buf[lo..hi] {
                if *value == old {
                    *value = new;
                    replaced += 1;
                }
            }
            if chunk.offset <= start {
                return replaced;
            }
            pos -= 1;
        }
    }

    /// Heap bytes held by the chain: every backing array plus the skip maps.
    pub fn mem_size(&self) -> usize {
        self.chunks
            .iter()
            .map(|chunk| {
                mem::size_of::<T>() * chunk.capacity()
                    + chunk.skip.as_ref().map_or(0, SkipMap::mem_size)
            })
            .sum()
    }

    /// Borrowing iterator over the elements in logical order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(&self.chunks, self.len())
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        assert!(!self.chunks.is_empty());
        let mut offset = 0;
        let mut last_seq = 0;
        for (pos, chunk) in self.chunks.iter().enumerate() {
            assert_eq!(chunk.offset, offset, "offset of chunk {pos}");
            assert!(chunk.len <= chunk.capacity());
            if pos + 1 != self.chunks.len() {
                assert_eq!(chunk.len, chunk.capacity(), "frozen chunk {pos} has slack");
            }
            // Sequence numbers never decrease, but splices may duplicate them.
            if pos > 0 {
                assert!(chunk.seq >= last_seq, "sequence number of chunk {pos} decreased");
            }
            last_seq = chunk.seq;
            if let Some(map) = &chunk.skip {
                assert!(chunk.seq % 2 == 0 && chunk.seq != 0);
                map.check(pos, chunk.seq, &self.chunks);
            }
            offset += chunk.len;
        }
        assert!(self.capacity() <= self.max_capacity);
    }
}

impl<T: Copy + Default> Default for ChunkedVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Default> From<&[T]> for ChunkedVec<T> {
    fn from(values: &[T]) -> Self {
        Self::from_slice(values)
    }
}

impl<T: Copy + Default> Index<usize> for ChunkedVec<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        let len = self.len();
        if index >= len {
            panic!("index out of bounds: the len is {len} but the index is {index}");
        }
        let chunk = &self.chunks[self.chunk_position(index)];
        &chunk.buf[index - chunk.offset]
    }
}

impl<T: Copy + Default> IndexMut<usize> for ChunkedVec<T> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        let len = self.len();
        if index >= len {
            panic!("index out of bounds: the len is {len} but the index is {index}");
        }
        let pos = self.chunk_position(index);
        let chunk = &mut self.chunks[pos];
        &mut chunk.buf[index - chunk.offset]
    }
}

/// Equality covers the shape as well as the content: sequences of equal elements compare
/// unequal when their total or maximum capacities differ. The content comparison walks
/// both chains in parallel from the tail, equating aligned runs, without materializing
/// either sequence.
impl<T: Copy + Default + PartialEq> PartialEq for ChunkedVec<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len()
            || self.capacity() != other.capacity()
            || self.max_capacity != other.max_capacity
        {
            return false;
        }
        let mut remaining = self.len();
        let mut a = self.chunks.len() - 1;
        let mut b = other.chunks.len() - 1;
        let mut a_hi = self.chunks[a].len;
        let mut b_hi = other.chunks[b].len;
        while remaining > 0 {
            if a_hi == 0 {
                a -= 1;
                a_hi = self.chunks[a].len;
                continue;
            }
            if b_hi == 0 {
                b -= 1;
                b_hi = other.chunks[b].len;
                continue;
            }
            let run = min(a_hi, b_hi);
            if self.chunks[a].buf[a_hi - run..a_hi] != other.chunks[b].buf[b_hi - run..b_hi] {
                return false;
            }
            a_hi -= run;
            b_hi -= run;
            remaining -= run;
        }
        true
    }
}

impl<T: Copy + Default + Eq> Eq for ChunkedVec<T> {}

impl<T: Copy + Default + fmt::Debug> fmt::Debug for ChunkedVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
