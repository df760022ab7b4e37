//! Black-box tests for the chunked sequence and the byte stream over it, covering the
//! documented contracts end to end: bulk building, indexed reads with and without the
//! skip maps, splicing, replacement, and the stream facade.

use std::io::{Read, Write};

use itertools::repeat_n;
use proptest::collection::vec as pvec;
use proptest::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use static_assertions::assert_impl_all;

use chunked_vec::{ByteStream, ChunkedVec};

assert_impl_all!(ChunkedVec<i64>: Send, Sync);
assert_impl_all!(ByteStream: Send, Sync);

/// Appends `values` in batches of 2000, the way large sequences are typically built.
fn build_from(values: &[i64]) -> ChunkedVec<i64> {
    let mut b = ChunkedVec::new();
    for batch in values.chunks(2000) {
        b.extend_from_slice(batch);
    }
    b
}

#[test]
fn bulk_append_round_trip() {
    let lengths = [12usize, 89, 123, 1_234_578];
    let mut next = 0i64;
    let arrays: Vec<Vec<i64>> = lengths
        .iter()
        .map(|&n| {
            let array: Vec<i64> = (next..next + n as i64).map(|v| v * 3 + 1).collect();
            next += n as i64;
            array
        })
        .collect();

    let mut b = ChunkedVec::new();
    for array in &arrays {
        b.extend_from_slice(array);
    }
    let expected: Vec<i64> = arrays.iter().flatten().copied().collect();
    assert_eq!(b.len(), 1_234_802);
    let flat = b.to_vec();
    assert_eq!(flat.len(), 1_234_802);
    assert_eq!(flat, expected);
}

#[test]
fn indexed_reads_with_and_without_skip_maps() {
    let source: Vec<i64> = (0..50_000).map(|v| v * 7 - 3).collect();
    let plain = build_from(&source);
    let mut indexed = ChunkedVec::new().with_skip_map();
    for batch in source.chunks(2000) {
        indexed.extend_from_slice(batch);
    }
    for (i, &v) in source.iter().enumerate() {
        assert_eq!(plain[i], v);
        assert_eq!(indexed[i], v);
    }
}

#[test]
fn skip_maps_agree_with_linear_walk_past_the_threshold() {
    // Enough chunks that lookups near the front descend the skip maps rather than
    // stepping chunk by chunk.
    let source: Vec<i64> = (0..840_000).collect();
    let plain = build_from(&source);
    let mut indexed = ChunkedVec::new().with_skip_map();
    for batch in source.chunks(2000) {
        indexed.extend_from_slice(batch);
    }
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..10_000 {
        let i = rng.gen_range(0..source.len());
        assert_eq!(indexed[i], plain[i]);
        assert_eq!(indexed[i], source[i]);
    }
}

#[test]
fn repeated_inserts_at_a_fixed_position() {
    let original: Vec<i64> = (0..50_000).map(|v| v + 1_000_000).collect();
    let mut b = build_from(&original);
    let digits: Vec<i64> = (0..10).collect();
    for _ in 0..8 {
        b.insert_from_slice(10, &digits);
    }
    assert_eq!(b.len(), 50_080);
    let inserted: Vec<i64> = repeat_n(0..10i64, 8).flatten().collect();
    for i in 0..10 {
        assert_eq!(b[i], original[i]);
    }
    for i in 10..90 {
        assert_eq!(b[i], inserted[i - 10]);
        assert_eq!(b[i], i as i64 % 10);
    }
    for i in 90..50_080 {
        assert_eq!(b[i], original[i - 80]);
    }
}

#[test]
fn repeated_removals_of_a_contiguous_span() {
    let original: Vec<i64> = (0..50_000).map(|v| v * 11 + 5).collect();
    let mut b = build_from(&original);
    for _ in 0..8 {
        b.remove_range(10..2010);
    }
    assert_eq!(b.len(), 34_000);
    for i in 0..10 {
        assert_eq!(b[i], original[i]);
    }
    for i in 10..34_000 {
        assert_eq!(b[i], original[i + 16_000]);
    }
}

#[test]
fn scalar_replacement_over_a_value_range() {
    let original: Vec<i64> = (0..50_000).map(|i| 98_000 + i % 5_000).collect();
    let mut b = build_from(&original);
    for v in 100_000..=100_100i64 {
        b.replace_value(v, 0);
    }
    for (i, &v) in original.iter().enumerate() {
        let expected = if (100_000..=100_100).contains(&v) { 0 } else { v };
        assert_eq!(b[i], expected);
    }
}

#[test]
fn byte_stream_write_read_round_trip() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut data = vec![0u8; 10_000];
    rng.fill(&mut data[..]);

    let mut stream = ByteStream::new();
    for batch in data.chunks(2048) {
        stream.write_all(batch).unwrap();
    }
    assert_eq!(stream.len(), Ok(10_000));

    stream.set_position(0).unwrap();
    let mut read_back = Vec::new();
    let mut batch = [0u8; 1024];
    loop {
        let n = stream.read(&mut batch).unwrap();
        if n == 0 {
            break;
        }
        read_back.extend_from_slice(&batch[..n]);
    }
    assert_eq!(read_back, data);
    assert_eq!(stream.to_vec(), data);
}

/// Reference implementation of non-overlapping left-to-right replacement over a flat
/// vector.
fn replace_reference(data: &[i64], old: &[i64], new: &[i64]) -> (Vec<i64>, usize) {
    let mut out = Vec::new();
    let mut i = 0;
    let mut replaced = 0;
    while i < data.len() {
        if i + old.len() <= data.len() && &data[i..i + old.len()] == old {
            out.extend_from_slice(new);
            i += old.len();
            replaced += 1;
        } else {
            out.push(data[i]);
            i += 1;
        }
    }
    (out, replaced)
}

proptest! {
    #[test]
    fn round_trip_matches_concatenation(batches in pvec(pvec(any::<i64>(), 0..300), 0..10)) {
        let mut b = ChunkedVec::with_capacity(4);
        let mut expected = Vec::new();
        for batch in &batches {
            b.extend_from_slice(batch);
            expected.extend_from_slice(batch);
        }
        prop_assert_eq!(b.len(), expected.len());
        prop_assert_eq!(b.to_vec(), expected);
    }

    #[test]
    fn indexing_agrees_with_the_flat_view(values in pvec(any::<i64>(), 0..2000)) {
        let mut b = ChunkedVec::with_capacity(4);
        for batch in values.chunks(170) {
            b.extend_from_slice(batch);
        }
        for (i, &v) in values.iter().enumerate() {
            prop_assert_eq!(b[i], v);
            prop_assert_eq!(b.get(i), Some(v));
        }
        prop_assert_eq!(b.get(values.len()), None);
    }

    #[test]
    fn append_extends_the_length(values in pvec(any::<i64>(), 0..500), value: i64, count in 0usize..500) {
        let mut b = ChunkedVec::from_slice(&values);
        let before = b.len();
        b.push_repeat(value, count);
        prop_assert_eq!(b.len(), before + count);
    }

    #[test]
    fn insert_then_remove_is_identity(
        values in pvec(any::<i64>(), 1..600),
        inserted in pvec(any::<i64>(), 1..30),
        index_seed: usize,
    ) {
        let mut b = ChunkedVec::with_capacity(4);
        for batch in values.chunks(90) {
            b.extend_from_slice(batch);
        }
        let before = b.to_vec();
        let index = index_seed % (values.len() + 1);
        b.insert_from_slice(index, &inserted);
        prop_assert_eq!(b.len(), before.len() + inserted.len());
        b.remove_range(index..index + inserted.len());
        prop_assert_eq!(b.to_vec(), before);
    }

    #[test]
    fn replacement_matches_the_reference(
        data in pvec(-2i64..=2, 0..300),
        old in pvec(-2i64..=2, 1..4),
        new in pvec(-2i64..=2, 0..6),
    ) {
        let mut b = ChunkedVec::with_capacity(4);
        for batch in data.chunks(70) {
            b.extend_from_slice(batch);
        }
        let replaced = b.replace(&old, &new);
        let (expected, expected_count) = replace_reference(&data, &old, &new);
        prop_assert_eq!(replaced, expected_count);
        prop_assert_eq!(b.to_vec(), expected);
        let delta = (new.len() as i64 - old.len() as i64) * replaced as i64;
        prop_assert_eq!(b.len() as i64, data.len() as i64 + delta);
    }

    #[test]
    fn equality_is_reflexive_and_symmetric(values in pvec(any::<i64>(), 0..500)) {
        let mut a = ChunkedVec::with_capacity(8);
        let mut b = ChunkedVec::with_capacity(8);
        for batch in values.chunks(60) {
            a.extend_from_slice(batch);
            b.extend_from_slice(batch);
        }
        prop_assert_eq!(&a, &a);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(&b, &a);
        a.push(1);
        prop_assert_ne!(&a, &b);
    }

    #[test]
    fn stream_writes_land_at_the_position(
        initial in pvec(any::<u8>(), 0..300),
        patch in pvec(any::<u8>(), 0..100),
        pos_seed: usize,
    ) {
        let mut stream = ByteStream::from_slice(&initial);
        let pos = pos_seed % (initial.len() + 1);
        stream.set_position(pos).unwrap();
        stream.write_all(&patch).unwrap();

        let mut expected = initial.clone();
        for (i, &byte) in patch.iter().enumerate() {
            if pos + i < expected.len() {
                expected[pos + i] = byte;
            } else {
                expected.push(byte);
            }
        }
        prop_assert_eq!(stream.to_vec(), expected);
        prop_assert_eq!(stream.position(), Ok(pos + patch.len()));
    }
}
