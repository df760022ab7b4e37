#![cfg_attr(not(feature = "std"), no_std)]
#![doc = include_str!("../README.md")]

extern crate alloc;

mod byte_stream;
mod chunked_vec;
mod iter;
mod skip;

pub use byte_stream::{ByteStream, StreamClosed};
pub use chunked_vec::{
    ChunkedVec, DEFAULT_CAPACITY, DEFAULT_MAX_CAPACITY, MAX_CHUNK_SIZE, SKIP_MAP_THRESHOLD,
};
pub use iter::Iter;
