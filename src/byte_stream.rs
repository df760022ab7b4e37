//! A positioned, resizable byte stream backed by a chunked buffer.

use alloc::vec::Vec;
use core::cmp::max;
#[cfg(feature = "std")]
use core::cmp::min;
use core::fmt;

use bytes::Buf;

use crate::chunked_vec::{ChunkedVec, DEFAULT_CAPACITY};

#[cfg(feature = "std")]
use std::io;

/// Error returned by stream queries and position changes once the stream has been closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamClosed;

impl fmt::Display for StreamClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("the stream is closed")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for StreamClosed {}

#[cfg(feature = "std")]
impl From<StreamClosed> for io::Error {
    fn from(err: StreamClosed) -> Self {
        io::Error::new(io::ErrorKind::Other, err)
    }
}

/// A random-access byte stream whose backing store is a [`ChunkedVec<u8>`], so the content
/// never occupies one contiguous allocation no matter how large the stream grows.
///
/// The stream keeps a read/write position and implements [`std::io::Read`],
/// [`std::io::Write`], and [`std::io::Seek`] (with the `std` feature). Writing overwrites
/// in place up to the current length and appends past it; writing with the position beyond
/// the end zero-fills the gap first. It also implements [`bytes::Buf`] as a non-destructive
/// positional read facade, available without `std`.
///
/// Once closed, I/O and the length/position/capacity/writability queries all fail with
/// [`StreamClosed`]. The buffer itself is retained, so the snapshot family —
/// [`ByteStream::to_vec`], [`ByteStream::write_to`], and the backing-buffer accessors —
/// remains valid.
pub struct ByteStream {
    buf: ChunkedVec<u8>,
    pos: usize,
    open: bool,
    writable: bool,
}

impl ByteStream {
    /// Streams never grow past this many bytes, and the position never points past it.
    pub const MAX_LEN: usize = i32::MAX as usize;

    /// Creates an empty writable stream.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an empty writable stream with an initial buffer capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity > ByteStream::MAX_LEN`.
    pub fn with_capacity(capacity: usize) -> Self {
        ByteStream {
            buf: ChunkedVec::with_capacity_and_limit(capacity, Self::MAX_LEN),
            pos: 0,
            open: true,
            writable: true,
        }
    }

    /// Creates a writable stream holding a copy of `data`, positioned at zero.
    pub fn from_slice(data: &[u8]) -> Self {
        let mut this = Self::with_capacity(max(data.len(), DEFAULT_CAPACITY));
        this.buf.extend_from_slice(data);
        this
    }

    /// Creates a read-only stream over a copy of `data`. Reads and seeks work; writes and
    /// [`ByteStream::set_len`] fail.
    pub fn read_only(data: &[u8]) -> Self {
        let mut this = Self::from_slice(data);
        this.writable = false;
        this
    }

    fn guard(&self) -> Result<(), StreamClosed> {
        if self.open {
            Ok(())
        } else {
            Err(StreamClosed)
        }
    }

    /// Number of bytes in the stream. Fails once the stream has been closed.
    #[inline]
    pub fn len(&self) -> Result<usize, StreamClosed> {
        self.guard()?;
        Ok(self.buf.len())
    }

    /// Returns `true` if the stream holds no bytes. Fails once the stream has been
    /// closed.
    #[inline]
    pub fn is_empty(&self) -> Result<bool, StreamClosed> {
        Ok(self.len()? == 0)
    }

    /// Capacity of the backing buffer. Fails once the stream has been closed.
    #[inline]
    pub fn capacity(&self) -> Result<usize, StreamClosed> {
        self.guard()?;
        Ok(self.buf.capacity())
    }

    /// The current read/write position, which may point past the end of the stream.
    /// Fails once the stream has been closed.
    #[inline]
    pub fn position(&self) -> Result<usize, StreamClosed> {
        self.guard()?;
        Ok(self.pos)
    }

    /// Moves the read/write position. Fails once the stream has been closed.
    ///
    /// # Panics
    ///
    /// Panics if `pos > ByteStream::MAX_LEN`.
    pub fn set_position(&mut self, pos: usize) -> Result<(), StreamClosed> {
        self.guard()?;
        assert!(
            pos <= Self::MAX_LEN,
            "position (is {pos}) should be <= the maximum stream length (is {})",
            Self::MAX_LEN
        );
        self.pos = pos;
        Ok(())
    }

    /// Returns `Ok(true)` while the stream is open; fails once it has been closed.
    #[inline]
    pub fn is_open(&self) -> Result<bool, StreamClosed> {
        self.guard()?;
        Ok(true)
    }

    /// Returns whether the stream accepts writes. Fails once the stream has been closed.
    #[inline]
    pub fn is_writable(&self) -> Result<bool, StreamClosed> {
        self.guard()?;
        Ok(self.writable)
    }

    /// Borrows the backing buffer. Remains valid after close.
    pub fn get_ref(&self) -> &ChunkedVec<u8> {
        &self.buf
    }

    /// Mutably borrows the backing buffer. Length changes made through it are visible to
    /// the stream; the position is left alone.
    pub fn get_mut(&mut self) -> &mut ChunkedVec<u8> {
        &mut self.buf
    }

    /// Consumes the stream, returning the backing buffer.
    pub fn into_inner(self) -> ChunkedVec<u8> {
        self.buf
    }

    /// Snapshots the content into a contiguous vector. Works on closed streams too, since
    /// closing retains the buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        self.buf.to_vec()
    }

    /// Closes the stream: subsequent reads, writes, seeks, and state queries fail, while
    /// the buffer and its snapshots remain usable.
    pub fn close(&mut self) {
        self.open = false;
        self.writable = false;
    }

    #[cfg(feature = "std")]
    fn ensure_open(&self) -> io::Result<()> {
        self.guard().map_err(Into::into)
    }

    #[cfg(feature = "std")]
    fn ensure_writable(&self) -> io::Result<()> {
        self.ensure_open()?;
        if self.writable {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "the stream is not writable",
            ))
        }
    }

    /// Truncates or zero-extends the stream to `new_len` bytes. The position is left where
    /// it was, even if that is now past the end.
    #[cfg(feature = "std")]
    pub fn set_len(&mut self, new_len: usize) -> io::Result<()> {
        self.ensure_writable()?;
        if new_len > Self::MAX_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "length exceeds the maximum stream length",
            ));
        }
        self.buf.resize(new_len, 0);
        Ok(())
    }

    /// Writes the entire content into `dest` chunk by chunk, without materializing it.
    /// The position is not consulted or moved, and like [`ByteStream::to_vec`] this works
    /// on closed streams.
    #[cfg(feature = "std")]
    pub fn write_to<W: io::Write>(&self, dest: &mut W) -> io::Result<()> {
        let mut at = 0;
        while at < self.buf.len() {
            let run = self.buf.run_from(at);
            dest.write_all(run)?;
            at += run.len();
        }
        Ok(())
    }

    /// Copies every byte from the current position to the end directly into `dest`,
    /// advancing this stream's position. `dest` writes at its own position as usual.
    /// For an arbitrary writer, `std::io::copy` over the [`io::Read`] impl does the same.
    #[cfg(feature = "std")]
    pub fn copy_to(&mut self, dest: &mut ByteStream) -> io::Result<u64> {
        self.ensure_open()?;
        let mut copied = 0u64;
        while self.pos < self.buf.len() {
            let run = self.buf.run_from(self.pos);
            let n = run.len();
            io::Write::write_all(dest, run)?;
            self.pos += n;
            copied += n as u64;
        }
        Ok(copied)
    }
}

impl Default for ByteStream {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream")
            .field("len", &self.buf.len())
            .field("position", &self.pos)
            .field("open", &self.open)
            .field("writable", &self.writable)
            .finish()
    }
}

/// Non-destructive positional reads: `remaining` is the distance from the position to the
/// end, and advancing only moves the position. Like the snapshot family, this reads the
/// retained buffer and keeps working after close.
impl Buf for ByteStream {
    #[inline]
    fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    #[inline]
    fn chunk(&self) -> &[u8] {
        if self.pos >= self.buf.len() {
            return &[];
        }
        self.buf.run_from(self.pos)
    }

    #[inline]
    fn advance(&mut self, cnt: usize) {
        if cnt > self.remaining() {
            panic!("advanced past end");
        }
        self.pos += cnt;
    }
}

#[cfg(feature = "std")]
impl io::Read for ByteStream {
    fn read(&mut self, dest: &mut [u8]) -> io::Result<usize> {
        self.ensure_open()?;
        let len = self.buf.len();
        if self.pos >= len || dest.is_empty() {
            return Ok(0);
        }
        let n = min(dest.len(), len - self.pos);
        self.buf.copy_to(self.pos, &mut dest[..n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(feature = "std")]
impl io::Write for ByteStream {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.ensure_writable()?;
        if data.is_empty() {
            return Ok(0);
        }
        let end = match self.pos.checked_add(data.len()) {
            Some(end) if end <= Self::MAX_LEN => end,
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "write would exceed the maximum stream length",
                ))
            }
        };
        if self.pos > self.buf.len() {
            // The position was seeked past the end; the gap reads as zeros.
            self.buf.resize(self.pos, 0);
        }
        let overlap = min(self.buf.len() - self.pos, data.len());
        self.buf.copy_from(self.pos, &data[..overlap]);
        self.buf.extend_from_slice(&data[overlap..]);
        self.pos = end;
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Nothing is buffered.
        Ok(())
    }
}

#[cfg(feature = "std")]
impl io::Seek for ByteStream {
    fn seek(&mut self, seek: io::SeekFrom) -> io::Result<u64> {
        self.ensure_open()?;
        let target = match seek {
            io::SeekFrom::Start(n) => i128::from(n),
            io::SeekFrom::Current(delta) => self.pos as i128 + i128::from(delta),
            io::SeekFrom::End(delta) => self.buf.len() as i128 + i128::from(delta),
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative position",
            ));
        }
        if target > Self::MAX_LEN as i128 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek past the maximum stream length",
            ));
        }
        self.pos = target as usize;
        Ok(self.pos as u64)
    }
}
