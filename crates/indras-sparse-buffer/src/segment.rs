//! Segment types
//!
//! A [`Segment`] is the owned block stored in the map. Callers only ever see
//! borrowed [`SegmentView`]s, the tagged [`Lookup`] result, or an extracted
//! [`ContiguousRun`] whose block they own.

use crate::error::{BufferError, BufferResult};

/// Owned, non-empty byte block buffered at some offset
///
/// The length is fixed at creation and only ever shrinks through
/// [`Segment::shrink_to`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Segment {
    data: Vec<u8>,
}

impl Segment {
    /// Allocate a block holding a copy of `bytes`
    ///
    /// The allocation is fallible so that exhaustion surfaces as
    /// [`BufferError::OutOfMemory`].
    pub(crate) fn copy_from(bytes: &[u8]) -> BufferResult<Self> {
        debug_assert!(!bytes.is_empty());
        let mut data = Vec::new();
        data.try_reserve_exact(bytes.len())
            .map_err(|_| BufferError::out_of_memory(bytes.len()))?;
        data.extend_from_slice(bytes);
        Ok(Self { data })
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Copy `bytes` over the content starting at `at`, returning how many
    /// bytes fit before the segment's end
    pub(crate) fn overwrite(&mut self, at: usize, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.data.len() - at);
        self.data[at..at + n].copy_from_slice(&bytes[..n]);
        n
    }

    /// Drop everything past `len` and release the spare capacity
    pub(crate) fn shrink_to(&mut self, len: usize) {
        debug_assert!(len > 0 && len <= self.data.len());
        self.data.truncate(len);
        self.data.shrink_to_fit();
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Borrowed view of one buffered segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentView<'a> {
    /// Offset of the first byte
    pub offset: u64,
    /// Buffered content
    pub bytes: &'a [u8],
}

impl<'a> SegmentView<'a> {
    pub(crate) fn new(offset: u64, segment: &'a Segment) -> Self {
        Self {
            offset,
            bytes: segment.bytes(),
        }
    }

    /// Length of the segment in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false, segments are never empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Offset one past the last byte
    pub fn end(&self) -> u64 {
        self.offset + self.bytes.len() as u64
    }

    /// Whether `offset` falls inside this segment
    pub fn contains(&self, offset: u64) -> bool {
        offset >= self.offset && offset < self.end()
    }

    /// Byte buffered at `offset`, if covered
    pub fn byte_at(&self, offset: u64) -> Option<u8> {
        if self.contains(offset) {
            Some(self.bytes[(offset - self.offset) as usize])
        } else {
            None
        }
    }
}

/// Result of a covering-or-next lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// A segment contains the requested offset
    Covering(SegmentView<'a>),
    /// No segment contains it; this is the nearest one starting after it
    Next(SegmentView<'a>),
    /// Nothing is buffered at or after the offset
    None,
}

impl<'a> Lookup<'a> {
    /// The found segment, covering or next
    pub fn segment(&self) -> Option<SegmentView<'a>> {
        match self {
            Lookup::Covering(view) | Lookup::Next(view) => Some(*view),
            Lookup::None => None,
        }
    }

    /// The segment only if it contains the requested offset
    pub fn covering(&self) -> Option<SegmentView<'a>> {
        match self {
            Lookup::Covering(view) => Some(*view),
            _ => None,
        }
    }

    pub fn is_covering(&self) -> bool {
        matches!(self, Lookup::Covering(_))
    }
}

/// A run of adjacent segments extracted from the map, ready to flush
///
/// The caller owns the block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContiguousRun {
    /// Offset of the first byte of the run
    pub offset: u64,
    /// Concatenated content of every segment in the run
    pub data: Vec<u8>,
}

impl ContiguousRun {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Offset one past the last byte
    pub fn end(&self) -> u64 {
        self.offset + self.data.len() as u64
    }

    /// Split into `(offset, data)`
    pub fn into_parts(self) -> (u64, Vec<u8>) {
        (self.offset, self.data)
    }
}
