//! The sparse buffer map
//!
//! Pending writes are kept as non-overlapping segments keyed by their start
//! offset. New data either overwrites the segments it lands on in place or
//! fills the gaps between them with fresh segments. Neighbouring segments are
//! never merged on insert; adjacency is only discovered when a contiguous run
//! is extracted for flushing.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, error, instrument, trace};

use crate::config::BufferMapConfig;
use crate::error::{BufferError, BufferResult, InvariantViolation};
use crate::segment::{ContiguousRun, Lookup, Segment, SegmentView};

/// Sparse, offset-indexed write buffer
///
/// Not internally synchronized. Callers that share a map across threads
/// must serialize access themselves (e.g. behind a `Mutex`).
#[derive(Default)]
pub struct SparseBufferMap {
    /// Start offset -> segment, ascending
    segments: BTreeMap<u64, Segment>,
    config: BufferMapConfig,
}

impl SparseBufferMap {
    /// Create an empty map
    pub fn new(config: BufferMapConfig) -> Self {
        Self {
            segments: BTreeMap::new(),
            config,
        }
    }

    /// Create an empty map with the given flush threshold and default settings
    pub fn with_threshold(flush_threshold: usize) -> Self {
        Self::new(BufferMapConfig::with_threshold(flush_threshold))
    }

    pub fn config(&self) -> &BufferMapConfig {
        &self.config
    }

    pub fn flush_threshold(&self) -> usize {
        self.config.flush_threshold
    }

    /// Number of segments currently buffered
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total number of bytes buffered across all segments
    pub fn buffered_bytes(&self) -> usize {
        self.segments.values().map(Segment::len).sum()
    }

    /// Iterate over all segments in ascending offset order
    pub fn segments(&self) -> impl Iterator<Item = SegmentView<'_>> {
        self.segments
            .iter()
            .map(|(&offset, segment)| SegmentView::new(offset, segment))
    }

    /// Buffer `data` starting at `offset`
    ///
    /// Parts of the range already covered by segments are overwritten in
    /// place; every uncovered gap becomes a new segment starting exactly where
    /// the gap starts. Afterwards every byte of `[offset, offset + data.len())`
    /// holds the new value.
    ///
    /// # Errors
    ///
    /// - [`BufferError::EmptyWrite`] if `data` is empty
    /// - [`BufferError::OffsetOverflow`] if the range end does not fit in `u64`
    /// - [`BufferError::OutOfMemory`] if a new segment cannot be allocated. Bytes
    ///   already applied before the failing gap stay applied.
    pub fn insert(&mut self, offset: u64, data: &[u8]) -> BufferResult<()> {
        if data.is_empty() {
            return Err(BufferError::EmptyWrite { offset });
        }
        u64::try_from(data.len())
            .ok()
            .and_then(|length| offset.checked_add(length))
            .ok_or(BufferError::OffsetOverflow {
                offset,
                length: data.len(),
            })?;

        let mut cursor = offset;
        let mut rest = data;

        while !rest.is_empty() {
            let consumed = match self.overwrite_covering(cursor, rest) {
                Some(n) => n,
                None => self.fill_gap(cursor, rest)?,
            };
            cursor += consumed as u64;
            rest = &rest[consumed..];
        }

        self.verify();
        Ok(())
    }

    /// Overwrite the segment covering `cursor`, if any
    fn overwrite_covering(&mut self, cursor: u64, bytes: &[u8]) -> Option<usize> {
        let (&start, segment) = self.segments.range_mut(..=cursor).next_back()?;
        if start + segment.len() as u64 <= cursor {
            return None;
        }

        let n = segment.overwrite((cursor - start) as usize, bytes);
        trace!(offset = cursor, segment = start, length = n, "Overwrote buffered bytes in place");
        Some(n)
    }

    /// Create a segment at `cursor` spanning up to the next segment or the
    /// end of `bytes`, whichever comes first
    fn fill_gap(&mut self, cursor: u64, bytes: &[u8]) -> BufferResult<usize> {
        let n = match self.segments.range(cursor..).next() {
            Some((&next, _)) => (next - cursor).min(bytes.len() as u64) as usize,
            None => bytes.len(),
        };

        let segment = Segment::copy_from(&bytes[..n]).inspect_err(|_| {
            error!(offset = cursor, length = n, "No memory to allocate segment");
        })?;
        self.segments.insert(cursor, segment);
        trace!(offset = cursor, length = n, "Created segment");
        Ok(n)
    }

    /// Find the segment covering `offset`, or else the nearest one after it
    pub fn lookup(&self, offset: u64) -> Lookup<'_> {
        if let Some((&start, segment)) = self.segments.range(..=offset).next_back()
            && start + segment.len() as u64 > offset
        {
            return Lookup::Covering(SegmentView::new(start, segment));
        }

        match self.segments.range(offset..).next() {
            Some((&start, segment)) => Lookup::Next(SegmentView::new(start, segment)),
            None => Lookup::None,
        }
    }

    /// Same search as [`lookup`](Self::lookup), returning the start, data and
    /// length of the found segment without saying whether it covers `offset`
    pub fn segment_at(&self, offset: u64) -> Option<SegmentView<'_>> {
        self.lookup(offset).segment()
    }

    /// Drop all buffered data at or beyond `new_size`
    ///
    /// A segment straddling `new_size` is cut down to `[start, new_size)`.
    pub fn truncate(&mut self, new_size: u64) {
        let dropped = self.segments.split_off(&new_size);

        if let Some((&start, segment)) = self.segments.iter_mut().next_back() {
            let end = start + segment.len() as u64;
            if end > new_size {
                segment.shrink_to((new_size - start) as usize);
                debug!(offset = start, old_end = end, new_size, "Cut straddling segment");
            }
        }

        if !dropped.is_empty() {
            debug!(new_size, dropped = dropped.len(), "Dropped segments past truncation point");
        }

        self.verify();
    }

    /// Drop everything buffered
    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Remove the first contiguous run that is ready to flush
    ///
    /// Runs are scanned in ascending order. A run qualifies if `force` is set
    /// or its total length reaches the flush threshold. The qualifying run's
    /// segments are removed and returned as one block; if none qualifies the
    /// map is left untouched and `None` is returned.
    ///
    /// # Errors
    ///
    /// [`BufferError::OutOfMemory`] if the concatenation block cannot be
    /// allocated. The map is unchanged in that case.
    #[instrument(skip(self), fields(segments = self.segments.len(), threshold = self.config.flush_threshold))]
    pub fn extract_contiguous_run(&mut self, force: bool) -> BufferResult<Option<ContiguousRun>> {
        let mut cursor = 0;

        while let Some((start, length, count)) = self.run_from(cursor) {
            if force || length >= self.config.flush_threshold {
                let run = self.take_run(start, length, count)?;
                debug!(offset = start, length, segments = count, "Extracted contiguous run");
                self.verify();
                return Ok(Some(run));
            }

            trace!(offset = start, length, "Run below flush threshold");
            // Skip to the run's logical end so the next lookup lands past the gap
            cursor = start + length as u64;
        }

        Ok(None)
    }

    /// First run starting at or after `cursor`: (start, total length, segment count)
    fn run_from(&self, cursor: u64) -> Option<(u64, usize, usize)> {
        let mut iter = self.segments.range(cursor..);
        let (&start, first) = iter.next()?;

        let mut end = start + first.len() as u64;
        let mut count = 1;
        for (&offset, segment) in iter {
            if offset != end {
                break;
            }
            end += segment.len() as u64;
            count += 1;
        }

        Some((start, (end - start) as usize, count))
    }

    fn take_run(&mut self, start: u64, length: usize, count: usize) -> BufferResult<ContiguousRun> {
        if count == 1 {
            // Hand the block over as is
            if let Some(segment) = self.segments.remove(&start) {
                return Ok(ContiguousRun {
                    offset: start,
                    data: segment.into_bytes(),
                });
            }
        }

        let mut data = Vec::new();
        data.try_reserve_exact(length).map_err(|_| {
            error!(offset = start, length, "No memory to allocate flush block");
            BufferError::out_of_memory(length)
        })?;

        let mut next = start;
        for _ in 0..count {
            let Some(segment) = self.segments.remove(&next) else {
                break;
            };
            next += segment.len() as u64;
            data.extend_from_slice(segment.bytes());
        }
        debug_assert_eq!(data.len(), length);

        Ok(ContiguousRun {
            offset: start,
            data,
        })
    }

    /// Check that no segment runs into the next one
    ///
    /// # Errors
    ///
    /// Returns the first overlapping pair found.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let pairs = self.segments.iter().zip(self.segments.keys().skip(1));
        for ((&offset, segment), &next_offset) in pairs {
            if offset + segment.len() as u64 > next_offset {
                return Err(InvariantViolation {
                    offset,
                    size: segment.len(),
                    next_offset,
                });
            }
        }
        Ok(())
    }

    /// Post-mutation check, enabled by `verify_invariants`
    ///
    /// # Panics
    ///
    /// Panics with the segment listing if segments overlap.
    fn verify(&self) {
        if !self.config.verify_invariants {
            return;
        }
        if let Err(violation) = self.check_invariants() {
            error!(%violation, "Sparse buffer map corrupted");
            panic!("{violation}\n{self}");
        }
    }
}

impl fmt::Display for SparseBufferMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for view in self.segments() {
            writeln!(f, "offset: {:#x}, size: {:#x}", view.offset, view.len())?;
        }
        Ok(())
    }
}

impl fmt::Debug for SparseBufferMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparseBufferMap")
            .field("segments", &self.segments.len())
            .field("buffered_bytes", &self.buffered_bytes())
            .field("config", &self.config)
            .finish()
    }
}
