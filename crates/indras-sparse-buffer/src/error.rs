//! Error types for indras-sparse-buffer
//!
//! Only recoverable conditions are errors. A broken overlap invariant is a
//! defect inside the map and is reported by panicking, see
//! [`InvariantViolation`].

use thiserror::Error;

/// Errors that can occur while buffering or extracting data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// Backing block for a segment or an extracted run could not be allocated
    #[error("No memory to allocate block of {requested} bytes")]
    OutOfMemory { requested: usize },

    /// Insert was called without any bytes
    #[error("Empty write at offset {offset}")]
    EmptyWrite { offset: u64 },

    /// `offset + length` does not fit in the offset domain
    #[error("Write of {length} bytes at offset {offset} overflows the offset range")]
    OffsetOverflow { offset: u64, length: usize },
}

impl BufferError {
    /// Create a new OutOfMemory error
    pub fn out_of_memory(requested: usize) -> Self {
        Self::OutOfMemory { requested }
    }

    /// Whether this error reports allocation failure
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. })
    }
}

/// Result type for buffer map operations
pub type BufferResult<T> = Result<T, BufferError>;

/// Two neighbouring segments that overlap
///
/// Produced by [`SparseBufferMap::check_invariants`](crate::SparseBufferMap::check_invariants).
/// Observing one means the map is already corrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error(
    "segment at {offset:#x} (size {size:#x}) overlaps next segment at {next_offset:#x}"
)]
pub struct InvariantViolation {
    /// Start of the earlier segment
    pub offset: u64,
    /// Length of the earlier segment
    pub size: usize,
    /// Start of the segment it runs into
    pub next_offset: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_memory_error() {
        let err = BufferError::out_of_memory(4096);
        assert!(err.is_out_of_memory());
        assert!(err.to_string().contains("4096"));
    }

    #[test]
    fn test_empty_write_is_not_oom() {
        let err = BufferError::EmptyWrite { offset: 7 };
        assert!(!err.is_out_of_memory());
        assert_eq!(err.to_string(), "Empty write at offset 7");
    }

    #[test]
    fn test_offset_overflow_message() {
        let err = BufferError::OffsetOverflow {
            offset: u64::MAX,
            length: 2,
        };
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn test_invariant_violation_display() {
        let violation = InvariantViolation {
            offset: 0x10,
            size: 0x8,
            next_offset: 0x14,
        };
        assert_eq!(
            violation.to_string(),
            "segment at 0x10 (size 0x8) overlaps next segment at 0x14"
        );
    }
}
