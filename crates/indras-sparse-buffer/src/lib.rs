//! # Indras Sparse Buffer
//!
//! Sparse, offset-indexed write buffer for Indras Network.
//!
//! A filesystem layer accumulates partial writes here before committing them
//! downstream. The map answers three questions: what is buffered at a given
//! offset, what happens when a new write overlaps buffered data, and when
//! enough contiguous data has piled up to flush it as one unit.
//!
//! ## Features
//!
//! - **Overlap-aware insert**: covered bytes are overwritten in place, gaps
//!   become new segments; segments never overlap
//! - **Covering-or-next lookup**: tagged [`Lookup`] result used for reads and
//!   gap arithmetic
//! - **Truncation**: drops or shortens everything past a new file size
//! - **Threshold-gated extraction**: hands out the first adjacent run that
//!   reaches the configured flush threshold, or any run when forced
//!
//! Deciding when to flush, performing the I/O and locking around the map are
//! the caller's business.
//!
//! ## Example
//!
//! ```rust
//! use indras_sparse_buffer::{BufferMapConfig, SparseBufferMap};
//!
//! let mut map = SparseBufferMap::new(BufferMapConfig::with_threshold(8));
//! map.insert(0, b"AAAA").unwrap();
//! map.insert(10, b"BBBB").unwrap();
//! map.insert(4, b"XXXXXX").unwrap();
//!
//! let run = map.extract_contiguous_run(false).unwrap().unwrap();
//! assert_eq!(run.offset, 0);
//! assert_eq!(run.data, b"AAAAXXXXXXBBBB");
//! assert!(map.is_empty());
//! ```

pub mod config;
pub mod error;
pub mod map;
pub mod segment;

// Re-exports
pub use config::{BufferMapConfig, ConfigWarning, DEFAULT_FLUSH_THRESHOLD};
pub use error::{BufferError, BufferResult, InvariantViolation};
pub use map::SparseBufferMap;
pub use segment::{ContiguousRun, Lookup, SegmentView};
