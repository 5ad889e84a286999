//! Configuration for the sparse buffer map

use serde::{Deserialize, Serialize};

/// Default flush threshold (1 MiB)
pub const DEFAULT_FLUSH_THRESHOLD: usize = 1024 * 1024;

/// Thresholds above this are accepted but flagged by [`BufferMapConfig::validate`]
pub const LARGE_THRESHOLD_WARNING: usize = 256 * 1024 * 1024;

/// Configuration for a [`SparseBufferMap`](crate::SparseBufferMap)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferMapConfig {
    /// Minimum length in bytes a contiguous run needs before a non-forced
    /// extraction hands it out
    pub flush_threshold: usize,
    /// Walk all segments after every mutation and panic on overlap
    pub verify_invariants: bool,
}

impl Default for BufferMapConfig {
    fn default() -> Self {
        Self {
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            verify_invariants: cfg!(debug_assertions),
        }
    }
}

impl BufferMapConfig {
    /// Create a config with the given flush threshold
    pub fn with_threshold(flush_threshold: usize) -> Self {
        Self {
            flush_threshold,
            ..Default::default()
        }
    }

    /// Create a config for workloads of many small writes (64 KiB threshold)
    ///
    /// Runs get flushed early, keeping little memory pending.
    pub fn small_writes() -> Self {
        Self::with_threshold(64 * 1024)
    }

    /// Create a config for large sequential writes (8 MiB threshold)
    pub fn large_writes() -> Self {
        Self::with_threshold(8 * 1024 * 1024)
    }

    /// Enable or disable the post-mutation overlap check
    pub fn with_verify_invariants(mut self, enabled: bool) -> Self {
        self.verify_invariants = enabled;
        self
    }

    /// Validate configuration
    ///
    /// Returns a list of warnings. An empty list means the configuration is valid.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.flush_threshold == 0 {
            warnings.push(ConfigWarning::ZeroThreshold);
        }

        if self.flush_threshold > LARGE_THRESHOLD_WARNING {
            warnings.push(ConfigWarning::VeryLargeThreshold);
        }

        warnings
    }

    /// Check if the configuration is valid (no warnings)
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// Configuration warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Threshold of zero makes every extraction behave as forced
    ZeroThreshold,
    /// Threshold above 256 MiB
    VeryLargeThreshold,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::ZeroThreshold => {
                write!(f, "flush_threshold is zero, every run qualifies for flush")
            }
            ConfigWarning::VeryLargeThreshold => {
                write!(f, "flush_threshold is very large (> 256 MiB)")
            }
        }
    }
}
