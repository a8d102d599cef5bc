//! Partition descriptors and file buckets

use smallvec::SmallVec;
use std::sync::Arc;

/// Fixed-size byte range cut from a file before any syntactic analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBucket {
    /// File the range belongs to
    pub path: Arc<str>,
    /// First byte of the range
    pub start: u64,
    /// One past the last byte of the range
    pub end: u64,
    /// Total size of the file the bucket was cut from
    pub file_size: u64,
}

impl FileBucket {
    /// Length of the range in bytes
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Whether the range is empty
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Byte range annotated with the syntactic metadata that makes independent
/// parsing safe.
///
/// `start` never falls inside a JSON string literal, `start_level` equals the
/// number of unmatched `{`/`[` in the file prefix `[0, start)`, and
/// `initial_state[i]` is the bracket byte opened at depth `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionDescriptor {
    /// Ordinal index in document order, assigned after reconciliation
    pub id: usize,
    /// File the partition reads from
    pub path: Arc<str>,
    /// First byte of the half-open range `[start, end)`
    pub start: u64,
    /// One past the last byte of the range
    pub end: u64,
    /// JSON nesting depth at `start`, relative to the document root
    pub start_level: u32,
    /// Projection-DFA state index valid at `start`
    pub dfa_state: u32,
    /// Ancestor opens from the root down to `start`, one `{` or `[` byte per
    /// depth. Empty for the speculative strategy.
    pub initial_state: SmallVec<[u8; 16]>,
}

impl PartitionDescriptor {
    /// Descriptor for a fresh bucket: document root context, DFA at its
    /// start state.
    pub fn from_bucket(bucket: &FileBucket) -> Self {
        Self {
            id: 0,
            path: Arc::clone(&bucket.path),
            start: bucket.start,
            end: bucket.end,
            start_level: 0,
            dfa_state: 0,
            initial_state: SmallVec::new(),
        }
    }

    /// Length of the range in bytes
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Whether the range is empty
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(start: u64, end: u64) -> FileBucket {
        FileBucket {
            path: Arc::from("data.json"),
            start,
            end,
            file_size: end,
        }
    }

    #[test]
    fn descriptor_from_bucket_starts_at_root() {
        let desc = PartitionDescriptor::from_bucket(&bucket(128, 256));
        assert_eq!(desc.start, 128);
        assert_eq!(desc.end, 256);
        assert_eq!(desc.start_level, 0);
        assert_eq!(desc.dfa_state, 0);
        assert!(desc.initial_state.is_empty());
    }

    #[test]
    fn empty_ranges() {
        assert!(bucket(10, 10).is_empty());
        assert_eq!(bucket(10, 10).len(), 0);
        assert!(!bucket(0, 1).is_empty());
    }
}
