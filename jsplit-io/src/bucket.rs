//! Initial byte-range bucketing
//!
//! Before any syntactic analysis, every input file is cut into fixed-size
//! byte ranges. The bucket size spreads the corpus evenly across the
//! configured parallelism, clamped so tiny corpora do not produce a flood
//! of buckets and huge ones do not starve the workers.

use crate::fs::FileStatus;
use jsplit_core::{FileBucket, PartitionOptions};
use std::sync::Arc;
use tracing::{debug, warn};

/// Cut the enumerated files into raw buckets.
pub fn bucketize(files: &[FileStatus], options: &PartitionOptions) -> Vec<FileBucket> {
    if files.is_empty() {
        warn!(
            path = options.filepath.as_str(),
            "no input files matched, nothing to partition"
        );
        return Vec::new();
    }

    let total: u64 = files.iter().map(|file| file.len).sum();
    let bucket_size = options.bucket_size(total);
    debug!(
        files = files.len(),
        total_bytes = total,
        bucket_size,
        "bucketizing inputs"
    );

    let mut buckets = Vec::new();
    for file in files {
        let mut start = 0u64;
        while start < file.len {
            buckets.push(FileBucket {
                path: Arc::clone(&file.path),
                start,
                end: (start + bucket_size).min(file.len),
                file_size: file.len,
            });
            start += bucket_size;
        }
    }
    buckets
}
