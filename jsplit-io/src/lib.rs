//! jsplit I/O - File enumeration, parallel execution and partition planning
//!
//! This crate drives the scanners over real files:
//!
//! - A filesystem provider trait with a local implementation
//! - Initial byte-range bucketing
//! - A rayon-backed map-collect executor
//! - Driver-side reconciliation for both strategies
//! - High-level planning entry points

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod bucket;
pub mod executor;
pub mod fs;
pub mod reconcile;

// Re-export commonly used types
pub use bucket::bucketize;
pub use fs::{enumerate_inputs, FileProvider, FileStatus, LocalFs};
pub use jsplit_core::{FileBucket, PartitionDescriptor, PartitionOptions, Result, SplitError};
pub use jsplit_scan::{DocumentStats, ProjectionDfa, SpeculationTable};
pub use reconcile::{reconcile_full, reconcile_speculative, ScannedPartition};

use jsplit_scan::{end_state, shift_to_anchor, stats, ByteCursor};
use std::sync::Arc;
use tracing::debug;

/// Partition planner: enumeration, bucketing, worker dispatch and
/// reconciliation behind one handle.
pub struct PartitionPlanner {
    provider: Arc<dyn FileProvider>,
    options: PartitionOptions,
}

impl PartitionPlanner {
    /// Build a planner over a filesystem provider
    pub fn new(provider: Arc<dyn FileProvider>, options: PartitionOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { provider, options })
    }

    /// Planner over the local filesystem
    pub fn local(options: PartitionOptions) -> Result<Self> {
        let provider: Arc<dyn FileProvider> = match &options.base_path {
            Some(base) => Arc::new(LocalFs::with_base(base.clone())),
            None => Arc::new(LocalFs::new()),
        };
        Self::new(provider, options)
    }

    /// The options the planner was built with
    pub fn options(&self) -> &PartitionOptions {
        &self.options
    }

    /// Exact strategy: scan every bucket once, then reconcile neighbor
    /// stacks into final descriptors.
    pub fn plan_full_pass(&self, dfa: &ProjectionDfa) -> Result<Vec<PartitionDescriptor>> {
        let buckets = self.buckets()?;
        debug!(buckets = buckets.len(), "running full-pass scan");
        let provider = Arc::clone(&self.provider);
        let scanned = executor::map_collect(buckets, move |bucket| {
            let stream = provider.open(&bucket.path)?;
            let mut cur = ByteCursor::new(stream);
            let state = end_state(&mut cur, bucket.start, bucket.end)?;
            Ok(ScannedPartition { bucket, state })
        })?;
        Ok(reconcile_full(scanned, dfa))
    }

    /// Speculative strategy: slide each bucket start to the nearest anchor
    /// key from `table`, then settle ends.
    pub fn plan_speculative(&self, table: &SpeculationTable) -> Result<Vec<PartitionDescriptor>> {
        if table.is_empty() {
            return Err(SplitError::SpeculationImpossible);
        }
        let buckets = self.buckets()?;
        debug!(
            buckets = buckets.len(),
            anchors = table.len(),
            "running speculative shift"
        );
        let provider = Arc::clone(&self.provider);
        let shifted = executor::map_collect(buckets, move |bucket| {
            let stream = provider.open(&bucket.path)?;
            let mut cur = ByteCursor::new(stream);
            let spec = shift_to_anchor(&mut cur, &bucket, table)?;
            Ok((bucket, spec))
        })?;
        Ok(reconcile_speculative(shifted))
    }

    /// Collect key statistics across the selected files, one worker per
    /// file, merged on the driver.
    pub fn collect_stats(&self, dfa: &ProjectionDfa) -> Result<DocumentStats> {
        let files = enumerate_inputs(self.provider.as_ref(), &self.options)?;
        let provider = Arc::clone(&self.provider);
        let per_file = executor::map_collect(files, move |file| {
            let stream = provider.open(&file.path)?;
            let mut cur = ByteCursor::new(stream);
            stats::collect_stats(&mut cur, dfa)
        })?;
        let mut merged = DocumentStats::default();
        for file_stats in per_file {
            merged.merge(file_stats);
        }
        Ok(merged)
    }

    fn buckets(&self) -> Result<Vec<FileBucket>> {
        let files = enumerate_inputs(self.provider.as_ref(), &self.options)?;
        Ok(bucketize(&files, &self.options))
    }
}
