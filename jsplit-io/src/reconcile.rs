//! Partition reconciliation
//!
//! The worker stages produce per-bucket observations in isolation; the
//! reconciler runs single-threaded on the driver and stitches them into
//! final descriptors. For the exact strategy that means folding each
//! bucket's residual stack into its predecessors' context, projecting the
//! context through the automaton, and then walking backwards to shift
//! starts past skipped levels and settle each end against its successor.

use jsplit_core::{FileBucket, PartitionDescriptor, SyntaxStack};
use jsplit_scan::dfa::level_skipping;
use jsplit_scan::merge::merge_syntax_stacks;
use jsplit_scan::speculation::SpeculatedStart;
use jsplit_scan::{EndState, ProjectionDfa};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// One bucket together with its worker-side scan result
#[derive(Debug, Clone)]
pub struct ScannedPartition {
    /// The raw bucket that was scanned
    pub bucket: FileBucket,
    /// The scanner's residual stack and final position
    pub state: EndState,
}

/// Staged per-partition context computed by the forward fold
struct Staged {
    bucket: FileBucket,
    /// In-state stack with predecessor-owned entries filtered out
    filtered: SyntaxStack,
    start_level: u32,
    dfa_state: u32,
    skip_levels: u32,
    initial_state: SmallVec<[u8; 16]>,
    scan_end: u64,
}

/// Reconcile full-pass scan results into final descriptors.
///
/// `scanned` must be in document order: buckets of the same file adjacent
/// and sorted by start offset.
pub fn reconcile_full(
    scanned: Vec<ScannedPartition>,
    dfa: &ProjectionDfa,
) -> Vec<PartitionDescriptor> {
    // Forward pass: evolve the merged predecessor context file by file and
    // capture each partition's start context before folding its own stack.
    let mut staged: Vec<Staged> = Vec::with_capacity(scanned.len());
    let mut prev_stack = SyntaxStack::new();
    let mut prev_end = 0u64;
    let mut prev_path: Option<Arc<str>> = None;

    for part in scanned {
        if prev_path.as_deref() != Some(part.bucket.path.as_ref()) {
            prev_stack = SyntaxStack::new();
            prev_end = 0;
            prev_path = Some(Arc::clone(&part.bucket.path));
        }

        let skip = level_skipping(dfa, &prev_stack);
        let initial_state = prev_stack.opens(skip.start_level as usize);
        let (merged, filtered) = merge_syntax_stacks(&prev_stack, &part.state.stack, prev_end);

        staged.push(Staged {
            filtered,
            start_level: skip.start_level,
            dfa_state: skip.dfa_state,
            skip_levels: skip.skip_levels,
            initial_state,
            scan_end: part.state.end,
            bucket: part.bucket,
        });

        prev_stack = merged;
        prev_end = part.state.end;
    }

    // Reverse pass: shift starts past skipped levels, settle ends against
    // the following partition of the same file, and drop fully absorbed
    // partitions.
    let mut reversed: Vec<PartitionDescriptor> = Vec::with_capacity(staged.len());
    let mut next_start: HashMap<Arc<str>, u64> = HashMap::new();

    for i in (0..staged.len()).rev() {
        let part = &staged[i];
        let shifted_start = if part.skip_levels > 0 {
            shift_past_closes(&staged, i, part.skip_levels)
                .unwrap_or(part.bucket.file_size)
        } else {
            part.bucket.start
        };

        let mut end = part.scan_end;
        if let Some(&successor) = next_start.get(&part.bucket.path) {
            end = end.min(successor);
        }

        if shifted_start >= end {
            debug!(
                path = part.bucket.path.as_ref(),
                start = part.bucket.start,
                "partition fully absorbed by level skipping"
            );
            continue;
        }

        next_start.insert(Arc::clone(&part.bucket.path), shifted_start);
        reversed.push(PartitionDescriptor {
            id: 0,
            path: Arc::clone(&part.bucket.path),
            start: shifted_start,
            end,
            start_level: part.start_level,
            dfa_state: part.dfa_state,
            initial_state: part.initial_state.clone(),
        });
    }

    finalize(reversed)
}

/// Consume `skip_levels` close entries from partition `from` onwards (same
/// file), returning the offset just past the final close.
fn shift_past_closes(staged: &[Staged], from: usize, skip_levels: u32) -> Option<u64> {
    let path = &staged[from].bucket.path;
    let mut remaining = skip_levels;
    for part in &staged[from..] {
        if &part.bucket.path != path {
            return None;
        }
        for entry in part.filtered.iter() {
            if entry.token.is_close() {
                remaining -= 1;
                if remaining == 0 {
                    return Some(entry.pos);
                }
            }
        }
    }
    None
}

/// Reconcile speculative shift results into final descriptors.
///
/// No skipping is involved: each partition's end is rewritten to the next
/// same-file partition's shifted start so anchored partitions tile the file
/// without losing the bytes between a bucket boundary and its anchor.
pub fn reconcile_speculative(
    shifted: Vec<(FileBucket, SpeculatedStart)>,
) -> Vec<PartitionDescriptor> {
    let mut reversed: Vec<PartitionDescriptor> = Vec::with_capacity(shifted.len());
    let mut next_start: HashMap<Arc<str>, u64> = HashMap::new();

    for (bucket, spec) in shifted.into_iter().rev() {
        // A successor that found no anchor has its start pushed to the file
        // end; its whole range then transfers to this partition.
        let end = match next_start.insert(Arc::clone(&bucket.path), spec.start) {
            Some(successor) => successor,
            None => bucket.end,
        };
        if spec.start >= end {
            debug!(
                path = bucket.path.as_ref(),
                start = bucket.start,
                "speculative partition empty, dropping"
            );
            continue;
        }
        reversed.push(PartitionDescriptor {
            id: 0,
            path: bucket.path,
            start: spec.start,
            end,
            start_level: spec.start_level,
            dfa_state: spec.dfa_state,
            initial_state: SmallVec::new(),
        });
    }

    finalize(reversed)
}

/// Restore document order and assign ordinals
fn finalize(mut reversed: Vec<PartitionDescriptor>) -> Vec<PartitionDescriptor> {
    reversed.reverse();
    for (id, descriptor) in reversed.iter_mut().enumerate() {
        descriptor.id = id;
    }
    reversed
}
