//! Neighbor stack merging
//!
//! Folds a successor partition's residual stack into the evolving context of
//! its predecessors. Dangling closes cancel the predecessor's opens; keys
//! and opens accumulate. The merged stack is the syntactic-ancestor sequence
//! valid at the successor's end.

use jsplit_core::{StackEntry, SyntaxStack, SyntaxToken};

/// Merge a predecessor's residual stack `s1` with a successor's in-state
/// stack `s2`.
///
/// Entries of `s2` whose bytes were already consumed by the predecessor's
/// scanner (position at or before `prev_end`) are dropped first. Returns the
/// merged stack and the filtered copy of `s2`; the latter keeps its
/// positions for the reconciler's shift walk.
pub fn merge_syntax_stacks(
    s1: &SyntaxStack,
    s2: &SyntaxStack,
    prev_end: u64,
) -> (SyntaxStack, SyntaxStack) {
    let filtered = filter_consumed(s2, prev_end);

    let mut merged = s1.clone();
    for entry in filtered.iter() {
        match &entry.token {
            SyntaxToken::ObjectClose => {
                // A '}' cancels either a bare '{' or a key + '{' pair.
                if matches!(
                    merged.last(),
                    Some(StackEntry {
                        token: SyntaxToken::ObjectOpen,
                        ..
                    })
                ) {
                    merged.pop();
                } else {
                    merged.pop();
                    merged.pop();
                }
            }
            SyntaxToken::ArrayClose => {
                merged.pop();
            }
            SyntaxToken::Key(_) => {
                // The scanner records a key it finds at its own base level
                // without seeing the enclosing '{'; across the seam it
                // supersedes the predecessor's last key at that level, just
                // as a later sibling key does within one scan.
                if matches!(
                    merged.last(),
                    Some(StackEntry {
                        token: SyntaxToken::Key(_),
                        ..
                    })
                ) {
                    merged.pop();
                }
                merged.push(entry.token.clone(), entry.pos);
            }
            token => merged.push(token.clone(), entry.pos),
        }
    }
    (merged, filtered)
}

/// Drop entries whose token bytes lie within the predecessor's scanned
/// range. Keys record their opening-quote offset while brackets record the
/// offset just past the bracket, so the comparison differs by one.
fn filter_consumed(s2: &SyntaxStack, prev_end: u64) -> SyntaxStack {
    let entries = s2
        .iter()
        .filter(|entry| match entry.token {
            SyntaxToken::Key(_) => entry.pos >= prev_end,
            _ => entry.pos > prev_end,
        })
        .cloned()
        .collect();
    SyntaxStack::from_entries(entries)
}
