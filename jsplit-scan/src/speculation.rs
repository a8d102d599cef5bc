//! Speculation anchors and boundary shifting
//!
//! The speculative strategy avoids scanning whole partitions: it slides each
//! boundary forward to the first occurrence of an anchor key, a key known
//! from document statistics to occur at exactly one nesting level. The
//! anchor's recorded level and automaton state then stand in for the full
//! syntactic reconstruction the exact strategy performs.

use crate::cursor::ByteCursor;
use crate::stats::DocumentStats;
use crate::tokenizer;
use jsplit_core::{FileBucket, Result, SplitError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Seek};
use tracing::debug;

/// Minimum occurrences for a key to qualify as an anchor outright
pub const MIN_ANCHOR_OCCURRENCES: u64 = 1000;
/// Fallback table size when too few keys qualify outright
pub const FALLBACK_TOP_KEYS: usize = 10;

/// Table entry: where an anchor key lives in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    /// The key's unique nesting level
    pub level: u32,
    /// Automaton state right after the key is consumed
    pub dfa_state: u32,
    /// Total occurrences across the corpus
    pub occurrences: u64,
}

/// Anchor keys usable for boundary resynchronization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeculationTable {
    anchors: HashMap<String, Anchor>,
}

impl SpeculationTable {
    /// Derive the anchor table from document statistics.
    ///
    /// Keys occurring at exactly one level with at least
    /// [`MIN_ANCHOR_OCCURRENCES`] occurrences qualify. When fewer than
    /// [`FALLBACK_TOP_KEYS`] do but the single-level candidate set is large
    /// enough, the most frequent candidates are taken instead. An empty
    /// table makes the speculative strategy impossible.
    pub fn from_stats(stats: &DocumentStats) -> Result<Self> {
        let mut candidates: Vec<(&str, u32, u64, u32)> = stats
            .single_level_keys()
            .map(|(key, level, s)| (key, level, s.count, s.dfa_state))
            .collect();

        let mut qualified: Vec<(&str, u32, u64, u32)> = candidates
            .iter()
            .copied()
            .filter(|(_, _, count, _)| *count >= MIN_ANCHOR_OCCURRENCES)
            .collect();

        if qualified.len() < FALLBACK_TOP_KEYS && candidates.len() >= FALLBACK_TOP_KEYS {
            candidates.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(b.0)));
            qualified = candidates.into_iter().take(FALLBACK_TOP_KEYS).collect();
        }

        let anchors: HashMap<String, Anchor> = qualified
            .into_iter()
            .map(|(key, level, occurrences, dfa_state)| {
                (
                    key.to_string(),
                    Anchor {
                        level,
                        dfa_state,
                        occurrences,
                    },
                )
            })
            .collect();

        if anchors.is_empty() {
            return Err(SplitError::SpeculationImpossible);
        }
        debug!(anchors = anchors.len(), "speculation table built");
        Ok(Self { anchors })
    }

    /// Look up an anchor by key content
    pub fn get(&self, key: &str) -> Option<&Anchor> {
        self.anchors.get(key)
    }

    /// Number of anchors
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Whether the table holds no anchors
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

/// A bucket boundary after speculative shifting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeculatedStart {
    /// Shifted start offset; the file size when no anchor was found
    pub start: u64,
    /// Nesting level at the shifted start
    pub start_level: u32,
    /// Automaton state at the shifted start
    pub dfa_state: u32,
}

/// Slide a bucket's start forward to the first anchor key after it.
///
/// When the anchor lies deeper than the automaton consumes, the boundary is
/// instead advanced past the intervening closing brackets so the partition
/// begins where the automaton state is meaningful. Buckets starting at the
/// file head pass through unchanged.
pub fn shift_to_anchor<R: Read + Seek>(
    cur: &mut ByteCursor<R>,
    bucket: &FileBucket,
    table: &SpeculationTable,
) -> Result<SpeculatedStart> {
    if bucket.start == 0 {
        return Ok(SpeculatedStart {
            start: 0,
            start_level: 0,
            dfa_state: 0,
        });
    }

    let mut search = bucket.start;
    loop {
        cur.seek(search)?;
        let token = match tokenizer::next_string_token(cur, bucket.file_size)? {
            Some(token) => token,
            None => {
                // No anchor before end of file: the partition is empty.
                debug!(
                    path = bucket.path.as_ref(),
                    start = bucket.start,
                    "no anchor found, pushing start to file end"
                );
                return Ok(SpeculatedStart {
                    start: bucket.file_size,
                    start_level: 0,
                    dfa_state: 0,
                });
            }
        };

        // An arbitrary boundary cannot tell opening quotes from closing
        // ones. Probing every quote position, and only committing to one
        // that reads as a table key followed by ':', keeps the search
        // aligned even when the bucket begins inside a string.
        let anchor = match table.get(&token.content).copied() {
            Some(anchor) if tokenizer::peek_past_whitespace(cur)? == Some(b':') => anchor,
            _ => {
                search = token.quote_pos + 1;
                continue;
            }
        };

        let mut skipped_levels = false;
        let (start, start_level) = if anchor.level > anchor.dfa_state {
            // The key lies below what the automaton consumes: exit the
            // intervening levels instead of starting at the key.
            let levels = anchor.level - anchor.dfa_state;
            let pos = tokenizer::skip_close_levels(cur, levels, bucket.file_size)?;
            skipped_levels = true;
            (pos, anchor.dfa_state)
        } else {
            // Pull the boundary back onto the key's opening quote so the
            // key itself belongs to this partition.
            (token.quote_pos, anchor.level)
        };

        let mut dfa_state = anchor.dfa_state;
        if dfa_state == start_level && !skipped_levels && dfa_state > 0 {
            // The anchor is the last matched component and its value has
            // not been consumed yet.
            dfa_state -= 1;
        }

        return Ok(SpeculatedStart {
            start,
            start_level,
            dfa_state,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;

    fn bucket(data: &[u8], start: u64) -> FileBucket {
        FileBucket {
            path: Arc::from("data.json"),
            start,
            end: data.len() as u64,
            file_size: data.len() as u64,
        }
    }

    fn table(entries: &[(&str, u32, u32, u64)]) -> SpeculationTable {
        SpeculationTable {
            anchors: entries
                .iter()
                .map(|&(key, level, dfa_state, occurrences)| {
                    (
                        key.to_string(),
                        Anchor {
                            level,
                            dfa_state,
                            occurrences,
                        },
                    )
                })
                .collect(),
        }
    }

    fn shift(data: &[u8], start: u64, table: &SpeculationTable) -> SpeculatedStart {
        let mut cur = ByteCursor::new(Cursor::new(data.to_vec()));
        shift_to_anchor(&mut cur, &bucket(data, start), table).expect("shift")
    }

    #[test]
    fn table_from_stats_requires_frequent_single_level_keys() {
        let mut stats = DocumentStats::default();
        for _ in 0..1500 {
            stats.record("marker", 2, 2);
        }
        // Frequent but multi-level: disqualified.
        for _ in 0..2000 {
            stats.record("noise", 1, 0);
            stats.record("noise", 3, 0);
        }
        let table = SpeculationTable::from_stats(&stats).expect("table");
        assert_eq!(table.len(), 1);
        let anchor = table.get("marker").expect("anchor");
        assert_eq!(anchor.level, 2);
        assert_eq!(anchor.occurrences, 1500);
    }

    #[test]
    fn table_falls_back_to_top_candidates() {
        let mut stats = DocumentStats::default();
        // Twelve single-level keys, none reaching the occurrence floor.
        for i in 0..12u32 {
            for _ in 0..(i + 1) {
                stats.record(&format!("k{i}"), 1, 0);
            }
        }
        let table = SpeculationTable::from_stats(&stats).expect("table");
        assert_eq!(table.len(), FALLBACK_TOP_KEYS);
        // The two least frequent keys fall out.
        assert!(table.get("k0").is_none());
        assert!(table.get("k1").is_none());
        assert!(table.get("k11").is_some());
    }

    #[test]
    fn empty_table_is_an_error() {
        let mut stats = DocumentStats::default();
        stats.record("a", 1, 0);
        stats.record("a", 2, 0);
        match SpeculationTable::from_stats(&stats) {
            Err(SplitError::SpeculationImpossible) => {}
            other => panic!("expected SpeculationImpossible, got {other:?}"),
        }
    }

    #[test]
    fn start_of_file_passes_through() {
        let table = table(&[("marker", 2, 2, 1500)]);
        let shifted = shift(br#"{"marker":1}"#, 0, &table);
        assert_eq!(shifted.start, 0);
        assert_eq!(shifted.start_level, 0);
        assert_eq!(shifted.dfa_state, 0);
    }

    #[test]
    fn boundary_rolls_back_onto_anchor_key() {
        //                          1111111111222222
        //                01234567890123456789012345
        let data = br#"{"pad":0,{"x":{"marker":7}}}"#;
        let table = table(&[("marker", 2, 2, 1500)]);
        let shifted = shift(data, 11, &table);
        // "marker" opens at offset 15; start lands on its quote.
        assert_eq!(shifted.start, 15);
        assert_eq!(shifted.start_level, 2);
        // dfa_state == start_level and no levels were skipped: the anchor is
        // the final matched component, so the state steps back by one.
        assert_eq!(shifted.dfa_state, 1);
    }

    #[test]
    fn deep_anchor_skips_out_of_excess_levels() {
        let data = br#"{"a":{"b":{"deep":1}},"next":2}"#;
        // "deep" is two levels below the automaton state it maps to.
        let table = table(&[("deep", 3, 1, 1500)]);
        let shifted = shift(data, 4, &table);
        // Two unmatched closes after "deep"'s value: offsets 19 and 20.
        assert_eq!(shifted.start, 21);
        assert_eq!(shifted.start_level, 1);
        assert_eq!(shifted.dfa_state, 1);
    }

    #[test]
    fn no_anchor_empties_partition() {
        let data = br#"{"other":{"stuff":1}}"#;
        let table = table(&[("marker", 2, 2, 1500)]);
        let shifted = shift(data, 3, &table);
        assert_eq!(shifted.start, data.len() as u64);
    }
}
