//! Document statistics collection
//!
//! The speculation strategy needs to know, ahead of partitioning, which keys
//! occur rarely enough and predictably enough to act as synchronization
//! anchors. A single structural pass over a document records every key's
//! nesting level, occurrence count, and the projection-automaton state that
//! holds right after the key matches.

use crate::cursor::ByteCursor;
use crate::dfa::{DfaWalk, ProjectionDfa};
use crate::tokenizer;
use jsplit_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Seek};

/// Per-key, per-level occurrence statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyLevelStats {
    /// Occurrences of the key at this level
    pub count: u64,
    /// Automaton state right after the key is consumed. The first
    /// occurrence at a level fixes the state; anchors are only useful when
    /// that state is unambiguous anyway.
    pub dfa_state: u32,
}

/// Key statistics for a document corpus
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentStats {
    /// key -> nesting level -> stats
    pub keys: HashMap<String, BTreeMap<u32, KeyLevelStats>>,
}

impl DocumentStats {
    /// Record one key occurrence
    pub fn record(&mut self, key: &str, level: u32, dfa_state: u32) {
        self.keys
            .entry(key.to_string())
            .or_default()
            .entry(level)
            .and_modify(|stats| stats.count += 1)
            .or_insert(KeyLevelStats {
                count: 1,
                dfa_state,
            });
    }

    /// Fold another corpus' statistics into this one
    pub fn merge(&mut self, other: DocumentStats) {
        for (key, levels) in other.keys {
            let entry = self.keys.entry(key).or_default();
            for (level, stats) in levels {
                entry
                    .entry(level)
                    .and_modify(|existing| existing.count += stats.count)
                    .or_insert(stats);
            }
        }
    }

    /// Number of distinct keys observed
    pub fn distinct_keys(&self) -> usize {
        self.keys.len()
    }

    /// Keys that occur at exactly one nesting level, with that level's stats
    pub fn single_level_keys(&self) -> impl Iterator<Item = (&str, u32, KeyLevelStats)> {
        self.keys.iter().filter_map(|(key, levels)| {
            if levels.len() == 1 {
                let (&level, &stats) = levels.iter().next()?;
                Some((key.as_str(), level, stats))
            } else {
                None
            }
        })
    }
}

/// Scan a whole document and collect key statistics.
///
/// The scan tracks full grammatical context, so unlike the partition
/// scanners it needs no boundary heuristics: levels count every unmatched
/// open and the automaton walk follows the true ancestor chain.
pub fn collect_stats<R: Read + Seek>(
    cur: &mut ByteCursor<R>,
    dfa: &ProjectionDfa,
) -> Result<DocumentStats> {
    let mut stats = DocumentStats::default();
    // Each frame saves the walk to restore when the container closes.
    let mut frames: Vec<DfaWalk<'_>> = Vec::new();
    let mut walk = dfa.walk();
    // Walk to seed the next container with, set when a key matches.
    let mut pending: Option<DfaWalk<'_>> = None;

    loop {
        let Some(byte) = cur.next()? else {
            break;
        };
        match byte {
            b'{' | b'[' => {
                frames.push(walk);
                let mut inner = pending.take().unwrap_or(walk);
                if byte == b'[' {
                    inner.on_array(frames.len() as u32 - 1);
                }
                walk = inner;
            }
            b'}' | b']' => {
                if let Some(saved) = frames.pop() {
                    walk = saved;
                }
                pending = None;
            }
            b'"' => {
                let quote_pos = cur.position() - 1;
                let Some(token) = tokenizer::read_string_at(cur, quote_pos)? else {
                    break;
                };
                if tokenizer::peek_past_whitespace(cur)? == Some(b':') {
                    let level = frames.len() as u32;
                    let mut keyed = walk;
                    keyed.check_token(&token.content, level);
                    stats.record(&token.content, level, keyed.state());
                    pending = Some(keyed);
                }
            }
            b',' => pending = None,
            _ => {}
        }
    }
    Ok(stats)
}
