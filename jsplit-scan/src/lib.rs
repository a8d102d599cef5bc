//! jsplit scan - Byte-level JSON scanners
//!
//! This crate implements the syntactic machinery the planner layer drives:
//!
//! - A buffered byte cursor with single-byte lookahead
//! - Quoted-string tokenization over raw bytes
//! - The value skip scanner
//! - The partition end-state scanner (residual syntactic stacks)
//! - Neighbor stack merging
//! - The projection DFA and level skipping
//! - Speculation anchors and document statistics

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cursor;
pub mod dfa;
pub mod end_state;
pub mod merge;
pub mod skip;
pub mod speculation;
pub mod stats;
pub mod tokenizer;

// Re-export commonly used types
pub use cursor::ByteCursor;
pub use dfa::{DfaWalk, LevelSkip, ProjectionDfa, Verdict};
pub use end_state::{end_state, EndState};
pub use merge::merge_syntax_stacks;
pub use skip::skip_value;
pub use speculation::{shift_to_anchor, Anchor, SpeculatedStart, SpeculationTable};
pub use stats::DocumentStats;
