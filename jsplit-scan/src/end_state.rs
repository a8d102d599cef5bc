//! Partition end-state scanner
//!
//! Scans a byte range and returns its residual syntactic context: the opens
//! never closed within the range, the closes whose opens lie before the
//! range, and the object keys sitting between them. Dangling closes are kept
//! as explicit tokens so the merger can cancel them against a predecessor's
//! opens.
//!
//! The scanner cannot know the grammatical state at an arbitrary start
//! offset. Two local devices recover it well enough for the merger to do the
//! rest: a boundary prelude that assumes the range begins inside a
//! value-position string, and a value-mode flag driven by `:` and `,` that
//! separates keys from string values.

use crate::cursor::ByteCursor;
use crate::skip::skip_value;
use crate::tokenizer;
use jsplit_core::{Result, SyntaxStack, SyntaxToken};
use std::io::{Read, Seek};
use tracing::debug;

/// Result of scanning one partition.
#[derive(Debug, Clone)]
pub struct EndState {
    /// Residual syntactic context of the range, keys resolved
    pub stack: SyntaxStack,
    /// Final scanner position; at least the range end unless the stream
    /// ended first
    pub end: u64,
    /// Diagnostic: the scanner ran past the range end to finish a value
    pub past_end: bool,
}

/// Scan `[start, end)` and compute its residual syntactic stack.
pub fn end_state<R: Read + Seek>(
    cur: &mut ByteCursor<R>,
    start: u64,
    end: u64,
) -> Result<EndState> {
    cur.seek(start)?;

    if start > 0 {
        boundary_prelude(cur, start)?;
    }

    // Raw stack of token bytes. Opens and closes record the offset just
    // after the bracket; quotes record the offset of the opening quote so
    // the key content can be re-read during materialization.
    let mut stack: Vec<(u8, u64)> = Vec::new();
    let mut value_mode = false;

    while cur.position() < end {
        let Some(byte) = cur.next()? else {
            break;
        };
        let after = cur.position();
        match byte {
            b'{' => {
                stack.push((b'{', after));
                value_mode = false;
            }
            b'[' => {
                stack.push((b'[', after));
            }
            b'}' => {
                if matches!(stack.last(), Some((b'"', _))) && stack.len() >= 2 {
                    stack.pop();
                }
                if matches!(stack.last(), Some((b'{', _))) {
                    stack.pop();
                } else {
                    stack.push((b'}', after));
                }
            }
            b']' => {
                if matches!(stack.last(), Some((b'[', _))) {
                    stack.pop();
                } else {
                    stack.push((b']', after));
                }
            }
            b'"' => {
                let quote_pos = after - 1;
                if value_mode {
                    skip_value(cur, end, b'"')?;
                } else {
                    match stack.last().map(|entry| entry.0) {
                        Some(b'"') => {
                            // A later key at the same level supersedes the
                            // previous one.
                            if let Some(top) = stack.last_mut() {
                                top.1 = quote_pos;
                            }
                            tokenizer::consume_string_body(cur)?;
                        }
                        Some(b'{') => {
                            stack.push((b'"', quote_pos));
                            tokenizer::consume_string_body(cur)?;
                        }
                        Some(b'[') => {
                            // Array element in a context that never saw the
                            // introducing ':'.
                            skip_value(cur, end, b'"')?;
                        }
                        _ => {
                            // No local context: a key only if a ':' follows.
                            tokenizer::consume_string_body(cur)?;
                            if tokenizer::peek_past_whitespace(cur)? == Some(b':') {
                                stack.push((b'"', quote_pos));
                            }
                        }
                    }
                }
            }
            b':' => value_mode = true,
            b',' => {
                if !matches!(stack.last(), Some((b'[', _))) {
                    value_mode = false;
                }
            }
            _ => {}
        }
    }

    let final_pos = cur.position();
    let stack = materialize(cur, &stack)?;
    Ok(EndState {
        stack,
        end: final_pos,
        past_end: final_pos > end,
    })
}

/// Assume the range begins inside a value-position string: consume through
/// the first unescaped quote if the consumed tail looks like string content,
/// otherwise reset to `start`.
///
/// The tail alone cannot tell a string interior from a structural gap, but
/// the byte after the quote can: a closing quote is always followed by a
/// structural byte or whitespace, while an opening quote is followed by
/// string content. Only the closing-quote reading confirms the assumption.
fn boundary_prelude<R: Read + Seek>(cur: &mut ByteCursor<R>, start: u64) -> Result<()> {
    let consumed = match tokenizer::consume_string_tail(cur)? {
        Some(raw) if tokenizer::is_valid_string(&raw) => matches!(
            cur.peek()?,
            None | Some(b':' | b',' | b'}' | b']' | b' ' | b'\t' | b'\n' | b'\r')
        ),
        _ => false,
    };
    if consumed {
        Ok(())
    } else {
        cur.seek(start)
    }
}

/// Resolve the raw byte stack into tokens, re-reading each recorded quote
/// to recover the key content.
fn materialize<R: Read + Seek>(cur: &mut ByteCursor<R>, raw: &[(u8, u64)]) -> Result<SyntaxStack> {
    let mut stack = SyntaxStack::new();
    for &(token, pos) in raw {
        let token = match token {
            b'{' => SyntaxToken::ObjectOpen,
            b'[' => SyntaxToken::ArrayOpen,
            b'}' => SyntaxToken::ObjectClose,
            b']' => SyntaxToken::ArrayClose,
            _ => match tokenizer::read_string_at(cur, pos)? {
                Some(token) => SyntaxToken::Key(token.content),
                None => {
                    debug!(offset = pos, "key truncated at end of stream");
                    SyntaxToken::Key(String::new())
                }
            },
        };
        stack.push(token, pos);
    }
    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsplit_core::StackEntry;
    use std::io::Cursor;

    fn scan(data: &[u8], start: u64, end: u64) -> EndState {
        let mut cur = ByteCursor::new(Cursor::new(data.to_vec()));
        end_state(&mut cur, start, end).expect("scan")
    }

    fn tokens(state: &EndState) -> Vec<SyntaxToken> {
        state.stack.iter().map(|e| e.token.clone()).collect()
    }

    fn key(name: &str) -> SyntaxToken {
        SyntaxToken::Key(name.to_string())
    }

    #[test]
    fn balanced_document_leaves_empty_stack() {
        let data = br#"{"a":{"b":{"c":42}}}"#;
        let state = scan(data, 0, data.len() as u64);
        assert!(state.stack.is_empty(), "stack: {}", state.stack);
        assert_eq!(state.end, data.len() as u64);
        assert!(!state.past_end);
    }

    #[test]
    fn prefix_records_open_chain_with_keys() {
        let data = br#"{"a":{"b":{"c":42}}}"#;
        // Stop inside c's object.
        let state = scan(data, 0, 16);
        assert_eq!(
            tokens(&state),
            vec![
                SyntaxToken::ObjectOpen,
                key("a"),
                SyntaxToken::ObjectOpen,
                key("b"),
                SyntaxToken::ObjectOpen,
                key("c"),
            ]
        );
    }

    #[test]
    fn suffix_records_dangling_closes() {
        let data = br#"[{"name":"alice"},{"name":"bob"}]"#;
        // Second half, starting at the closing quote of "alice".
        let state = scan(data, 15, data.len() as u64);
        let toks = tokens(&state);
        assert_eq!(
            toks,
            vec![SyntaxToken::ObjectClose, SyntaxToken::ArrayClose],
            "stack: {}",
            state.stack
        );
        // The dangling '}' is recorded just after its byte at offset 16.
        assert_eq!(state.stack.entries()[0].pos, 17);
    }

    #[test]
    fn value_strings_are_opaque() {
        // Structural bytes inside string values must not register.
        let data = br#"{"a":"}{][","b":[1,"x,y"]}"#;
        let state = scan(data, 0, data.len() as u64);
        assert!(state.stack.is_empty(), "stack: {}", state.stack);
    }

    #[test]
    fn scanner_finishes_string_past_end() {
        let data = br#"[{"name":"alice"},{"name":"bob"}]"#;
        // End lands inside "alice"; the skip must finish the string.
        let state = scan(data, 0, 12);
        assert!(state.past_end);
        assert!(state.end > 12);
        assert_eq!(
            tokens(&state),
            vec![SyntaxToken::ArrayOpen, SyntaxToken::ObjectOpen, key("name")]
        );
    }

    #[test]
    fn mid_object_keys_survive_for_merging() {
        // A partition cut inside an object: the unmatched value open keeps
        // the key that introduced it.
        let data = br#""k":{"x":1},"m":{"y":"#;
        let state = scan(data, 1, data.len() as u64);
        // Prelude consumes through the quote closing "k" (start sits inside
        // it per the value-position assumption).
        let toks = tokens(&state);
        assert_eq!(
            toks,
            vec![key("m"), SyntaxToken::ObjectOpen, key("y")],
            "stack: {}",
            state.stack
        );
    }

    #[test]
    fn lone_key_keeps_dangling_close() {
        // Object closes locally but its open lies before the range: the key
        // is retained alongside the dangling close for pair cancellation.
        let data = br#""k":1}"#;
        let state = scan(data, 0, data.len() as u64);
        assert_eq!(tokens(&state), vec![key("k"), SyntaxToken::ObjectClose]);
    }

    #[test]
    fn prelude_resets_on_invalid_tail() {
        // Bytes before the first quote contain a raw control byte, so the
        // range cannot have started inside a string literal.
        let data = b"\x01\x02{\"a\": {\"b\":1";
        let state = scan(&data[..], 1, data.len() as u64);
        // Reset means the scan starts at offset 1 and sees the full open
        // chain; without the reset the prelude would swallow the quote
        // opening "a" and misalign every string that follows.
        assert_eq!(
            tokens(&state),
            vec![
                SyntaxToken::ObjectOpen,
                key("a"),
                SyntaxToken::ObjectOpen,
                key("b"),
            ],
            "stack: {}",
            state.stack
        );
    }

    #[test]
    fn entry_positions_allow_key_reread() {
        let data = br#"{"outer":{"inner":"#;
        let state = scan(data, 0, data.len() as u64);
        let entries: Vec<&StackEntry> = state.stack.iter().collect();
        assert_eq!(entries.len(), 4);
        // Key entries record the opening quote offset.
        assert_eq!(entries[1].pos, 1);
        assert_eq!(entries[3].pos, 10);
    }
}
