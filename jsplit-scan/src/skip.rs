//! Value skip scanner
//!
//! Given a cursor positioned just after the first byte of a JSON value,
//! advance past the rest of the value and stop immediately before the next
//! sibling delimiter. Structural bytes inside strings are opaque; escape
//! handling is backslash-pair consumption.

use crate::cursor::ByteCursor;
use jsplit_core::Result;
use smallvec::SmallVec;
use std::io::{Read, Seek};

/// Skip past the current value. `current` is the byte that began the value
/// and has already been consumed; `end` bounds the scan once the value is
/// structurally complete (a value spanning `end` is finished regardless).
///
/// Returns the cursor position, which points at the delimiter (`,`, `]` or
/// `}`) following the value, or at `end`/end-of-stream.
pub fn skip_value<R: Read + Seek>(
    cur: &mut ByteCursor<R>,
    end: u64,
    current: u8,
) -> Result<u64> {
    let mut stack: SmallVec<[u8; 16]> = SmallVec::new();
    let mut in_string = false;
    match current {
        b'{' | b'[' => stack.push(current),
        b'"' => {
            stack.push(current);
            in_string = true;
        }
        _ => {}
    }

    loop {
        if stack.is_empty() {
            match cur.peek()? {
                None => return Ok(cur.position()),
                Some(b',') | Some(b']') | Some(b'}') => return Ok(cur.position()),
                Some(_) if cur.position() >= end => return Ok(cur.position()),
                Some(_) => {}
            }
        }

        let Some(byte) = cur.next()? else {
            return Ok(cur.position());
        };

        if in_string {
            match byte {
                b'\\' => {
                    // The escaped byte cannot close the string.
                    let _ = cur.next()?;
                }
                b'"' => {
                    if stack.last() == Some(&b'"') {
                        stack.pop();
                    }
                    in_string = false;
                }
                _ => {}
            }
            continue;
        }

        match byte {
            b'{' | b'[' => stack.push(byte),
            b'"' => {
                stack.push(byte);
                in_string = true;
            }
            b'}' => {
                if stack.last() == Some(&b'{') {
                    stack.pop();
                }
            }
            b']' => {
                if stack.last() == Some(&b'[') {
                    stack.pop();
                }
            }
            _ => {}
        }
    }
}
