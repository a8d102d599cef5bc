//! Buffered byte cursor with single-byte lookahead
//!
//! The scanners consume input a byte at a time but need to stop *before* a
//! delimiter they have already seen. `peek` gives them that one byte of
//! lookahead without a seek on the underlying stream.

use jsplit_core::Result;
use std::io::{Read, Seek, SeekFrom};

const BUFFER_LEN: usize = 64 * 1024;

/// Cursor over a seekable byte stream tracking its absolute position.
pub struct ByteCursor<R> {
    inner: R,
    buf: Vec<u8>,
    buf_start: u64,
    buf_len: usize,
    pos: u64,
}

impl<R: Read + Seek> ByteCursor<R> {
    /// Cursor positioned at the start of the stream
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, BUFFER_LEN)
    }

    /// Cursor positioned at `offset`
    pub fn at(inner: R, offset: u64) -> Result<Self> {
        let mut cursor = Self::new(inner);
        cursor.seek(offset)?;
        Ok(cursor)
    }

    fn with_capacity(inner: R, capacity: usize) -> Self {
        Self {
            inner,
            buf: vec![0u8; capacity],
            buf_start: 0,
            buf_len: 0,
            pos: 0,
        }
    }

    /// Absolute offset of the next byte `next` would return
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Reposition the cursor. Seeks within the buffered window are free.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        if pos >= self.buf_start && pos <= self.buf_start + self.buf_len as u64 {
            self.pos = pos;
            return Ok(());
        }
        self.inner.seek(SeekFrom::Start(pos))?;
        self.buf_start = pos;
        self.buf_len = 0;
        self.pos = pos;
        Ok(())
    }

    /// Read one byte and advance; `None` at end of stream
    pub fn next(&mut self) -> Result<Option<u8>> {
        match self.lookahead()? {
            Some(byte) => {
                self.pos += 1;
                Ok(Some(byte))
            }
            None => Ok(None),
        }
    }

    /// Read one byte without advancing; `None` at end of stream
    pub fn peek(&mut self) -> Result<Option<u8>> {
        self.lookahead()
    }

    fn lookahead(&mut self) -> Result<Option<u8>> {
        if self.pos < self.buf_start || self.pos >= self.buf_start + self.buf_len as u64 {
            if self.fill()? == 0 {
                return Ok(None);
            }
        }
        let idx = (self.pos - self.buf_start) as usize;
        Ok(Some(self.buf[idx]))
    }

    fn fill(&mut self) -> Result<usize> {
        // The underlying stream may be elsewhere after a buffered seek.
        let stream_pos = self.buf_start + self.buf_len as u64;
        if stream_pos != self.pos {
            self.inner.seek(SeekFrom::Start(self.pos))?;
        }
        let read = self.inner.read(&mut self.buf)?;
        self.buf_start = self.pos;
        self.buf_len = read;
        Ok(read)
    }
}
