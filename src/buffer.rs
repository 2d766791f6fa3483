//! Growable line buffer with a consuming cursor and a lookahead cursor
//!
//! Both cursors scan the same text. The consuming cursor throws away what it
//! has passed whenever it needs more input ([`Exhaustion::Refill`]); the
//! lookahead cursor keeps everything and appends ([`Exhaustion::Grow`]) so
//! that peeked lines are still there for the consuming cursor afterwards.
//!
//! Lines are returned with their terminator. `\r`, `\n` and `\r\n` each end a
//! line, including a `\r\n` split across two reads from the source.

use crate::encoding::CharDecoder;
use crate::error::{FieldError, Result};
use crate::types::{DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE};
use memchr::memchr2;
use std::io::Read;

/// What to do when a cursor reaches the end of the buffered text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhaustion {
    /// Drop the buffered text and read a fresh chunk (consuming cursor)
    Refill,
    /// Append another chunk, keeping everything buffered (lookahead cursor)
    Grow,
}

/// Text buffer over a decoded source
pub struct LineBuffer<R> {
    source: CharDecoder<R>,
    buf: String,
    consume_pos: usize,
    peek_pos: usize,
    chunk_size: usize,
    max_size: usize,
}

impl<R: Read> LineBuffer<R> {
    /// Create a buffer and prime it with the first chunk
    pub fn new(source: CharDecoder<R>) -> Result<Self> {
        Self::with_limits(source, DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE)
    }

    /// Create a buffer with a custom chunk size and growth cap
    pub fn with_limits(source: CharDecoder<R>, chunk_size: usize, max_size: usize) -> Result<Self> {
        let chunk_size = chunk_size.max(1);
        let mut buffer = Self {
            source,
            buf: String::with_capacity(chunk_size),
            consume_pos: 0,
            peek_pos: 0,
            chunk_size,
            max_size: max_size.max(chunk_size),
        };
        buffer.change_buffer(Exhaustion::Refill)?;
        Ok(buffer)
    }

    /// Next line including its terminator, or `None` at end of input
    pub fn read_line(&mut self, strategy: Exhaustion) -> Result<Option<String>> {
        self.read_line_capped(strategy, usize::MAX)
    }

    /// Like [`read_line`](Self::read_line), but stops keeping text once the
    /// line is longer than `max_len` bytes.
    ///
    /// The rest of an overlong line is still consumed, so the next call starts
    /// on the following line. An overlong line comes back cut short yet still
    /// longer than `max_len`.
    pub fn read_line_capped(&mut self, strategy: Exhaustion, max_len: usize) -> Result<Option<String>> {
        if self.cursor(strategy) == self.buf.len() && !self.change_buffer(strategy)? {
            return Ok(None);
        }

        let mut line = String::new();
        loop {
            let start = self.cursor(strategy);
            if let Some(offset) = memchr2(b'\r', b'\n', &self.buf.as_bytes()[start..]) {
                let end = start + offset + 1;
                keep(&mut line, &self.buf[start..end], max_len);
                self.set_cursor(strategy, end);

                if self.buf.as_bytes()[end - 1] == b'\r' {
                    // A lone CR at the boundary needs the next chunk to rule out CRLF,
                    // unless the lookahead buffer is already full
                    if end == self.buf.len()
                        && (self.at_growth_cap(strategy) || !self.change_buffer(strategy)?)
                    {
                        return Ok(Some(line));
                    }
                    let pos = self.cursor(strategy);
                    if self.buf.as_bytes().get(pos) == Some(&b'\n') {
                        line.push('\n');
                        self.set_cursor(strategy, pos + 1);
                    }
                }
                return Ok(Some(line));
            }

            keep(&mut line, &self.buf[start..], max_len);
            self.set_cursor(strategy, self.buf.len());
            if !self.change_buffer(strategy)? {
                return Ok(Some(line));
            }
        }
    }

    /// Slide the consumed prefix out so lookahead starts at offset zero
    pub fn compact(&mut self) {
        if self.consume_pos > 0 {
            self.buf.drain(..self.consume_pos);
            self.consume_pos = 0;
        }
        self.peek_pos = 0;
    }

    /// Buffered text the consuming cursor has not passed yet
    pub fn remaining(&self) -> &str {
        &self.buf[self.consume_pos..]
    }

    /// Consume the buffered rest plus everything left in the source
    pub fn read_to_end(&mut self) -> Result<String> {
        let mut out = self.buf.split_off(self.consume_pos);
        self.buf.clear();
        self.consume_pos = 0;
        self.peek_pos = 0;
        self.source.read_to_end(&mut out)?;
        Ok(out)
    }

    /// Bytes of buffered text, consumed or not
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_source(self) -> CharDecoder<R> {
        self.source
    }

    fn cursor(&self, strategy: Exhaustion) -> usize {
        match strategy {
            Exhaustion::Refill => self.consume_pos,
            Exhaustion::Grow => self.peek_pos,
        }
    }

    fn set_cursor(&mut self, strategy: Exhaustion, pos: usize) {
        match strategy {
            Exhaustion::Refill => self.consume_pos = pos,
            Exhaustion::Grow => self.peek_pos = pos,
        }
    }

    fn at_growth_cap(&self, strategy: Exhaustion) -> bool {
        strategy == Exhaustion::Grow && self.buf.len() + self.chunk_size > self.max_size
    }

    /// Pull more text; the active cursor ends up at the start of the new text.
    ///
    /// Returns false when the source is exhausted.
    fn change_buffer(&mut self, strategy: Exhaustion) -> Result<bool> {
        match strategy {
            Exhaustion::Refill => {
                self.buf.clear();
                if self.buf.capacity() > self.chunk_size * 4 {
                    self.buf.shrink_to(self.chunk_size);
                }
                self.consume_pos = 0;
                self.peek_pos = 0;
            }
            Exhaustion::Grow => {
                if self.at_growth_cap(strategy) {
                    return Err(FieldError::LimitExceeded {
                        limit: self.max_size,
                    });
                }
                self.peek_pos = self.buf.len();
            }
        }
        let read = self.source.read_chunk(&mut self.buf, self.chunk_size)?;
        if strategy == Exhaustion::Grow && read > 0 {
            log::trace!("Lookahead buffer grew to {} bytes", self.buf.len());
        }
        Ok(read > 0)
    }
}

/// Append `text` unless `line` is already past `max_len`
fn keep(line: &mut String, text: &str, max_len: usize) {
    if line.len() <= max_len {
        line.push_str(text);
    }
}
