//! Reader decorator that drops long runs of NUL bytes
//!
//! Exports from some legacy systems pad records with large blocks of `\0`.
//! [`NullRunFilter`] removes any run of at least `threshold` consecutive NUL
//! bytes before the text reaches the decoder. Shorter runs are passed through
//! untouched.

use std::io::{self, Read};

/// Default minimum length of a NUL run that gets removed
pub const DEFAULT_NULL_RUN_THRESHOLD: usize = 256;

const CHUNK_SIZE: usize = 8192;

/// Removes runs of `threshold` or more NUL bytes from an inner reader
pub struct NullRunFilter<R> {
    inner: R,
    threshold: usize,
    chunk: Box<[u8]>,
    pos: usize,
    len: usize,
    /// NULs seen but not yet emitted or dropped
    run: usize,
    /// Short run waiting to be written out
    owed: usize,
    eof: bool,
}

impl<R: Read> NullRunFilter<R> {
    /// Filter with the default threshold
    pub fn new(inner: R) -> Self {
        Self::with_threshold(inner, DEFAULT_NULL_RUN_THRESHOLD)
    }

    /// Filter removing runs of at least `threshold` NULs (minimum 1)
    pub fn with_threshold(inner: R, threshold: usize) -> Self {
        Self {
            inner,
            threshold: threshold.max(1),
            chunk: vec![0u8; CHUNK_SIZE].into_boxed_slice(),
            pos: 0,
            len: 0,
            run: 0,
            owed: 0,
            eof: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Settle the pending run: short runs become owed output
    fn end_run(&mut self) {
        if self.run > 0 && self.run < self.threshold {
            self.owed = self.run;
        } else if self.run > 0 {
            log::trace!("Dropped run of {} NUL bytes", self.run);
        }
        self.run = 0;
    }
}

impl<R: Read> Read for NullRunFilter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.owed > 0 {
                let n = self.owed.min(buf.len());
                buf[..n].fill(0);
                self.owed -= n;
                return Ok(n);
            }

            if self.pos == self.len {
                if self.eof {
                    return Ok(0);
                }
                self.len = self.inner.read(&mut self.chunk)?;
                self.pos = 0;
                if self.len == 0 {
                    self.eof = true;
                    self.end_run();
                }
                continue;
            }

            let mut written = 0;
            while self.pos < self.len && written < buf.len() {
                let byte = self.chunk[self.pos];
                if byte == 0 {
                    self.run += 1;
                    self.pos += 1;
                    continue;
                }
                if self.run > 0 {
                    self.end_run();
                    if self.owed > 0 {
                        break;
                    }
                }
                buf[written] = byte;
                written += 1;
                self.pos += 1;
            }
            if written > 0 {
                return Ok(written);
            }
        }
    }
}
