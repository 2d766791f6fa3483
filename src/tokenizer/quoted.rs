//! Builder for one `"`-enclosed field

use crate::config::CompiledConfig;
use memchr::memchr;

/// Accumulates a quoted field, possibly over several physical lines.
///
/// `build` is called with the line and the offset just past the opening
/// quote. If the line runs out before the closing quote, the caller appends
/// the next physical line and calls `build` again from the junction; the text
/// gathered so far is kept.
#[derive(Debug, Default)]
pub struct QuotedFieldBuilder {
    field: String,
    index: usize,
    delimiter_length: usize,
    finished: bool,
    malformed: bool,
}

impl QuotedFieldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field text with `""` unescaped
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Offset where the closing delimiter run starts
    pub fn index(&self) -> usize {
        self.index
    }

    /// Closing quote + trailing spaces + matched delimiter, in bytes
    pub fn delimiter_length(&self) -> usize {
        self.delimiter_length
    }

    /// Offset of the first byte after this field and its delimiter
    pub fn next_index(&self) -> usize {
        self.index + self.delimiter_length
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Text between the closing quote and the next delimiter was not whitespace
    pub fn is_malformed(&self) -> bool {
        self.malformed
    }

    pub fn build(&mut self, config: &CompiledConfig, line: &str, start: usize) {
        let bytes = line.as_bytes();
        self.index = start;

        while self.index < bytes.len() {
            let Some(offset) = memchr(b'"', &bytes[self.index..]) else {
                self.field.push_str(&line[self.index..]);
                self.index = bytes.len();
                return;
            };
            self.field.push_str(&line[self.index..self.index + offset]);
            self.index += offset;

            // Quote is the last character of the whole input
            if self.index + 1 == bytes.len() {
                self.finished = true;
                self.delimiter_length = 1;
                self.index += 1;
                return;
            }

            if bytes[self.index + 1] == b'"' {
                self.field.push('"');
                self.index += 2;
                continue;
            }

            let after = self.index + 1;
            let found = config.find_delimiter(line, after, true);
            let gap_end = found.map_or(bytes.len(), |(pos, _)| pos);
            if !line[after..gap_end].chars().all(|c| config.is_space(c)) {
                self.malformed = true;
                return;
            }

            self.delimiter_length = 1 + (gap_end - after) + found.map_or(0, |(_, len)| len);
            self.finished = true;
            return;
        }
    }
}
