//! Line tokenizers for delimited and fixed-width records

mod delimited;
mod fixed_width;
mod quoted;

pub use delimited::split_delimited;
pub use fixed_width::split_fixed_width;
pub use quoted::QuotedFieldBuilder;

use crate::error::{FieldError, Result};
use unicode_segmentation::UnicodeSegmentation;

/// Supplies physical lines to a quoted field that spans line breaks.
///
/// Lines come straight from the source with their terminators; blank and
/// comment lines are not skipped, since they belong to the field. A line
/// longer than `max_len` bytes may come back cut short, but still longer
/// than `max_len`.
pub trait RawLineSource {
    fn next_raw_line(&mut self, max_len: usize) -> Result<Option<String>>;
}

/// Strip trailing CR and LF characters
pub fn trim_line_end(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

/// Byte offsets of every text element boundary, including `line.len()`
pub fn text_element_bounds(line: &str) -> Vec<usize> {
    line.grapheme_indices(true)
        .map(|(offset, _)| offset)
        .chain(std::iter::once(line.len()))
        .collect()
}

/// First `count` text elements of `text`
pub fn take_text_elements(text: &str, count: usize) -> &str {
    match text.grapheme_indices(true).nth(count) {
        Some((offset, _)) => &text[..offset],
        None => text,
    }
}

pub(crate) fn malformed(line: &str, line_number: u64) -> FieldError {
    FieldError::MalformedLine {
        line_number,
        line: trim_line_end(line).to_string(),
    }
}
