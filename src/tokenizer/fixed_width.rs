//! Cutting a data line into fixed-width fields

use super::{malformed, text_element_bounds, trim_line_end};
use crate::config::CompiledConfig;
use crate::error::Result;

/// Cut one data line by the configured widths.
///
/// Widths count text elements (grapheme clusters). The line must hold at
/// least the sum of the positive widths; a non-positive last width takes
/// whatever is left.
pub fn split_fixed_width(config: &CompiledConfig, line: &str, line_number: u64) -> Result<Vec<String>> {
    let line = trim_line_end(line);
    let bounds = text_element_bounds(line);
    let elements = bounds.len() - 1;

    if elements < config.line_length {
        return Err(malformed(line, line_number));
    }

    let mut index = 0;
    let fields = config
        .field_widths
        .iter()
        .map(|&width| {
            let field = if width > 0 {
                let end = index + width as usize;
                let field = &line[bounds[index]..bounds[end]];
                index = end;
                field
            } else if index >= elements {
                ""
            } else {
                &line[bounds[index]..]
            };
            config.finish_field(field)
        })
        .collect();

    Ok(fields)
}
