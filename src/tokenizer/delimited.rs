//! Splitting a data line on delimiters

use super::quoted::QuotedFieldBuilder;
use super::{malformed, trim_line_end, RawLineSource};
use crate::config::CompiledConfig;
use crate::error::Result;

/// Offset where the line terminator starts (line length if there is none)
fn end_of_line_index(line: &str) -> usize {
    if line.ends_with("\r\n") {
        line.len() - 2
    } else if line.ends_with(['\r', '\n']) {
        line.len() - 1
    } else {
        line.len()
    }
}

/// Split one data line into fields.
///
/// `line` keeps its terminator. A quoted field left open at the end of the
/// line pulls further physical lines from `more`; the record is reported
/// against `line_number`, the line where it started. A record that grows
/// past `max_len` bytes this way is malformed.
pub fn split_delimited<S: RawLineSource>(
    config: &CompiledConfig,
    mut line: String,
    line_number: u64,
    max_len: usize,
    more: &mut S,
) -> Result<Vec<String>> {
    let mut fields = Vec::new();
    let mut index = 0;
    let mut line_end = end_of_line_index(&line);

    while index <= line_end {
        let opening = if config.quoted_fields {
            config.opening_quote(&line, index)
        } else {
            None
        };

        if let Some(start) = opening {
            let mut builder = QuotedFieldBuilder::new();
            builder.build(config, &line, start);
            while !builder.is_finished() {
                if builder.is_malformed() {
                    return Err(malformed(&line, line_number));
                }
                let junction = line.len();
                let Some(next) = more.next_raw_line(max_len.saturating_sub(line.len()))? else {
                    return Err(malformed(&line, line_number));
                };
                if line.len() + next.len() > max_len {
                    log::debug!(
                        "Quoted field starting on line {} exceeds {} bytes",
                        line_number,
                        max_len
                    );
                    return Err(malformed(&line, line_number));
                }
                line.push_str(&next);
                line_end = end_of_line_index(&line);
                builder.build(config, &line, junction);
            }
            index = builder.next_index();
            fields.push(config.finish_field(builder.field()));
            continue;
        }

        match config.find_delimiter(&line, index, false) {
            Some((pos, len)) => {
                fields.push(config.finish_field(&line[index..pos]));
                index = pos + len;
            }
            None => {
                fields.push(config.finish_field(trim_line_end(&line[index..])));
                break;
            }
        }
    }

    Ok(fields)
}
