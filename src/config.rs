//! Parser options and their validated, ready-to-scan form

use crate::error::{FieldError, Result};
use crate::types::{FieldType, DEFAULT_BUFFER_SIZE};
use memchr::memchr2;
use memchr::memmem::Finder;

/// Characters treated as whitespace around quoted fields.
///
/// Any of these that also appears in a delimiter is dropped from the set.
pub const WHITESPACE_CHARS: &[char] = &[
    '\u{0009}', '\u{000B}', '\u{000C}', '\u{0020}', '\u{0085}', '\u{00A0}', '\u{1680}',
    '\u{2000}', '\u{2001}', '\u{2002}', '\u{2003}', '\u{2004}', '\u{2005}', '\u{2006}',
    '\u{2007}', '\u{2008}', '\u{2009}', '\u{200A}', '\u{2028}', '\u{2029}', '\u{3000}',
    '\u{FEFF}',
];

/// Parser configuration
///
/// # Examples
///
/// ```
/// use fieldstream::{FieldType, ParserOptions};
///
/// let options = ParserOptions::new()
///     .delimiters([",", ";"])
///     .comment_tokens(["#"])
///     .trim_whitespace(false);
/// assert_eq!(options.field_type, FieldType::Delimited);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParserOptions {
    /// Field separators for delimited mode, matched literally
    pub delimiters: Vec<String>,
    /// Prefixes marking a whole line as a comment
    pub comment_tokens: Vec<String>,
    /// Field widths for fixed-width mode; a non-positive last width takes the rest of the line
    pub field_widths: Vec<i32>,
    /// Recognise `"`-enclosed fields in delimited mode
    pub quoted_fields: bool,
    /// Trim surrounding whitespace from every field
    pub trim_whitespace: bool,
    pub field_type: FieldType,
    /// Characters pulled from the source per refill
    pub buffer_size: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            delimiters: Vec::new(),
            comment_tokens: Vec::new(),
            field_widths: Vec::new(),
            quoted_fields: true,
            trim_whitespace: true,
            field_type: FieldType::Delimited,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl ParserOptions {
    /// Defaults: delimited mode, no delimiters yet, quoting and trimming on
    pub fn new() -> Self {
        Self::default()
    }

    /// Comma-separated values with quoting
    pub fn csv() -> Self {
        Self::new().delimiters([","])
    }

    /// Fixed-width mode with the given widths
    pub fn fixed_width<I: IntoIterator<Item = i32>>(widths: I) -> Self {
        Self::new()
            .field_type(FieldType::FixedWidth)
            .field_widths(widths)
    }

    pub fn delimiters<I, S>(mut self, delimiters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.delimiters = delimiters.into_iter().map(Into::into).collect();
        self
    }

    pub fn comment_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.comment_tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    pub fn field_widths<I: IntoIterator<Item = i32>>(mut self, widths: I) -> Self {
        self.field_widths = widths.into_iter().collect();
        self
    }

    pub fn quoted_fields(mut self, quoted: bool) -> Self {
        self.quoted_fields = quoted;
        self
    }

    pub fn trim_whitespace(mut self, trim: bool) -> Self {
        self.trim_whitespace = trim;
        self
    }

    pub fn field_type(mut self, field_type: FieldType) -> Self {
        self.field_type = field_type;
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Check the options for the current mode and build the scanning state
    pub fn validate(&self) -> Result<CompiledConfig> {
        let mut line_length = 0;
        match self.field_type {
            FieldType::Delimited => self.validate_delimiters()?,
            FieldType::FixedWidth => line_length = self.validate_field_widths()?,
        }
        self.validate_comment_tokens()?;

        let delimiters: Vec<Delimiter> = match self.field_type {
            FieldType::Delimited => self.delimiters.iter().map(|d| Delimiter::new(d)).collect(),
            FieldType::FixedWidth => Vec::new(),
        };
        let space_chars = WHITESPACE_CHARS
            .iter()
            .copied()
            .filter(|c| !delimiters.iter().any(|d| d.text.contains(*c)))
            .collect();

        log::debug!(
            "Validated {} configuration ({} delimiters, {} widths, {} comment tokens)",
            self.field_type,
            delimiters.len(),
            self.field_widths.len(),
            self.comment_tokens.len()
        );

        Ok(CompiledConfig {
            field_type: self.field_type,
            delimiters,
            comment_tokens: self
                .comment_tokens
                .iter()
                .filter(|t| !t.is_empty())
                .cloned()
                .collect(),
            field_widths: self.field_widths.clone(),
            line_length,
            quoted_fields: self.quoted_fields,
            trim_whitespace: self.trim_whitespace,
            space_chars,
        })
    }

    fn validate_delimiters(&self) -> Result<()> {
        if self.delimiters.is_empty() {
            return Err(FieldError::InvalidConfig(
                "delimited mode requires at least one delimiter".to_string(),
            ));
        }
        for delimiter in &self.delimiters {
            if delimiter.is_empty() {
                return Err(FieldError::InvalidConfig(
                    "delimiters cannot be empty".to_string(),
                ));
            }
            if delimiter.contains(['\r', '\n']) {
                return Err(FieldError::InvalidConfig(format!(
                    "delimiter {:?} contains a line terminator",
                    delimiter
                )));
            }
            if self.quoted_fields && delimiter.contains('"') {
                return Err(FieldError::InvalidConfig(format!(
                    "delimiter {:?} contains a quote while quoted fields are enabled",
                    delimiter
                )));
            }
        }
        Ok(())
    }

    /// Returns the minimum line length in text elements
    fn validate_field_widths(&self) -> Result<usize> {
        let Some((_, leading)) = self.field_widths.split_last() else {
            return Err(FieldError::InvalidConfig(
                "fixed-width mode requires at least one field width".to_string(),
            ));
        };
        if let Some(width) = leading.iter().find(|w| **w <= 0) {
            return Err(FieldError::InvalidConfig(format!(
                "only the last field width may be zero or negative, found {}",
                width
            )));
        }
        Ok(self
            .field_widths
            .iter()
            .filter(|w| **w > 0)
            .map(|w| *w as usize)
            .sum())
    }

    fn validate_comment_tokens(&self) -> Result<()> {
        for token in &self.comment_tokens {
            if token.chars().any(char::is_whitespace) {
                return Err(FieldError::InvalidConfig(format!(
                    "comment token {:?} contains whitespace",
                    token
                )));
            }
            if self.quoted_fields && self.field_type == FieldType::Delimited && token == "\"" {
                return Err(FieldError::InvalidConfig(
                    "a quote cannot be a comment token while quoted fields are enabled".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Blank lines and lines starting with a comment token carry no data.
///
/// Tokens are matched against both the raw and the trimmed line; empty
/// tokens never match.
pub fn is_ignorable(line: &str, comment_tokens: &[String]) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return true;
    }
    comment_tokens
        .iter()
        .filter(|token| !token.is_empty())
        .any(|token| trimmed.starts_with(token.as_str()) || line.starts_with(token.as_str()))
}

/// A delimiter with its precompiled searcher
#[derive(Debug, Clone)]
pub struct Delimiter {
    text: String,
    finder: Finder<'static>,
}

impl Delimiter {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            finder: Finder::new(text.as_bytes()).into_owned(),
        }
    }
}

/// Validated options in the form the tokenizers consume
#[derive(Debug, Clone)]
pub struct CompiledConfig {
    pub field_type: FieldType,
    pub delimiters: Vec<Delimiter>,
    /// Non-empty comment prefixes
    pub comment_tokens: Vec<String>,
    pub field_widths: Vec<i32>,
    /// Sum of the positive field widths
    pub line_length: usize,
    pub quoted_fields: bool,
    pub trim_whitespace: bool,
    /// Whitespace allowed around quoted fields
    pub space_chars: Vec<char>,
}

impl CompiledConfig {
    pub fn is_space(&self, c: char) -> bool {
        self.space_chars.contains(&c)
    }

    /// Earliest delimiter at or after byte offset `from`.
    ///
    /// Returns the match offset and length. Among delimiters starting at the
    /// same offset the first configured wins. With `line_ends`, `\r\n`, `\r`
    /// and `\n` count as delimiters too.
    pub fn find_delimiter(&self, line: &str, from: usize, line_ends: bool) -> Option<(usize, usize)> {
        let hay = &line.as_bytes()[from..];
        let mut best: Option<(usize, usize)> = None;

        for delimiter in &self.delimiters {
            let len = delimiter.text.len();
            // A match starting before the current best ends before `pos + len - 1`
            let limit = best.map_or(hay.len(), |(pos, _)| (pos + len - 1).min(hay.len()));
            if let Some(pos) = delimiter.finder.find(&hay[..limit]) {
                if best.map_or(true, |(best_pos, _)| pos < best_pos) {
                    best = Some((pos, len));
                }
            }
        }

        if line_ends {
            if let Some(pos) = memchr2(b'\r', b'\n', hay) {
                if best.map_or(true, |(best_pos, _)| pos < best_pos) {
                    let len = if hay[pos] == b'\r' && hay.get(pos + 1) == Some(&b'\n') {
                        2
                    } else {
                        1
                    };
                    best = Some((pos, len));
                }
            }
        }

        best.map(|(pos, len)| (from + pos, len))
    }

    /// Offset just past an opening quote if only spaces precede it at `from`
    pub fn opening_quote(&self, line: &str, from: usize) -> Option<usize> {
        line[from..]
            .char_indices()
            .find(|(_, c)| !self.is_space(*c))
            .filter(|(_, c)| *c == '"')
            .map(|(offset, _)| from + offset + 1)
    }

    /// Trim a field if trimming is on
    pub fn finish_field(&self, field: &str) -> String {
        if self.trim_whitespace {
            field.trim().to_string()
        } else {
            field.to_string()
        }
    }
}
