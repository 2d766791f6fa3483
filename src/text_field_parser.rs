//! Streaming field parser over delimited or fixed-width text
//!
//! [`TextFieldParser`] reads one record at a time from any [`Read`] source.
//! Blank lines and comment lines are skipped, quoted fields may span several
//! physical lines, and only a bounded window of the source is held in memory.

use crate::buffer::{Exhaustion, LineBuffer};
use crate::config::{is_ignorable, CompiledConfig, ParserOptions};
use crate::encoding::{CharDecoder, TextEncoding};
use crate::error::{FieldError, Result};
use crate::null_filter::NullRunFilter;
use crate::source::SourceReader;
use crate::tokenizer::{split_delimited, split_fixed_width, take_text_elements, trim_line_end, RawLineSource};
use crate::types::{FieldType, MAX_BUFFER_SIZE};
use std::io::Read;
use std::path::Path;

/// Open source plus the physical line counter
struct Session<R> {
    lines: LineBuffer<R>,
    /// 1-based number of the next physical line
    line_number: u64,
}

impl<R: Read> Session<R> {
    /// Next line that is neither blank nor a comment, consuming it
    fn next_data_line(&mut self, comment_tokens: &[String]) -> Result<Option<String>> {
        loop {
            let Some(line) = self.lines.read_line(Exhaustion::Refill)? else {
                return Ok(None);
            };
            self.line_number += 1;
            if !is_ignorable(&line, comment_tokens) {
                return Ok(Some(line));
            }
            log::trace!("Skipped line {}", self.line_number - 1);
        }
    }

    /// Like `next_data_line`, but leaves the consuming cursor and counter alone
    fn peek_data_line(&mut self, comment_tokens: &[String]) -> Result<Option<String>> {
        self.lines.compact();
        loop {
            match self.lines.read_line(Exhaustion::Grow)? {
                Some(line) if is_ignorable(&line, comment_tokens) => continue,
                other => return Ok(other),
            }
        }
    }

    fn read_record(&mut self, config: &CompiledConfig) -> Result<Option<Vec<String>>> {
        let Some(line) = self.next_data_line(&config.comment_tokens)? else {
            return Ok(None);
        };
        let line_number = self.line_number - 1;
        let fields = match config.field_type {
            FieldType::Delimited => split_delimited(config, line, line_number, MAX_BUFFER_SIZE, self)?,
            FieldType::FixedWidth => split_fixed_width(config, &line, line_number)?,
        };
        Ok(Some(fields))
    }
}

impl<R: Read> RawLineSource for Session<R> {
    fn next_raw_line(&mut self, max_len: usize) -> Result<Option<String>> {
        let line = self.lines.read_line_capped(Exhaustion::Refill, max_len)?;
        if line.is_some() {
            self.line_number += 1;
        }
        Ok(line)
    }
}

/// Streaming parser for delimited and fixed-width text
///
/// Configuration can change between reads; it is validated again on the
/// next read. Once the source is exhausted (or [`close`](Self::close) is
/// called) every read returns `Ok(None)`.
///
/// To keep ownership of the source, pass `&mut reader`: closing the parser
/// then only ends the borrow.
///
/// # Examples
///
/// ```
/// use fieldstream::{ParserOptions, TextFieldParser};
///
/// let data = "# header comment\nname,city\n\"Smith, J\",NYC\n";
/// let mut parser = TextFieldParser::with_options(data.as_bytes(), ParserOptions::csv().comment_tokens(["#"]))?;
///
/// assert_eq!(parser.read_fields()?, Some(vec!["name".to_string(), "city".to_string()]));
/// assert_eq!(parser.read_fields()?, Some(vec!["Smith, J".to_string(), "NYC".to_string()]));
/// assert!(parser.end_of_data()?);
/// # Ok::<(), fieldstream::FieldError>(())
/// ```
pub struct TextFieldParser<R> {
    session: Option<Session<R>>,
    options: ParserOptions,
    /// `None` until validated after the last configuration change
    compiled: Option<CompiledConfig>,
    end_of_data: bool,
    error_line: String,
    error_line_number: Option<u64>,
}

impl<R: Read> TextFieldParser<R> {
    /// Parser with default options over UTF-8 text (BOM-detected)
    pub fn new(reader: R) -> Result<Self> {
        Self::with_options(reader, ParserOptions::default())
    }

    /// Parser over UTF-8 text (BOM-detected)
    pub fn with_options(reader: R, options: ParserOptions) -> Result<Self> {
        Self::with_encoding(reader, options, TextEncoding::Utf8, true)
    }

    /// Parser over text in `encoding`; with `detect_encoding` a leading BOM wins
    pub fn with_encoding(
        reader: R,
        options: ParserOptions,
        encoding: TextEncoding,
        detect_encoding: bool,
    ) -> Result<Self> {
        let decoder = CharDecoder::new(reader, encoding, detect_encoding);
        let lines = LineBuffer::with_limits(decoder, options.buffer_size, MAX_BUFFER_SIZE)?;
        Ok(Self {
            session: Some(Session {
                lines,
                line_number: 1,
            }),
            options,
            compiled: None,
            end_of_data: false,
            error_line: String::new(),
            error_line_number: None,
        })
    }

    // Configuration

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Replace every option at once
    pub fn set_options(&mut self, options: ParserOptions) {
        self.options = options;
        self.end_of_data = self.session.is_none();
        self.invalidate();
    }

    pub fn delimiters(&self) -> &[String] {
        &self.options.delimiters
    }

    pub fn set_delimiters<I, S>(&mut self, delimiters: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.delimiters = delimiters.into_iter().map(Into::into).collect();
        self.invalidate();
    }

    pub fn comment_tokens(&self) -> &[String] {
        &self.options.comment_tokens
    }

    pub fn set_comment_tokens<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.comment_tokens = tokens.into_iter().map(Into::into).collect();
        // Lines hidden as comments may now be data
        self.end_of_data = self.session.is_none();
        self.invalidate();
    }

    pub fn field_widths(&self) -> &[i32] {
        &self.options.field_widths
    }

    pub fn set_field_widths<I: IntoIterator<Item = i32>>(&mut self, widths: I) {
        self.options.field_widths = widths.into_iter().collect();
        self.invalidate();
    }

    pub fn quoted_fields(&self) -> bool {
        self.options.quoted_fields
    }

    pub fn set_quoted_fields(&mut self, quoted: bool) {
        self.options.quoted_fields = quoted;
        self.invalidate();
    }

    pub fn trim_whitespace(&self) -> bool {
        self.options.trim_whitespace
    }

    pub fn set_trim_whitespace(&mut self, trim: bool) {
        self.options.trim_whitespace = trim;
        self.invalidate();
    }

    pub fn field_type(&self) -> FieldType {
        self.options.field_type
    }

    pub fn set_field_type(&mut self, field_type: FieldType) {
        self.options.field_type = field_type;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.compiled = None;
    }

    // Diagnostics

    /// Text of the last malformed line, terminator stripped (empty if none)
    pub fn error_line(&self) -> &str {
        &self.error_line
    }

    /// Line number of the last malformed line
    pub fn error_line_number(&self) -> Option<u64> {
        self.error_line_number
    }

    /// Number of the next physical line to be read, `None` once closed
    pub fn line_number(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.line_number)
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_none()
    }

    // Reading

    /// Read and split the next data line.
    ///
    /// Returns `Ok(None)` at end of data. A [`FieldError::MalformedLine`]
    /// only affects the offending record; the next call continues after it.
    ///
    /// # Examples
    ///
    /// ```
    /// use fieldstream::{ParserOptions, TextFieldParser};
    ///
    /// let mut parser = TextFieldParser::with_options("abcdefghij\n".as_bytes(), ParserOptions::fixed_width([3, 4, 0]))?;
    /// assert_eq!(parser.read_fields()?, Some(vec!["abc".to_string(), "defg".to_string(), "hij".to_string()]));
    /// assert_eq!(parser.read_fields()?, None);
    /// # Ok::<(), fieldstream::FieldError>(())
    /// ```
    pub fn read_fields(&mut self) -> Result<Option<Vec<String>>> {
        if self.session.is_none() {
            return Ok(None);
        }
        if self.compiled.is_none() {
            self.compiled = Some(self.options.validate()?);
        }
        let (Some(session), Some(config)) = (self.session.as_mut(), self.compiled.as_ref()) else {
            return Ok(None);
        };
        let result = session.read_record(config);
        self.settle(result)
    }

    /// Next physical line with its terminator stripped.
    ///
    /// Blank and comment lines are returned like any other.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        let Some(session) = self.session.as_mut() else {
            return Ok(None);
        };
        let result = session
            .next_raw_line(usize::MAX)
            .map(|line| line.map(|l| trim_line_end(&l).to_string()));
        self.settle(result)
    }

    /// Everything from the current position to the end of the source.
    ///
    /// Closes the parser.
    pub fn read_to_end(&mut self) -> Result<Option<String>> {
        let Some(session) = self.session.as_mut() else {
            return Ok(None);
        };
        let result = session.lines.read_to_end();
        self.close();
        result.map(Some)
    }

    /// Up to `count` text elements of the next data line, without consuming it
    pub fn peek_chars(&mut self, count: usize) -> Result<Option<String>> {
        if count == 0 {
            return Err(FieldError::InvalidArgument(
                "peek_chars needs a count greater than zero".to_string(),
            ));
        }
        if self.end_of_data {
            return Ok(None);
        }
        let Some(line) = self.peek_data_line()? else {
            return Ok(None);
        };
        Ok(Some(take_text_elements(trim_line_end(&line), count).to_string()))
    }

    /// Whether no data lines remain. Does not consume anything.
    pub fn end_of_data(&mut self) -> Result<bool> {
        if self.end_of_data {
            return Ok(true);
        }
        Ok(self.peek_data_line()?.is_none())
    }

    /// Iterator over the remaining records
    pub fn records(&mut self) -> Records<'_, R> {
        Records {
            parser: self,
            done: false,
        }
    }

    /// Release the source. Further reads return `Ok(None)`.
    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            log::debug!("Closed parser at line {}", session.line_number);
        }
        self.end_of_data = true;
    }

    /// Take back the source, unless the parser is already closed
    pub fn into_inner(mut self) -> Option<R> {
        self.session
            .take()
            .map(|session| session.lines.into_source().into_inner())
    }

    fn peek_data_line(&mut self) -> Result<Option<String>> {
        let Some(session) = self.session.as_mut() else {
            self.end_of_data = true;
            return Ok(None);
        };
        match session.peek_data_line(&self.options.comment_tokens) {
            Ok(None) => {
                self.end_of_data = true;
                Ok(None)
            }
            Ok(line) => Ok(line),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Apply session-level effects of a read result
    fn settle<T>(&mut self, result: Result<Option<T>>) -> Result<Option<T>> {
        match result {
            Ok(None) => {
                self.close();
                Ok(None)
            }
            Ok(value) => Ok(value),
            Err(err) => Err(self.fail(err)),
        }
    }

    fn fail(&mut self, err: FieldError) -> FieldError {
        if let FieldError::MalformedLine { line_number, line } = &err {
            log::warn!("Malformed line {}: {:?}", line_number, line);
            self.error_line = line.clone();
            self.error_line_number = Some(*line_number);
        } else if err.is_terminal() {
            log::debug!("Closing parser after error: {}", err);
            self.close();
        }
        err
    }
}

impl TextFieldParser<SourceReader> {
    /// Open a file with default options - auto-detects compression from extension
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fieldstream::TextFieldParser;
    ///
    /// let mut parser = TextFieldParser::open("data.csv")?;
    /// parser.set_delimiters([","]);
    /// while let Some(fields) = parser.read_fields()? {
    ///     println!("{:?}", fields);
    /// }
    /// # Ok::<(), fieldstream::FieldError>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ParserOptions::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ParserOptions) -> Result<Self> {
        Self::with_options(SourceReader::open(path)?, options)
    }

    /// Open a file in a given encoding; a leading BOM still takes precedence
    pub fn open_with_encoding<P: AsRef<Path>>(
        path: P,
        options: ParserOptions,
        encoding: TextEncoding,
    ) -> Result<Self> {
        Self::with_encoding(SourceReader::open(path)?, options, encoding, true)
    }
}

impl<R: Read> TextFieldParser<NullRunFilter<R>> {
    /// Parser whose source has long NUL runs stripped before decoding
    pub fn with_null_filter(reader: R, options: ParserOptions) -> Result<Self> {
        Self::with_options(NullRunFilter::new(reader), options)
    }
}

/// Iterator over records, see [`TextFieldParser::records`]
///
/// Malformed lines are yielded as errors and iteration continues. Any other
/// error ends the iteration after it is yielded.
pub struct Records<'a, R> {
    parser: &'a mut TextFieldParser<R>,
    done: bool,
}

impl<R: Read> Iterator for Records<'_, R> {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.parser.read_fields() {
            Ok(Some(fields)) => Some(Ok(fields)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = !err.is_recoverable();
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{self, Cursor};

    fn parser(text: &str, options: ParserOptions) -> TextFieldParser<Cursor<Vec<u8>>> {
        TextFieldParser::with_options(Cursor::new(text.as_bytes().to_vec()), options).unwrap()
    }

    fn fields(items: &[&str]) -> Option<Vec<String>> {
        Some(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_read_fields_csv() -> Result<()> {
        let mut p = parser("a,b,,\"d,e\"\n\"a\"\"b\",c\n", ParserOptions::csv());
        assert_eq!(p.read_fields()?, fields(&["a", "b", "", "d,e"]));
        assert_eq!(p.read_fields()?, fields(&["a\"b", "c"]));
        assert_eq!(p.read_fields()?, None);
        assert!(p.is_closed());
        assert_eq!(p.read_fields()?, None);
        Ok(())
    }

    #[test]
    fn test_embedded_newline_advances_line_number() -> Result<()> {
        let mut p = parser("\"line1\nline2\",x\nnext\n", ParserOptions::csv());
        assert_eq!(p.line_number(), Some(1));
        assert_eq!(p.read_fields()?, fields(&["line1\nline2", "x"]));
        assert_eq!(p.line_number(), Some(3));
        assert_eq!(p.read_fields()?, fields(&["next"]));
        Ok(())
    }

    #[test]
    fn test_embedded_comment_like_line_kept() -> Result<()> {
        let options = ParserOptions::csv().comment_tokens(["#"]);
        let mut p = parser("\"a\n\n# not a comment\",b\n", options);
        assert_eq!(p.read_fields()?, fields(&["a\n\n# not a comment", "b"]));
        Ok(())
    }

    #[test]
    fn test_comments_and_blanks_skipped() -> Result<()> {
        let options = ParserOptions::csv().comment_tokens(["#"]);
        let mut p = parser("# c1\n\n  \na,b\n   # c2\nc,\"d\n", options);
        assert_eq!(p.read_fields()?, fields(&["a", "b"]));
        assert_eq!(p.line_number(), Some(5));

        let err = p.read_fields().unwrap_err();
        assert!(matches!(err, FieldError::MalformedLine { line_number: 6, .. }));
        assert_eq!(p.error_line(), "c,\"d");
        assert_eq!(p.error_line_number(), Some(6));
        Ok(())
    }

    #[test]
    fn test_malformed_fixed_width_recovers() -> Result<()> {
        let mut p = parser("abcde\nabcdefghij\n", ParserOptions::fixed_width([3, 4, 0]));
        let err = p.read_fields().unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(p.error_line(), "abcde");
        assert_eq!(p.error_line_number(), Some(1));
        assert_eq!(p.read_fields()?, fields(&["abc", "defg", "hij"]));
        Ok(())
    }

    #[test]
    fn test_lazy_validation() -> Result<()> {
        let mut p = parser("a;b\n", ParserOptions::new());
        p.set_delimiters([""]);
        assert!(matches!(p.read_fields(), Err(FieldError::InvalidConfig(_))));
        assert_eq!(p.line_number(), Some(1));

        p.set_delimiters([";"]);
        assert_eq!(p.read_fields()?, fields(&["a", "b"]));
        Ok(())
    }

    #[test]
    fn test_switch_mode_between_reads() -> Result<()> {
        let mut p = parser("a,b\nxxyy\n", ParserOptions::csv());
        assert_eq!(p.read_fields()?, fields(&["a", "b"]));
        p.set_field_type(FieldType::FixedWidth);
        assert!(matches!(p.read_fields(), Err(FieldError::InvalidConfig(_))));
        p.set_field_widths([2, 2]);
        assert_eq!(p.read_fields()?, fields(&["xx", "yy"]));
        Ok(())
    }

    #[test]
    fn test_read_line_raw() -> Result<()> {
        let options = ParserOptions::csv().comment_tokens(["#"]);
        let mut p = parser("# c\r\n\na,b", options);
        assert_eq!(p.read_line()?.as_deref(), Some("# c"));
        assert_eq!(p.read_line()?.as_deref(), Some(""));
        assert_eq!(p.read_line()?.as_deref(), Some("a,b"));
        assert_eq!(p.line_number(), Some(4));
        assert_eq!(p.read_line()?, None);
        assert_eq!(p.line_number(), None);
        Ok(())
    }

    #[test]
    fn test_read_to_end() -> Result<()> {
        let mut p = parser("a,b\nc,d\ne\n", ParserOptions::csv());
        p.read_fields()?;
        assert_eq!(p.read_to_end()?.as_deref(), Some("c,d\ne\n"));
        assert!(p.is_closed());
        assert_eq!(p.read_to_end()?, None);
        assert_eq!(p.read_line()?, None);
        Ok(())
    }

    #[test]
    fn test_peek_chars() -> Result<()> {
        let options = ParserOptions::csv().comment_tokens(["#"]);
        let mut p = parser("#skip\n\nhello,world\n", options);
        assert_eq!(p.peek_chars(5)?.as_deref(), Some("hello"));
        assert_eq!(p.peek_chars(100)?.as_deref(), Some("hello,world"));
        assert_eq!(p.line_number(), Some(1));
        assert_eq!(p.read_fields()?, fields(&["hello", "world"]));
        assert_eq!(p.peek_chars(1)?, None);
        assert!(matches!(p.peek_chars(0), Err(FieldError::InvalidArgument(_))));
        Ok(())
    }

    #[test]
    fn test_peek_chars_text_elements() -> Result<()> {
        let mut p = parser("e\u{301}tude\n", ParserOptions::csv());
        assert_eq!(p.peek_chars(2)?.as_deref(), Some("e\u{301}t"));
        Ok(())
    }

    #[test]
    fn test_end_of_data_idempotent() -> Result<()> {
        let options = ParserOptions::csv().comment_tokens(["#"]).buffer_size(4);
        let mut p = parser("a,b\n# tail\n\n", options);
        assert!(!p.end_of_data()?);
        assert!(!p.end_of_data()?);
        assert_eq!(p.read_fields()?, fields(&["a", "b"]));
        assert!(p.end_of_data()?);
        assert!(p.end_of_data()?);
        assert_eq!(p.read_fields()?, None);
        Ok(())
    }

    #[test]
    fn test_comment_tokens_reset_end_of_data() -> Result<()> {
        let mut p = parser("#x\n", ParserOptions::csv().comment_tokens(["#"]));
        assert!(p.end_of_data()?);
        p.set_comment_tokens(Vec::<String>::new());
        assert!(!p.end_of_data()?);
        assert_eq!(p.read_fields()?, fields(&["#x"]));
        Ok(())
    }

    #[test]
    fn test_replaced_options_reset_end_of_data() -> Result<()> {
        let mut p = parser("#x\n", ParserOptions::csv().comment_tokens(["#"]));
        assert!(p.end_of_data()?);
        assert_eq!(p.peek_chars(1)?, None);

        p.set_options(ParserOptions::csv());
        assert!(!p.end_of_data()?);
        assert_eq!(p.peek_chars(2)?.as_deref(), Some("#x"));
        assert_eq!(p.read_fields()?, fields(&["#x"]));
        assert!(p.end_of_data()?);
        Ok(())
    }

    #[test]
    fn test_small_buffer_long_records() -> Result<()> {
        let long = "x".repeat(50);
        let text = format!("{long},\"{long}\r\n{long}\"\r\nz\r\n");
        let mut p = parser(&text, ParserOptions::csv().buffer_size(3));
        assert!(!p.end_of_data()?);
        assert_eq!(p.peek_chars(3)?.as_deref(), Some("xxx"));
        let expected_quoted = format!("{long}\r\n{long}");
        assert_eq!(p.read_fields()?, fields(&[long.as_str(), expected_quoted.as_str()]));
        assert_eq!(p.read_fields()?, fields(&["z"]));
        assert!(p.end_of_data()?);
        Ok(())
    }

    #[test]
    fn test_close_idempotent() -> Result<()> {
        let mut p = parser("a\n", ParserOptions::csv());
        p.close();
        p.close();
        assert!(p.end_of_data()?);
        assert_eq!(p.read_fields()?, None);
        assert_eq!(p.peek_chars(1)?, None);
        assert_eq!(p.line_number(), None);
        Ok(())
    }

    #[test]
    fn test_records_iterator_continues_after_malformed() {
        let mut p = parser("ab\nabcd\nabc\n", ParserOptions::fixed_width([3]));
        let results: Vec<_> = p.records().collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_err());
        assert_eq!(results[1].as_ref().unwrap(), &vec!["abc".to_string()]);
        assert_eq!(results[2].as_ref().unwrap(), &vec!["abc".to_string()]);
    }

    #[test]
    fn test_records_iterator_stops_on_config_error() {
        let mut p = parser("a\n", ParserOptions::new());
        let results: Vec<_> = p.records().collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(FieldError::InvalidConfig(_))));
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
    }

    #[test]
    fn test_io_error_propagates() {
        let err = TextFieldParser::new(FailingReader).err().unwrap();
        match err {
            FieldError::Io(e) => assert_eq!(e.to_string(), "disk on fire"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_leave_open_with_borrowed_reader() -> Result<()> {
        let mut source = Cursor::new(b"a,b\nc,d\n".to_vec());
        {
            let mut p = TextFieldParser::with_options(&mut source, ParserOptions::csv())?;
            assert_eq!(p.read_fields()?, fields(&["a", "b"]));
            p.close();
        }
        // the reader is still usable; the parser pulled everything into its buffer
        assert_eq!(source.position(), 8);
        Ok(())
    }

    #[test]
    fn test_into_inner() -> Result<()> {
        let p = parser("a\n", ParserOptions::csv());
        assert!(p.into_inner().is_some());

        let mut p = parser("a\n", ParserOptions::csv());
        p.close();
        assert!(p.into_inner().is_none());
        Ok(())
    }

    #[test]
    fn test_into_inner_through_null_filter() -> Result<()> {
        let mut p = TextFieldParser::with_null_filter(Cursor::new(b"a,b\n".to_vec()), ParserOptions::csv())?;
        assert_eq!(p.read_fields()?, fields(&["a", "b"]));
        let source = p.into_inner().map(NullRunFilter::into_inner);
        assert_eq!(source.map(|cursor| cursor.position()), Some(4));
        Ok(())
    }
}
