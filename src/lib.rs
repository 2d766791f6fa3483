//! # fieldstream
//!
//! Streaming parser for delimited and fixed-width text files.
//!
//! - Literal multi-character delimiters, `"`-enclosed fields with `""` escapes
//!   and embedded line breaks
//! - Fixed-width records measured in text elements (grapheme clusters)
//! - Blank and comment lines skipped, physical line numbers kept for diagnostics
//! - Bounded memory: the source is read in chunks, never loaded whole
//!
//! ## Quick Start
//!
//! ```
//! use fieldstream::{ParserOptions, TextFieldParser};
//!
//! let data = "id,name\n1,\"Smith, J\"\n";
//! let mut parser = TextFieldParser::with_options(data.as_bytes(), ParserOptions::csv())?;
//!
//! while let Some(fields) = parser.read_fields()? {
//!     println!("{:?}", fields);
//! }
//! # Ok::<(), fieldstream::FieldError>(())
//! ```
//!
//! ## Fixed Width
//!
//! ```
//! use fieldstream::{ParserOptions, TextFieldParser};
//!
//! let mut parser = TextFieldParser::with_options(
//!     "001Alice  NYC\n".as_bytes(),
//!     ParserOptions::fixed_width([3, 7, 0]),
//! )?;
//! assert_eq!(
//!     parser.read_fields()?,
//!     Some(vec!["001".to_string(), "Alice".to_string(), "NYC".to_string()])
//! );
//! # Ok::<(), fieldstream::FieldError>(())
//! ```

pub mod buffer;
pub mod config;
pub mod encoding;
pub mod error;
pub mod null_filter;
pub mod source;
pub mod text_field_parser;
pub mod tokenizer;
pub mod types;

pub use config::ParserOptions;
pub use encoding::TextEncoding;
pub use error::{FieldError, Result};
pub use null_filter::NullRunFilter;
pub use source::SourceReader;
pub use text_field_parser::{Records, TextFieldParser};
pub use types::FieldType;
