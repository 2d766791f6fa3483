//! Shared type definitions

use std::fmt;

/// Default number of characters pulled from the source per refill
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Hard cap on buffered text and on a record reassembled from several lines
pub const MAX_BUFFER_SIZE: usize = 10_000_000;

/// How a data line is split into fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldType {
    /// Fields separated by one of the configured delimiters
    #[default]
    Delimited,
    /// Fields cut by configured widths, counted in text elements
    FixedWidth,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Delimited => write!(f, "delimited"),
            FieldType::FixedWidth => write!(f, "fixed-width"),
        }
    }
}
