use std::fmt;

use serde::{Deserialize, Serialize};

/// Source location of a parsed node.
///
/// Attached to every node of a parsed document as out-of-band metadata; it
/// is never part of the node content itself. A line or column of -1 means
/// the location is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePosition {
    pub url: String,
    pub line: i32,
    pub column: i32,
}

impl SourcePosition {
    pub fn new(url: impl Into<String>, line: i32, column: i32) -> Self {
        Self {
            url: url.into(),
            line,
            column,
        }
    }

    /// A position whose line and column are not known.
    pub fn unknown(url: impl Into<String>) -> Self {
        Self::new(url, -1, -1)
    }

    pub fn is_known(&self) -> bool {
        self.line >= 0
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.url, self.line, self.column)
    }
}
