//! Problem reporting: severity, classification, and the sink contract.
//!
//! Every gate in the pipeline reports findings as [`Problem`] values through
//! a caller-supplied [`ProblemSink`]. Problems are immutable once built and
//! ownership transfers to the sink immediately.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::field::RecordLocation;
use crate::position::SourcePosition;

/// Severity of a reported problem, from confirmation-level debug output up
/// to conditions that abort the current unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
            Self::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Classification of a validation problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemType {
    InvalidFieldValue,
    FieldValueTooLong,
    FieldValueOverlap,
    BlankFieldValue,
    FieldValueDataTypeMatch,
    FieldValueDataTypeMismatch,
    FieldValueFormatMatch,
    FieldValueFormatSpecifierMismatch,
    FieldValueFormatPrecisionMismatch,
    FieldValueNotRightJustified,
    FieldValueNotLeftJustified,
    FieldValueOutOfMinMaxRange,
    FieldValueInMinMaxRange,
    FieldValueNotANumber,
    BadFieldRead,
    SchemaError,
    MissingSchema,
    ParseError,
    SchematronError,
    SchematronWarning,
    SchematronInfo,
}

/// Where a problem was detected: a position in a label document, or a field
/// of a table record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProblemSource {
    Label {
        url: String,
        line: i32,
        column: i32,
    },
    Table {
        location: RecordLocation,
        /// 1-based field number within the record.
        field: usize,
    },
}

impl fmt::Display for ProblemSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label { url, line, column } => write!(f, "{url}:{line}:{column}"),
            Self::Table { location, field } => {
                write!(
                    f,
                    "{} (table {}, record {}, field {field})",
                    location.data_file, location.table, location.record
                )
            }
        }
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub severity: Severity,
    pub kind: ProblemType,
    pub message: String,
    pub source: ProblemSource,
}

impl Problem {
    /// A problem located in a label document.
    pub fn label(
        severity: Severity,
        kind: ProblemType,
        message: impl Into<String>,
        position: &SourcePosition,
    ) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            source: ProblemSource::Label {
                url: position.url.clone(),
                line: position.line,
                column: position.column,
            },
        }
    }

    /// A problem located in a field of a table record.
    pub fn table(
        severity: Severity,
        kind: ProblemType,
        message: impl Into<String>,
        location: RecordLocation,
        field: usize,
    ) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            source: ProblemSource::Table { location, field },
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}  {}", self.severity, self.source, self.message)
    }
}

/// Receives problems from the validation gates.
///
/// Implementations must not panic and must not block indefinitely; a sink
/// is called zero or more times per validated unit.
pub trait ProblemSink {
    fn add_problem(&mut self, problem: Problem);
}

/// Vec-backed sink that preserves emission order.
#[derive(Debug, Default)]
pub struct ProblemContainer {
    problems: Vec<Problem>,
}

impl ProblemContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.problems
            .iter()
            .filter(|p| matches!(p.severity, Severity::Error | Severity::Fatal))
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.problems
            .iter()
            .filter(|p| p.severity == Severity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Take the accumulated problems, leaving the container empty.
    pub fn take(&mut self) -> Vec<Problem> {
        std::mem::take(&mut self.problems)
    }
}

impl ProblemSink for ProblemContainer {
    fn add_problem(&mut self, problem: Problem) {
        self.problems.push(problem);
    }
}
