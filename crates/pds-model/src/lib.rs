//! Shared data model for planetary data product validation.
//!
//! Holds the vocabulary both validation subsystems speak: severity-classified
//! [`Problem`] records with precise source locations, the [`ProblemSink`]
//! contract they are reported through, field-level table descriptions, and
//! the document-level error taxonomy.

pub mod error;
pub mod field;
pub mod position;
pub mod problem;

pub use error::{LabelError, Result};
pub use field::{FieldSpec, FieldType, RecordLocation};
pub use position::SourcePosition;
pub use problem::{Problem, ProblemContainer, ProblemSink, ProblemSource, ProblemType, Severity};
