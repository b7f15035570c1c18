//! Tabular field-value validation.
//!
//! Type-checks, format-checks, range-checks, and overlap-checks every field
//! of every record of a structured data table against its field-level
//! specification, reporting each finding as a located problem. Layout
//! corruption and field read failures raise a fatal signal that stops the
//! scan of the current table.

pub mod datetime;
pub mod field_value;
pub mod format;
pub mod record;
pub mod types;

pub use datetime::{DateTimeChecker, GrammarDateTimeChecker, accepted_patterns};
pub use field_value::{FieldValueValidator, scan_table};
pub use format::{FormatChecker, FormatFinding, FormatSpec, Justification};
pub use record::{FieldContentFatal, FieldReadError, TableRecord};
pub use types::{TypeChecker, TypeMismatch};
